//! Core protocol for the Engage → Loop purchase-request sync run.
//!
//! The orchestration lives in [`sync::engine::SyncEngine`]; the HTTP clients
//! implementing [`sync::traits::SourceApi`] and [`sync::traits::SinkApi`] live
//! in `loopsync_integrations`.

pub mod attachments;
pub mod error;
pub mod models;
pub mod sync;

pub use error::{Error, Result};
pub use models::{AttachmentDownload, CookieJar, PurchaseRequestView, ResyncBatch, RunReport};
pub use sync::engine::SyncEngine;
pub use sync::traits::{SinkApi, SourceApi};
