//! reqwest-backed implementations of the core `SourceApi`/`SinkApi` traits.

pub mod engage;
pub mod loop_api;

pub use engage::EngageClient;
pub use loop_api::LoopClient;
