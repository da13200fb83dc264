use crate::Result;
use crate::models::{AttachmentDownload, PurchaseRequestView, ResyncBatch};
use async_trait::async_trait;
use serde_json::Value;

/// Read-only access to Engage, cookie-authenticated.
///
/// Credentials are immutable configuration held by the implementation, not
/// parameters on the calls. Implementations live in `loopsync_integrations`.
#[async_trait]
pub trait SourceApi: Send + Sync {
    /// Raw listing payload for the first page (100 items) of purchase
    /// requests. Passed through to the sink verbatim.
    async fn list_purchase_requests(&self) -> Result<Value>;

    /// Full detail for one purchase request.
    async fn get_purchase_request(&self, engage_id: &str) -> Result<Value>;

    /// HTML fragment embedding zero or more attachment download links.
    async fn get_additional_questions_page(&self, engage_id: &str) -> Result<String>;

    /// Fetch one attachment by the (entity-escaped) relative URL found in the
    /// additional-questions page.
    async fn download_attachment(&self, relative_url: &str) -> Result<AttachmentDownload>;
}

/// Read/write access to Loop, bearer-authenticated.
#[async_trait]
pub trait SinkApi: Send + Sync {
    /// Push the full source listing; the reply names the ids Loop wants
    /// individually resynced.
    async fn bulk_upsert_purchase_requests(&self, listing: &Value) -> Result<ResyncBatch>;

    /// Upsert one request's full detail; the reply is Loop's stored view,
    /// including the authoritative `deleted_at`.
    async fn upsert_purchase_request(
        &self,
        engage_id: &str,
        detail: &Value,
    ) -> Result<PurchaseRequestView>;

    /// Whether Loop already holds this attachment. 200 → true, 404 → false.
    async fn attachment_exists(&self, engage_id: &str, document_id: &str) -> Result<bool>;

    async fn upload_attachment(
        &self,
        engage_id: &str,
        document_id: &str,
        filename: &str,
        bytes: bytes::Bytes,
    ) -> Result<()>;

    /// GET against the sync-trigger endpoint; the reply is a fresh resync list.
    async fn trigger_sync_pull(&self) -> Result<ResyncBatch>;

    /// POST against the same sync-trigger endpoint; independent resync list.
    async fn trigger_sync_push(&self) -> Result<ResyncBatch>;
}
