use crate::attachments;
use crate::models::RunReport;
use crate::sync::traits::{SinkApi, SourceApi};
use crate::{Error, Result};
use std::sync::Arc;

/// Drives the end-to-end run: listing upload, then three independent
/// per-request passes (bulk-upsert result, pull-trigger result, push-trigger
/// result).
///
/// Fail-fast: the first error aborts the whole run, with no compensating
/// rollback of mutations already applied. Safety on re-run comes from the
/// upsert keys and the attachment existence check, not from local state.
pub struct SyncEngine {
    source: Arc<dyn SourceApi>,
    sink: Arc<dyn SinkApi>,
}

impl SyncEngine {
    pub fn new(source: Arc<dyn SourceApi>, sink: Arc<dyn SinkApi>) -> Self {
        Self { source, sink }
    }

    #[tracing::instrument(level = "info", skip(self))]
    pub async fn run(&self) -> Result<RunReport> {
        let mut report = RunReport::default();

        tracing::info!("retrieving purchase request listing from engage");
        let listing = self.source.list_purchase_requests().await?;

        tracing::info!("uploading listing to loop");
        let batch = self.sink.bulk_upsert_purchase_requests(&listing).await?;
        tracing::info!(requests = batch.requests.len(), "bulk upsert requested resync");
        self.sync_batch(&batch.requests, &mut report).await?;

        let batch = self.sink.trigger_sync_pull().await?;
        tracing::info!(requests = batch.requests.len(), "pull trigger requested resync");
        self.sync_batch(&batch.requests, &mut report).await?;

        let batch = self.sink.trigger_sync_push().await?;
        tracing::info!(requests = batch.requests.len(), "push trigger requested resync");
        self.sync_batch(&batch.requests, &mut report).await?;

        Ok(report)
    }

    /// One pass over an id list, in the order the sink returned it. Each list
    /// fully replaces the previous pass's list; nothing is merged.
    async fn sync_batch(&self, engage_ids: &[String], report: &mut RunReport) -> Result<()> {
        for engage_id in engage_ids {
            self.sync_purchase_request(engage_id, report).await?;
        }
        Ok(())
    }

    #[tracing::instrument(level = "info", skip(self, report))]
    async fn sync_purchase_request(&self, engage_id: &str, report: &mut RunReport) -> Result<()> {
        let detail = self.source.get_purchase_request(engage_id).await?;
        let view = self.sink.upsert_purchase_request(engage_id, &detail).await?;
        report.requests_synced += 1;

        if view.is_deleted() {
            // Soft-deleted on the Loop side; its attachments stay untouched.
            tracing::debug!(engage_id, "request soft-deleted, skipping attachments");
            report.requests_skipped_deleted += 1;
            return Ok(());
        }

        let page = self.source.get_additional_questions_page(engage_id).await?;
        for link in attachments::extract_attachment_links(&page) {
            self.sync_attachment(engage_id, &link, report).await?;
        }
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self, report))]
    async fn sync_attachment(
        &self,
        engage_id: &str,
        link: &str,
        report: &mut RunReport,
    ) -> Result<()> {
        let document_id = attachments::parse_document_id(link)?;

        if self.sink.attachment_exists(engage_id, &document_id).await? {
            report.attachments_already_present += 1;
            return Ok(());
        }

        let download = self.source.download_attachment(link).await?;
        let header = download.content_disposition.ok_or_else(|| {
            Error::Malformed(format!(
                "attachment {document_id} response carries no content-disposition header"
            ))
        })?;
        let filename = attachments::resolve_filename(&header)?;

        tracing::info!(
            engage_id,
            document_id = %document_id,
            filename = %filename,
            "uploading attachment to loop"
        );
        self.sink
            .upload_attachment(engage_id, &document_id, &filename, download.bytes)
            .await?;
        report.attachments_uploaded += 1;
        Ok(())
    }
}
