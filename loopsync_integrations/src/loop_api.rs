//! Loop client (sink side).
//!
//! Bearer-authenticated access to the purchase-request bulk and per-id
//! upserts, the attachment existence/upload endpoints, and the two
//! sync-trigger calls.

use async_trait::async_trait;
use loopsync_core::models::{PurchaseRequestView, ResyncBatch};
use loopsync_core::sync::traits::SinkApi;
use loopsync_core::{Error, Result};
use reqwest::header::ACCEPT;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::instrument;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const READ_TIMEOUT: Duration = Duration::from_secs(5);
/// The bulk endpoint processes the whole listing server-side.
const BULK_READ_TIMEOUT: Duration = Duration::from_secs(60);
/// Uploads carry real payloads.
const UPLOAD_READ_TIMEOUT: Duration = Duration::from_secs(20);

pub struct LoopClient {
    client: Client,
    base_url: String,
    token: String,
}

impl LoopClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(READ_TIMEOUT)
            .build()
            .expect("reqwest client");
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        req.bearer_auth(&self.token)
            .header(ACCEPT, "application/json")
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response> {
        self.authed(req)
            .send()
            .await
            .map_err(|e| Error::transport("loop request", e))
    }

    /// Non-200 is `Error::Downstream` with the response body preserved
    /// verbatim.
    async fn expect_ok(resp: Response) -> Result<Response> {
        let status = resp.status();
        if status != StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Downstream {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }

    async fn decode_batch(resp: Response) -> Result<ResyncBatch> {
        Self::expect_ok(resp)
            .await?
            .json()
            .await
            .map_err(|e| Error::transport("decode resync batch", e))
    }
}

#[async_trait]
impl SinkApi for LoopClient {
    #[instrument(level = "info", skip(self, listing))]
    async fn bulk_upsert_purchase_requests(&self, listing: &Value) -> Result<ResyncBatch> {
        let req = self
            .client
            .post(self.url("/api/v1/engage/purchase-requests"))
            .json(listing)
            .timeout(BULK_READ_TIMEOUT);
        Self::decode_batch(self.send(req).await?).await
    }

    #[instrument(level = "info", skip(self, detail))]
    async fn upsert_purchase_request(
        &self,
        engage_id: &str,
        detail: &Value,
    ) -> Result<PurchaseRequestView> {
        let req = self
            .client
            .put(self.url(&format!("/api/v1/engage/purchase-requests/{engage_id}")))
            .json(detail);
        let resp = Self::expect_ok(self.send(req).await?).await?;
        resp.json()
            .await
            .map_err(|e| Error::transport("decode purchase request view", e))
    }

    #[instrument(level = "debug", skip(self))]
    async fn attachment_exists(&self, engage_id: &str, document_id: &str) -> Result<bool> {
        let req = self.client.get(self.url(&format!(
            "/api/v1/engage/purchase-requests/{engage_id}/attachments/{document_id}"
        )));
        let resp = self.send(req).await?;
        match resp.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => {
                let body = resp.text().await.unwrap_or_default();
                Err(Error::Downstream {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }

    #[instrument(level = "info", skip(self, bytes), fields(size = bytes.len()))]
    async fn upload_attachment(
        &self,
        engage_id: &str,
        document_id: &str,
        filename: &str,
        bytes: bytes::Bytes,
    ) -> Result<()> {
        let form = Form::new()
            .part(
                "attachment",
                Part::bytes(bytes.to_vec()).file_name(filename.to_string()),
            )
            .text("documentId", document_id.to_string());

        let req = self
            .client
            .post(self.url(&format!(
                "/api/v1/engage/purchase-requests/{engage_id}/attachments"
            )))
            .multipart(form)
            .timeout(UPLOAD_READ_TIMEOUT);
        Self::expect_ok(self.send(req).await?).await?;
        Ok(())
    }

    #[instrument(level = "info", skip(self))]
    async fn trigger_sync_pull(&self) -> Result<ResyncBatch> {
        let req = self.client.get(self.url("/api/v1/engage/sync"));
        Self::decode_batch(self.send(req).await?).await
    }

    #[instrument(level = "info", skip(self))]
    async fn trigger_sync_push(&self) -> Result<ResyncBatch> {
        let req = self.client.post(self.url("/api/v1/engage/sync"));
        Self::decode_batch(self.send(req).await?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_trailing_slash() {
        let c = LoopClient::new("https://loop.example.com/", "token");
        assert_eq!(c.base_url, "https://loop.example.com");
    }

    #[test]
    fn joins_paths_against_base() {
        let c = LoopClient::new("https://loop.example.com", "token");
        assert_eq!(
            c.url("/api/v1/engage/purchase-requests/R1/attachments/42"),
            "https://loop.example.com/api/v1/engage/purchase-requests/R1/attachments/42"
        );
    }
}
