//! Engage client (source side).
//!
//! Read-only, cookie-authenticated access to the purchase-request listing,
//! per-request detail, the additional-questions HTML page, and raw
//! attachment bytes.

use async_trait::async_trait;
use loopsync_core::attachments;
use loopsync_core::models::{AttachmentDownload, CookieJar};
use loopsync_core::sync::traits::SourceApi;
use loopsync_core::{Error, Result};
use reqwest::header::{CONTENT_DISPOSITION, COOKIE};
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::instrument;
use url::Url;

const DEFAULT_BASE_URL: &str = "https://gatech.campuslabs.com";
const DEFAULT_ORGANIZATION: &str = "robojackets";
const LISTING_PAGE_SIZE: u32 = 100;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const READ_TIMEOUT: Duration = Duration::from_secs(5);

pub struct EngageClient {
    client: Client,
    base_url: String,
    organization: String,
    cookies: CookieJar,
}

impl EngageClient {
    pub fn new(cookies: CookieJar) -> Self {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(READ_TIMEOUT)
            .build()
            .expect("reqwest client");
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            organization: DEFAULT_ORGANIZATION.to_string(),
            cookies,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = organization.into();
        self
    }

    /// GET a URL with the session cookies; non-200 is `Error::Upstream` with
    /// the response body preserved verbatim.
    async fn get_checked(&self, url: &str) -> Result<Response> {
        let resp = self
            .client
            .get(url)
            .header(COOKIE, self.cookies.header_value())
            .send()
            .await
            .map_err(|e| Error::transport("engage request", e))?;

        let status = resp.status();
        if status != StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Upstream {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }

    /// Resolve an entity-escaped relative attachment URL against the Engage
    /// origin.
    fn resolve_download_url(&self, relative_url: &str) -> Result<Url> {
        Url::parse(&self.base_url)
            .and_then(|base| base.join(&attachments::unescape(relative_url)))
            .map_err(|e| Error::transport("resolve attachment url", e))
    }
}

#[async_trait]
impl SourceApi for EngageClient {
    #[instrument(level = "info", skip(self))]
    async fn list_purchase_requests(&self) -> Result<Value> {
        let url = format!(
            "{}/engage/api/finance/{}/requests/purchase/list-items?take={}",
            self.base_url, self.organization, LISTING_PAGE_SIZE
        );
        let resp = self.get_checked(&url).await?;
        resp.json()
            .await
            .map_err(|e| Error::transport("decode listing payload", e))
    }

    #[instrument(level = "info", skip(self))]
    async fn get_purchase_request(&self, engage_id: &str) -> Result<Value> {
        let url = format!(
            "{}/engage/api/finance/{}/requests/purchase/{}/",
            self.base_url, self.organization, engage_id
        );
        let resp = self.get_checked(&url).await?;
        resp.json()
            .await
            .map_err(|e| Error::transport("decode purchase request detail", e))
    }

    #[instrument(level = "debug", skip(self))]
    async fn get_additional_questions_page(&self, engage_id: &str) -> Result<String> {
        let url = format!(
            "{}/engage/actionCenter/organization/{}/finance/financeRequestViewAdditionalQuestions/{}",
            self.base_url, self.organization, engage_id
        );
        let resp = self.get_checked(&url).await?;
        resp.text()
            .await
            .map_err(|e| Error::transport("read additional questions page", e))
    }

    #[instrument(level = "info", skip(self))]
    async fn download_attachment(&self, relative_url: &str) -> Result<AttachmentDownload> {
        let url = self.resolve_download_url(relative_url)?;
        let resp = self.get_checked(url.as_str()).await?;

        let content_disposition = resp
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| Error::transport("read attachment body", e))?;

        Ok(AttachmentDownload {
            bytes,
            content_disposition,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> EngageClient {
        EngageClient::new(CookieJar::new())
    }

    #[test]
    fn with_base_url_trims_trailing_slash() {
        let c = client().with_base_url("http://localhost:8000/");
        assert_eq!(c.base_url, "http://localhost:8000");
    }

    #[test]
    fn download_url_is_unescaped_and_resolved_against_origin() {
        let url = client()
            .resolve_download_url(
                "/engage/actionCenter/organization/robojackets/Finance/FileUploadQuestion/getdocument?DocumentId=12345&amp;RespondentId=678",
            )
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://gatech.campuslabs.com/engage/actionCenter/organization/robojackets/Finance/FileUploadQuestion/getdocument?DocumentId=12345&RespondentId=678"
        );
    }

    #[test]
    fn download_url_resolution_keeps_custom_origin() {
        let url = client()
            .with_base_url("http://127.0.0.1:9999")
            .resolve_download_url("/a/b?DocumentId=1&amp;RespondentId=2")
            .unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9999/a/b?DocumentId=1&RespondentId=2");
    }
}
