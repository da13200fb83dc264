use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cookie jar captured once after the interactive Engage login succeeds.
///
/// Read-only for the remainder of the run: no refresh, no re-authentication.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieJar {
    cookies: BTreeMap<String, String>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies.insert(name.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Render as a `Cookie` request-header value.
    pub fn header_value(&self) -> String {
        self.cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl FromIterator<(String, String)> for CookieJar {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            cookies: iter.into_iter().collect(),
        }
    }
}

/// Loop's reply listing the engage ids it wants individually resynced.
///
/// The same shape comes back from the bulk upsert and from both sync
/// triggers; each list is processed as its own pass, never merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResyncBatch {
    #[serde(default)]
    pub requests: Vec<String>,
}

/// Loop's stored view of a purchase request after an upsert.
///
/// Only `deleted_at` is interpreted here: a non-null value means the request
/// was soft-deleted on the Loop side and attachment sync must be skipped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PurchaseRequestView {
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl PurchaseRequestView {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Raw attachment bytes plus the response's `Content-Disposition` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentDownload {
    pub bytes: bytes::Bytes,
    pub content_disposition: Option<String>,
}

/// Counters accumulated over a run, logged once at the end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Per-id upserts performed, including soft-deleted requests.
    pub requests_synced: u64,
    /// Requests whose attachment sync was skipped because Loop reported them
    /// soft-deleted.
    pub requests_skipped_deleted: u64,
    pub attachments_uploaded: u64,
    /// Attachments skipped because Loop already had them.
    pub attachments_already_present: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_header_renders_sorted_pairs() {
        let mut jar = CookieJar::new();
        jar.insert("session", "abc123");
        jar.insert("csrf", "xyz");
        assert_eq!(jar.header_value(), "csrf=xyz; session=abc123");
    }

    #[test]
    fn empty_jar_renders_empty_header() {
        assert_eq!(CookieJar::new().header_value(), "");
        assert!(CookieJar::new().is_empty());
    }

    #[test]
    fn resync_batch_defaults_to_empty_list() {
        let batch: ResyncBatch = serde_json::from_str("{}").unwrap();
        assert!(batch.requests.is_empty());

        let batch: ResyncBatch = serde_json::from_str(r#"{"requests": ["7273767"]}"#).unwrap();
        assert_eq!(batch.requests, vec!["7273767"]);
    }

    #[test]
    fn view_interprets_deleted_at() {
        let view: PurchaseRequestView =
            serde_json::from_str(r#"{"deleted_at": null, "id": 4}"#).unwrap();
        assert!(!view.is_deleted());

        let view: PurchaseRequestView =
            serde_json::from_str(r#"{"deleted_at": "2026-08-01T12:00:00Z"}"#).unwrap();
        assert!(view.is_deleted());
    }
}
