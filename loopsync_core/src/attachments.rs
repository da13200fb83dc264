//! Attachment-link extraction and metadata resolution.
//!
//! The additional-questions page embeds download links as literal,
//! HTML-entity-escaped URLs. Extraction is a plain pattern scan over the
//! page text; the orchestrator never needs a full markup parse.

use crate::{Error, Result};
use regex::Regex;
use std::sync::OnceLock;

/// Download links as they appear in the page source: entity-escaped, with a
/// numeric `DocumentId`/`RespondentId` query pair.
const ATTACHMENT_LINK_PATTERN: &str = r"/engage/actionCenter/organization/robojackets/Finance/FileUploadQuestion/getdocument\?DocumentId=[0-9]+&amp;RespondentId=[0-9]+";

fn link_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(ATTACHMENT_LINK_PATTERN).expect("attachment link pattern"))
}

/// Scan an HTML fragment for attachment download links, in document order.
///
/// Duplicates are preserved as found; the sink's existence check is the
/// authoritative dedup gate, not this scan.
pub fn extract_attachment_links(html: &str) -> Vec<String> {
    link_pattern()
        .find_iter(html)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// `DocumentId` query value from a download URL (escaped or not).
pub fn parse_document_id(url: &str) -> Result<String> {
    query_param(url, "DocumentId")
}

/// Companion `RespondentId` query value. Extracted for parity with the URL
/// shape; the sync protocol itself never uses it.
pub fn parse_respondent_id(url: &str) -> Result<String> {
    query_param(url, "RespondentId")
}

fn query_param(url: &str, name: &str) -> Result<String> {
    let unescaped = unescape(url);
    let query = unescaped.split_once('?').map(|(_, q)| q).unwrap_or("");
    let value = url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
        .ok_or_else(|| Error::Malformed(format!("missing {name} parameter in url: {url}")))?;
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::Malformed(format!(
            "non-numeric {name} parameter in url: {url}"
        )));
    }
    Ok(value)
}

/// `filename` parameter of a `Content-Disposition` header, quoted or bare.
pub fn resolve_filename(header: &str) -> Result<String> {
    for param in header.split(';').skip(1) {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        if !key.trim().eq_ignore_ascii_case("filename") {
            continue;
        }
        let value = value.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(value);
        if value.is_empty() {
            break;
        }
        return Ok(value.to_string());
    }
    Err(Error::Malformed(format!(
        "no filename in content-disposition header: {header}"
    )))
}

/// Unescape the standard five HTML entities. `&amp;` goes last so a
/// double-escaped `&amp;lt;` comes out as `&lt;`, not `<`.
pub fn unescape(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINK: &str = "/engage/actionCenter/organization/robojackets/Finance/FileUploadQuestion/getdocument?DocumentId=12345&amp;RespondentId=678";

    #[test]
    fn extracts_links_in_document_order() {
        let html = format!(
            r#"<p>receipt</p><a href="{LINK}">one</a><br><a href="{other}">two</a>"#,
            other = LINK.replace("12345", "99")
        );
        let links = extract_attachment_links(&html);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0], LINK);
        assert!(links[1].contains("DocumentId=99"));
    }

    #[test]
    fn extraction_preserves_duplicates() {
        let html = format!("{LINK} filler {LINK}");
        assert_eq!(extract_attachment_links(&html).len(), 2);
    }

    #[test]
    fn extraction_requires_escaped_ampersand() {
        // Raw (already-unescaped) links do not occur in page source.
        let html = LINK.replace("&amp;", "&");
        assert!(extract_attachment_links(&html).is_empty());
    }

    #[test]
    fn no_links_on_plain_page() {
        assert!(extract_attachment_links("<html><body>no uploads</body></html>").is_empty());
    }

    #[test]
    fn parses_document_id() {
        assert_eq!(parse_document_id(LINK).unwrap(), "12345");
        // Works on the unescaped form too.
        assert_eq!(
            parse_document_id(&LINK.replace("&amp;", "&")).unwrap(),
            "12345"
        );
    }

    #[test]
    fn parses_respondent_id() {
        assert_eq!(parse_respondent_id(LINK).unwrap(), "678");
    }

    #[test]
    fn missing_or_non_numeric_param_is_malformed() {
        let err = parse_document_id("/getdocument?RespondentId=678").unwrap_err();
        assert!(matches!(err, Error::Malformed(_)));

        let err = parse_document_id("/getdocument?DocumentId=abc").unwrap_err();
        assert!(matches!(err, Error::Malformed(_)));

        let err = parse_document_id("/getdocument").unwrap_err();
        assert!(matches!(err, Error::Malformed(_)));
    }

    #[test]
    fn resolves_quoted_filename() {
        assert_eq!(
            resolve_filename(r#"attachment; filename="receipt.pdf""#).unwrap(),
            "receipt.pdf"
        );
    }

    #[test]
    fn resolves_bare_filename() {
        assert_eq!(
            resolve_filename("attachment; filename=receipt.pdf").unwrap(),
            "receipt.pdf"
        );
    }

    #[test]
    fn filename_is_found_among_other_params() {
        assert_eq!(
            resolve_filename(r#"attachment; size=42; filename="a b.png"; creation-date="x""#)
                .unwrap(),
            "a b.png"
        );
    }

    #[test]
    fn missing_filename_is_malformed() {
        let err = resolve_filename("inline").unwrap_err();
        assert!(matches!(err, Error::Malformed(_)));

        let err = resolve_filename("attachment; size=42").unwrap_err();
        assert!(matches!(err, Error::Malformed(_)));
    }

    #[test]
    fn unescapes_entities() {
        assert_eq!(unescape("a=1&amp;b=2"), "a=1&b=2");
        assert_eq!(unescape("&lt;tag&gt; &quot;q&quot; &#39;s&#39;"), "<tag> \"q\" 's'");
        assert_eq!(unescape("&amp;lt;"), "&lt;");
    }
}
