//! Payload extraction from model responses.
//!
//! Locates a delimited markup payload inside arbitrary surrounding text and
//! normalizes it into canonical indented form. Extraction is strict about
//! the delimiters (both present, in order, or the whole operation fails) and
//! lenient about everything around and inside them.

use crate::error::{HarvestError, Result};
use crate::markup;

/// Delimiter tag name for record-list payloads.
pub const BOOKLIST_TAG: &str = "booklist";

/// Extract and normalize the payload delimited by `<tag>...</tag>`.
///
/// The raw payload runs from the first `<tag>` through the end of the first
/// `</tag>` after it, inclusive. When either delimiter is missing, or the
/// only close sits before the open, the whole operation fails with
/// [`HarvestError::PayloadNotFound`]; there is no partial result.
///
/// The payload is then reparsed and re-rendered via
/// [`markup::prettify`]. Element names, attributes, and text content are
/// preserved; only whitespace and presentation change. The result starts
/// with `<tag>` and ends with `</tag>` again, so running extraction on its
/// own output returns it unchanged.
///
/// # Examples
///
/// ```
/// use llm_harvest::extract::extract_payload;
///
/// let response = "Sure! Here you go:\n<booklist><book><title>Dune</title></book></booklist>\nEnjoy!";
/// let payload = extract_payload(response, "booklist").unwrap();
/// assert!(payload.starts_with("<booklist>"));
/// assert!(payload.ends_with("</booklist>"));
/// assert_eq!(extract_payload(&payload, "booklist").unwrap(), payload);
/// ```
pub fn extract_payload(text: &str, tag: &str) -> Result<String> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);

    let start = text.find(&open).ok_or_else(|| HarvestError::PayloadNotFound {
        tag: tag.to_string(),
    })?;
    let search_from = start + open.len();
    let end = text[search_from..]
        .find(&close)
        .map(|rel| search_from + rel + close.len())
        .ok_or_else(|| HarvestError::PayloadNotFound {
            tag: tag.to_string(),
        })?;

    let root = markup::parse(&text[start..end])?;
    Ok(markup::prettify(&root))
}

/// Extract and normalize a [`BOOKLIST_TAG`] payload.
pub fn extract_booklist(text: &str) -> Result<String> {
    extract_payload(text, BOOKLIST_TAG)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESPONSE: &str = "Absolutely! Here is the list:\n\
        <booklist><book><title>Dune</title><author>Frank Herbert</author></book></booklist>\n\
        Hope that helps!";

    #[test]
    fn finds_payload_inside_prose() {
        let payload = extract_booklist(RESPONSE).unwrap();
        assert!(payload.starts_with("<booklist>"));
        assert!(payload.ends_with("</booklist>"));
        assert!(!payload.contains("Absolutely"));
        assert!(!payload.contains("Hope"));
    }

    #[test]
    fn normalizes_to_indented_form() {
        let payload = extract_booklist(RESPONSE).unwrap();
        assert_eq!(
            payload,
            "<booklist>\n  <book>\n    <title>Dune</title>\n    <author>Frank Herbert</author>\n  </book>\n</booklist>"
        );
    }

    #[test]
    fn extraction_is_idempotent() {
        let once = extract_booklist(RESPONSE).unwrap();
        assert_eq!(extract_booklist(&once).unwrap(), once);
    }

    #[test]
    fn missing_open_delimiter() {
        let err = extract_booklist("no markup here at all").unwrap_err();
        assert!(matches!(err, HarvestError::PayloadNotFound { ref tag } if tag == "booklist"));
    }

    #[test]
    fn missing_close_delimiter() {
        let err = extract_booklist("<booklist><book></book>").unwrap_err();
        assert!(matches!(err, HarvestError::PayloadNotFound { .. }));
    }

    #[test]
    fn close_before_open_not_found() {
        let err = extract_booklist("</booklist> and later <booklist> unclosed").unwrap_err();
        assert!(matches!(err, HarvestError::PayloadNotFound { .. }));
    }

    #[test]
    fn uses_first_open_and_first_close_after_it() {
        let text = "<booklist><book><title>A</title></book></booklist> ignored <booklist></booklist>";
        let payload = extract_booklist(text).unwrap();
        assert!(payload.contains("<title>A</title>"));
        assert_eq!(payload.matches("<booklist>").count(), 1);
    }

    #[test]
    fn empty_booklist_survives() {
        let payload = extract_booklist("prefix <booklist></booklist> suffix").unwrap();
        assert_eq!(payload, "<booklist></booklist>");
        assert_eq!(extract_booklist(&payload).unwrap(), payload);
    }

    #[test]
    fn preserves_names_attrs_and_text() {
        let text = r#"<booklist><book id="1"><title>Tom &amp; Jerry</title></book></booklist>"#;
        let payload = extract_booklist(text).unwrap();
        assert!(payload.contains(r#"<book id="1">"#));
        assert!(payload.contains("Tom &amp; Jerry"));
    }

    #[test]
    fn custom_delimiter_tag() {
        let payload = extract_payload("x <inventory><item>axe</item></inventory> y", "inventory").unwrap();
        assert!(payload.starts_with("<inventory>"));
        assert!(payload.contains("<item>axe</item>"));
    }
}
