//! Book records parsed from a normalized payload.
//!
//! The record contract is fixed: every `book` element yields one
//! [`BookRecord`] carrying exactly five fields, and a field whose child
//! element is absent or empty comes back as [`UNKNOWN_FIELD`] rather than
//! failing the record. Records keep document order, duplicates included.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::markup::{self, Element};

/// Sentinel default for absent or empty record fields.
pub const UNKNOWN_FIELD: &str = "Unknown";

/// The record field names, in their fixed order.
pub const BOOK_FIELDS: [&str; 5] = ["title", "author", "publication_year", "genre", "isbn"];

/// One book parsed from a record-list payload.
///
/// All fields are plain strings; `publication_year` stays textual because
/// models routinely emit values like `"c. 1890"` or `"Unknown"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRecord {
    pub title: String,
    pub author: String,
    pub publication_year: String,
    pub genre: String,
    pub isbn: String,
}

impl BookRecord {
    fn from_element(item: &Element) -> Self {
        Self {
            title: field_text(item, "title"),
            author: field_text(item, "author"),
            publication_year: field_text(item, "publication_year"),
            genre: field_text(item, "genre"),
            isbn: field_text(item, "isbn"),
        }
    }
}

/// Text of the named child element, defaulting to [`UNKNOWN_FIELD`] when
/// the child is absent or has no text of its own.
fn field_text(item: &Element, name: &str) -> String {
    match item.child(name).and_then(Element::text) {
        Some(text) => text.to_string(),
        None => UNKNOWN_FIELD.to_string(),
    }
}

/// Parse every `book` record out of a normalized payload.
///
/// The payload must parse as markup, otherwise
/// [`MalformedPayload`](crate::HarvestError::MalformedPayload). The root
/// element's own name is not checked; it contributes one record per direct
/// `book` child, in document order. A root with no `book` children yields an
/// empty list, which is not an error.
///
/// # Examples
///
/// ```
/// use llm_harvest::records::parse_book_records;
///
/// let payload = "<booklist>\n  <book>\n    <title>Dune</title>\n  </book>\n</booklist>";
/// let books = parse_book_records(payload).unwrap();
/// assert_eq!(books[0].title, "Dune");
/// assert_eq!(books[0].author, "Unknown");
/// ```
pub fn parse_book_records(payload: &str) -> Result<Vec<BookRecord>> {
    let root = markup::parse(payload)?;
    Ok(root
        .children_named("book")
        .map(BookRecord::from_element)
        .collect())
}
