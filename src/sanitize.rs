//! Deterministic repair of known malformations in raw model output.
//!
//! Models asked for markup tend to mangle it in recurring, recognizable
//! ways: fencing the payload in a markdown code block, folding an author
//! name into the tag itself, or separating a genre from its tag with a bar.
//! [`sanitize`] applies the ordered table of repairs in [`REPAIRS`] to undo
//! exactly those patterns. Anything else, including malformations this
//! module has never seen, passes through untouched.
//!
//! No regex is used; every repair is a manual string operation.

/// A single repair rule applied by [`sanitize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repair {
    /// Delete every occurrence of a literal marker.
    StripLiteral(&'static str),
    /// Rewrite `{prefix}CONTENT>` into `<{tag}>CONTENT</{tag}>`, for
    /// non-empty CONTENT containing no `>`.
    ReopenTag {
        /// The literal that opens the malformed tag (e.g. `"<author"`).
        prefix: &'static str,
        /// The well-formed tag name to emit.
        tag: &'static str,
    },
}

/// The ordered repair table.
///
/// Order matters: `` ```xml `` must be removed before plain `` ``` ``, or
/// the bare-fence rule would eat the backticks and leave `xml` behind.
pub const REPAIRS: &[Repair] = &[
    Repair::StripLiteral("```xml"),
    Repair::StripLiteral("```"),
    Repair::ReopenTag {
        prefix: "<author",
        tag: "author",
    },
    Repair::ReopenTag {
        prefix: "<genre|",
        tag: "genre",
    },
];

/// Repair known malformations in raw model output.
///
/// Repairs applied (in order):
/// 1. Remove `` ```xml `` fence markers
/// 2. Remove remaining `` ``` `` fence markers
/// 3. Reopen loose author tags: `<author J. Doe>` becomes `<author> J. Doe</author>`
/// 4. Reopen bar-separated genre tags: `<genre|Fiction>` becomes `<genre>Fiction</genre>`
///
/// The relative order of surviving text never changes, and text already free
/// of these patterns comes back byte-identical, so repairing twice is the
/// same as repairing once.
///
/// # Examples
///
/// ```
/// use llm_harvest::sanitize::sanitize;
///
/// let raw = "```xml\n<book><author Herman Hesse></book>\n```";
/// assert_eq!(sanitize(raw), "\n<book><author> Herman Hesse</author></book>\n");
/// ```
pub fn sanitize(text: &str) -> String {
    REPAIRS
        .iter()
        .fold(text.to_string(), |repaired, rule| rule.apply(&repaired))
}

impl Repair {
    /// Apply this one rule to the input.
    pub fn apply(&self, text: &str) -> String {
        match self {
            Repair::StripLiteral(marker) => text.replace(marker, ""),
            Repair::ReopenTag { prefix, tag } => reopen_tag(text, prefix, tag),
        }
    }
}

/// Rewrite every `{prefix}CONTENT>` as `<{tag}>CONTENT</{tag}>`.
///
/// CONTENT runs from the end of the prefix up to (not including) the next
/// `>`, and may span newlines. Two shapes are left alone: `{prefix}>` with
/// nothing in between (already well-formed), and a `{prefix}` with no `>`
/// anywhere after it. A closing tag like `</author>` can never match, since
/// the prefix starts with `<` followed directly by the tag name.
fn reopen_tag(text: &str, prefix: &str, tag: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find(prefix) {
        let after = &rest[pos + prefix.len()..];
        match after.find('>') {
            Some(0) => {
                // Well-formed occurrence: keep the prefix and its `>` as-is.
                result.push_str(&rest[..pos + prefix.len() + 1]);
                rest = &after[1..];
            }
            Some(gt) => {
                result.push_str(&rest[..pos]);
                result.push('<');
                result.push_str(tag);
                result.push('>');
                result.push_str(&after[..gt]);
                result.push_str("</");
                result.push_str(tag);
                result.push('>');
                rest = &after[gt + 1..];
            }
            None => break,
        }
    }

    result.push_str(rest);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_xml_fence() {
        assert_eq!(sanitize("```xml\n<booklist>"), "\n<booklist>");
    }

    #[test]
    fn strips_bare_fence() {
        assert_eq!(sanitize("<booklist>\n```"), "<booklist>\n");
    }

    #[test]
    fn fence_order_leaves_no_xml_residue() {
        let repaired = sanitize("```xml\n<booklist></booklist>\n```");
        assert!(!repaired.contains("xml"));
        assert!(!repaired.contains("`"));
    }

    #[test]
    fn reopens_loose_author_tag() {
        assert_eq!(
            sanitize("<author Herman Hesse>"),
            "<author> Herman Hesse</author>"
        );
    }

    #[test]
    fn reopens_genre_bar_tag() {
        assert_eq!(sanitize("<genre|Fiction>"), "<genre>Fiction</genre>");
    }

    #[test]
    fn wellformed_author_untouched() {
        let text = "<author>Herman Hesse</author>";
        assert_eq!(sanitize(text), text);
    }

    #[test]
    fn empty_genre_bar_untouched() {
        assert_eq!(sanitize("<genre|>"), "<genre|>");
    }

    #[test]
    fn author_without_closing_angle_untouched() {
        assert_eq!(sanitize("<author Herman"), "<author Herman");
    }

    #[test]
    fn author_content_may_span_lines() {
        assert_eq!(
            sanitize("<author Herman\nHesse>"),
            "<author> Herman\nHesse</author>"
        );
    }

    #[test]
    fn repairs_every_occurrence() {
        let raw = "<author A><author B>";
        assert_eq!(sanitize(raw), "<author> A</author><author> B</author>");
    }

    #[test]
    fn unknown_malformations_untouched() {
        let text = "<title Broken Tag> <isbn|123>";
        assert_eq!(sanitize(text), text);
    }

    #[test]
    fn clean_text_passes_through() {
        let text = "<booklist>\n  <book>\n    <title>Siddhartha</title>\n  </book>\n</booklist>";
        assert_eq!(sanitize(text), text);
    }

    #[test]
    fn idempotent_after_repair() {
        let raw = "```xml\n<book><author J. R. R. Tolkien><genre|Fantasy></book>\n```";
        let once = sanitize(raw);
        assert_eq!(sanitize(&once), once);
    }

    #[test]
    fn combined_repairs_in_one_pass() {
        let raw = "Here you go:\n```xml\n<book><author Ursula K. Le Guin><genre|Science Fiction></book>\n```";
        assert_eq!(
            sanitize(raw),
            "Here you go:\n\n<book><author> Ursula K. Le Guin</author><genre>Science Fiction</genre></book>\n"
        );
    }

    #[test]
    fn single_rule_applies_independently() {
        let rule = Repair::StripLiteral("```");
        assert_eq!(rule.apply("a```b"), "ab");
    }
}
