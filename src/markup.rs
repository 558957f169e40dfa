//! Lenient markup tree for model-emitted payloads.
//!
//! A small element-tree parser and canonical renderer for the XML-like
//! payloads this crate pulls out of model responses. It is deliberately not
//! a general XML parser: it reads one payload family as forgivingly as
//! possible (auto-closing unbalanced tags, dropping stray close tags,
//! skipping comments and declarations, treating stray `<` as text) and
//! re-renders the result in a stable indented form that survives reparsing.

use crate::error::{HarvestError, Result};

/// One node in a parsed payload tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A child element.
    Element(Element),
    /// A run of character data, trimmed, with entities decoded.
    Text(String),
}

/// A parsed element: name, attributes, and children, all in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Tag name as written in the source.
    pub name: String,
    /// Attributes in source order, entity references decoded.
    pub attrs: Vec<(String, String)>,
    /// Child nodes in document order.
    pub nodes: Vec<Node>,
}

impl Element {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            nodes: Vec::new(),
        }
    }

    /// Look up an attribute value by exact name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(attr, _)| attr == name)
            .map(|(_, value)| value.as_str())
    }

    /// All direct child elements, in document order.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.nodes.iter().filter_map(|node| match node {
            Node::Element(elem) => Some(elem),
            Node::Text(_) => None,
        })
    }

    /// Direct child elements with the given name, in document order.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.child_elements().filter(move |elem| elem.name == name)
    }

    /// First direct child element with the given name.
    pub fn child<'a>(&'a self, name: &'a str) -> Option<&'a Element> {
        self.children_named(name).next()
    }

    /// Leading character data: the text appearing before any child element.
    /// `None` when the element is empty or starts with a child element.
    pub fn text(&self) -> Option<&str> {
        match self.nodes.first() {
            Some(Node::Text(text)) => Some(text.as_str()),
            _ => None,
        }
    }
}

/// Parse the first element found in `input`, leniently.
///
/// Leniency rules:
/// - a close tag with no matching open element is dropped
/// - a close tag that skips over open elements implicitly closes them
/// - elements still open at end of input are implicitly closed
/// - `<elem/>` self-closing syntax is accepted
/// - comments, doctypes, and `<?...?>` declarations are skipped
/// - a `<` that does not begin a plausible tag is literal text
///
/// Character data is trimmed and whitespace-only runs are dropped, so
/// indentation never shows up as text nodes. Prose before or after the first
/// top-level element is ignored. Fails with
/// [`HarvestError::MalformedPayload`] only when no element can be found at
/// all.
pub fn parse(input: &str) -> Result<Element> {
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;
    let mut stack: Vec<Element> = Vec::new();
    let mut roots: Vec<Node> = Vec::new();
    let mut text = String::new();

    while i < chars.len() {
        if chars[i] == '<' {
            match chars.get(i + 1) {
                Some('/') => {
                    flush_text(&mut text, &mut stack, &mut roots);
                    i = close_tag(&chars, i + 2, &mut stack, &mut roots);
                    continue;
                }
                Some('!') | Some('?') => {
                    flush_text(&mut text, &mut stack, &mut roots);
                    i = skip_directive(&chars, i);
                    continue;
                }
                Some(&next) if is_name_start(next) => {
                    flush_text(&mut text, &mut stack, &mut roots);
                    i = open_tag(&chars, i + 1, &mut stack, &mut roots);
                    continue;
                }
                _ => {}
            }
        }
        text.push(chars[i]);
        i += 1;
    }
    flush_text(&mut text, &mut stack, &mut roots);

    // Implicitly close anything still open at end of input.
    while let Some(done) = stack.pop() {
        attach(Node::Element(done), &mut stack, &mut roots);
    }

    roots
        .into_iter()
        .find_map(|node| match node {
            Node::Element(elem) => Some(elem),
            Node::Text(_) => None,
        })
        .ok_or_else(|| HarvestError::MalformedPayload {
            reason: "no markup element found".into(),
        })
}

fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')
}

/// Attach a completed node to the innermost open element, or to the top
/// level when nothing is open.
fn attach(node: Node, stack: &mut Vec<Element>, roots: &mut Vec<Node>) {
    match stack.last_mut() {
        Some(parent) => parent.nodes.push(node),
        None => roots.push(node),
    }
}

/// Trim and attach buffered character data; whitespace-only runs vanish.
fn flush_text(text: &mut String, stack: &mut Vec<Element>, roots: &mut Vec<Node>) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        attach(Node::Text(decode_entities(trimmed)), stack, roots);
    }
    text.clear();
}

/// Read an open tag starting at its name (just past `<`). Returns the index
/// just past the tag. A tag with no `>` consumes the rest of the input and
/// the element is left for the end-of-input auto-close.
fn open_tag(chars: &[char], mut i: usize, stack: &mut Vec<Element>, roots: &mut Vec<Node>) -> usize {
    let mut name = String::new();
    while i < chars.len() && is_name_char(chars[i]) {
        name.push(chars[i]);
        i += 1;
    }

    let mut elem = Element::new(name);
    let mut self_closed = false;

    loop {
        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }
        if i >= chars.len() {
            break;
        }
        match chars[i] {
            '>' => {
                i += 1;
                break;
            }
            '/' if chars.get(i + 1) == Some(&'>') => {
                self_closed = true;
                i += 2;
                break;
            }
            '/' => {
                // Stray slash inside the tag.
                i += 1;
            }
            _ => {
                let (attr, next) = read_attr(chars, i);
                if let Some(pair) = attr {
                    elem.attrs.push(pair);
                }
                i = next;
            }
        }
    }

    if self_closed {
        attach(Node::Element(elem), stack, roots);
    } else {
        stack.push(elem);
    }
    i
}

/// Read one attribute at `i`: `name`, `name=value`, `name="value"`, or
/// `name='value'`. Returns the parsed pair (`None` for unreadable
/// fragments) and the index after it. Always consumes at least one
/// character.
fn read_attr(chars: &[char], mut i: usize) -> (Option<(String, String)>, usize) {
    let start = i;
    let mut name = String::new();
    while i < chars.len() && !chars[i].is_whitespace() && !matches!(chars[i], '=' | '>' | '/') {
        name.push(chars[i]);
        i += 1;
    }
    if name.is_empty() {
        // Unreadable fragment, e.g. a stray `=`. Skip one char.
        return (None, start + 1);
    }

    let mut j = i;
    while j < chars.len() && chars[j].is_whitespace() {
        j += 1;
    }
    if chars.get(j) != Some(&'=') {
        // Bare attribute name with no value.
        return (Some((name, String::new())), i);
    }
    j += 1;
    while j < chars.len() && chars[j].is_whitespace() {
        j += 1;
    }

    let mut value = String::new();
    match chars.get(j).copied() {
        Some(quote) if quote == '"' || quote == '\'' => {
            j += 1;
            while j < chars.len() && chars[j] != quote {
                value.push(chars[j]);
                j += 1;
            }
            if j < chars.len() {
                j += 1;
            }
        }
        _ => {
            while j < chars.len() && !chars[j].is_whitespace() && !matches!(chars[j], '>' | '/') {
                value.push(chars[j]);
                j += 1;
            }
        }
    }
    (Some((name, decode_entities(&value))), j)
}

/// Read a close tag starting just past `</`. Returns the index past `>`.
///
/// Pops the stack down to the nearest matching open element, implicitly
/// closing anything opened in between. A close tag matching nothing on the
/// stack is dropped.
fn close_tag(chars: &[char], mut i: usize, stack: &mut Vec<Element>, roots: &mut Vec<Node>) -> usize {
    let mut name = String::new();
    while i < chars.len() && is_name_char(chars[i]) {
        name.push(chars[i]);
        i += 1;
    }
    while i < chars.len() && chars[i] != '>' {
        i += 1;
    }
    if i < chars.len() {
        i += 1;
    }

    if stack.iter().any(|elem| elem.name == name) {
        while let Some(done) = stack.pop() {
            let matched = done.name == name;
            attach(Node::Element(done), stack, roots);
            if matched {
                break;
            }
        }
    }
    i
}

/// Skip a comment, doctype, or `<?...?>` declaration starting at `<`.
/// Returns the index just past the construct. Comments end at `-->`;
/// everything else ends at the next `>`.
fn skip_directive(chars: &[char], i: usize) -> usize {
    let is_comment = chars.get(i + 1) == Some(&'!')
        && chars.get(i + 2) == Some(&'-')
        && chars.get(i + 3) == Some(&'-');

    if is_comment {
        let mut j = i + 4;
        while j < chars.len() {
            if chars[j] == '>' && j >= 2 && chars[j - 1] == '-' && chars[j - 2] == '-' {
                return j + 1;
            }
            j += 1;
        }
        return chars.len();
    }

    let mut j = i + 1;
    while j < chars.len() && chars[j] != '>' {
        j += 1;
    }
    if j < chars.len() {
        j + 1
    } else {
        chars.len()
    }
}

const ENTITIES: [(&str, char); 5] = [
    ("&amp;", '&'),
    ("&lt;", '<'),
    ("&gt;", '>'),
    ("&quot;", '"'),
    ("&apos;", '\''),
];

/// Decode the five standard entity references; unknown entities pass
/// through verbatim.
fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '&' {
            let lookahead: String = chars[i..].iter().take(6).collect();
            if let Some((entity, decoded)) = ENTITIES
                .iter()
                .find(|(entity, _)| lookahead.starts_with(entity))
            {
                result.push(*decoded);
                // Entities are pure ASCII, so char count equals byte count.
                i += entity.len();
                continue;
            }
        }
        result.push(chars[i]);
        i += 1;
    }
    result
}

/// Escape `&`, `<`, and `>` in character data.
fn encode_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape `&`, `<`, and `"` in attribute values.
fn encode_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render an element tree in canonical indented form.
///
/// Two-space indentation per depth. An element with no children renders as
/// `<name></name>` on one line, as does an element whose only child is text.
/// Attributes are double-quoted. No trailing newline. The output is a fixed
/// point: parsing it and rendering again reproduces it byte for byte.
pub fn prettify(root: &Element) -> String {
    let mut out = String::new();
    render(root, 0, &mut out);
    out
}

fn render(elem: &Element, depth: usize, out: &mut String) {
    let pad = "  ".repeat(depth);
    out.push_str(&pad);
    out.push('<');
    out.push_str(&elem.name);
    for (name, value) in &elem.attrs {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(&encode_attr(value));
        out.push('"');
    }
    out.push('>');

    match elem.nodes.as_slice() {
        [] => {}
        [Node::Text(text)] => out.push_str(&encode_text(text)),
        nodes => {
            for node in nodes {
                out.push('\n');
                match node {
                    Node::Element(child) => render(child, depth + 1, out),
                    Node::Text(text) => {
                        out.push_str(&"  ".repeat(depth + 1));
                        out.push_str(&encode_text(text));
                    }
                }
            }
            out.push('\n');
            out.push_str(&pad);
        }
    }

    out.push_str("</");
    out.push_str(&elem.name);
    out.push('>');
}
