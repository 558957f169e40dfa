//! Whitelisted call execution.
//!
//! Takes a model-proposed call expression like `CalculateSum(a=5, b=3)` and
//! runs it against a caller-built [`Whitelist`]. The name gate comes first:
//! the argument text is not parsed, let alone evaluated, until the candidate
//! name has resolved to a whitelist entry. Arguments are data literals bound
//! to that entry's declared parameter list; there is no shared namespace, so
//! argument text can never reach builtins, other whitelist entries, or the
//! host program.

use std::collections::HashMap;
use std::sync::Arc;

use crate::convert::ArgValue;
use crate::error::{HarvestError, Result};
use crate::synth::{call_name, narrow_call_expression, InvocationArguments};

/// A whitelisted callable: receives bound keyword arguments, returns a
/// value or a failure message.
pub type CallableFn =
    Arc<dyn Fn(&InvocationArguments) -> std::result::Result<ArgValue, String> + Send + Sync>;

struct Entry {
    /// Declared parameter names, in positional order.
    params: Vec<String>,
    func: CallableFn,
}

/// Caller-owned registry of approved callables.
///
/// Each entry declares its parameter names (used for positional binding and
/// arity checks) alongside the callable itself. The invoker only ever reads
/// the registry; nothing a model writes can add, remove, or reach entries.
///
/// # Examples
///
/// ```
/// use llm_harvest::convert::ArgValue;
/// use llm_harvest::invoker::{invoke, Whitelist};
///
/// let whitelist = Whitelist::new().register("CalculateSum", &["a", "b"], |args| {
///     let a = args.get("a").and_then(ArgValue::as_int).ok_or("a must be an int")?;
///     let b = args.get("b").and_then(ArgValue::as_int).ok_or("b must be an int")?;
///     Ok(ArgValue::Int(a + b))
/// });
///
/// assert_eq!(invoke("CalculateSum(a=5, b=3)", &whitelist).unwrap(), ArgValue::Int(8));
/// ```
#[derive(Default)]
pub struct Whitelist {
    entries: HashMap<String, Entry>,
}

impl Whitelist {
    /// Create an empty whitelist.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callable under `name` with its declared parameter names.
    /// Registering the same name again replaces the earlier entry.
    pub fn register<F>(mut self, name: impl Into<String>, params: &[&str], func: F) -> Self
    where
        F: Fn(&InvocationArguments) -> std::result::Result<ArgValue, String> + Send + Sync + 'static,
    {
        self.entries.insert(
            name.into(),
            Entry {
                params: params.iter().map(|p| p.to_string()).collect(),
                func: Arc::new(func),
            },
        );
        self
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Number of registered callables.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the whitelist has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for Whitelist {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("Whitelist").field("entries", &names).finish()
    }
}

/// Execute a model-proposed call expression against the whitelist.
///
/// Steps, in order:
/// 1. Narrow the text to its first call-shaped substring
///    ([`narrow_call_expression`]); none at all is
///    [`HarvestError::Invocation`].
/// 2. Gate the candidate name: an unregistered name fails with
///    [`HarvestError::UnknownFunction`] before the argument text is even
///    looked at.
/// 3. Parse the argument text under a strict grammar: comma-separated
///    items, each a literal or `keyword=literal`. Literals are quoted
///    strings, booleans, integers, and floats; a bare identifier is not a
///    literal, so arguments cannot name other callables or host values.
/// 4. Bind positional arguments to the entry's declared parameter names in
///    order and keywords by name. Every declared parameter must be bound
///    exactly once.
/// 5. Run the callable. An `Err` from it comes back as
///    [`HarvestError::Invocation`].
pub fn invoke(call_text: &str, whitelist: &Whitelist) -> Result<ArgValue> {
    let call = match narrow_call_expression(call_text) {
        Some(call) => call,
        None => return Err(invocation("no function call expression found")),
    };

    let name = call_name(call);
    let entry = match whitelist.entries.get(name) {
        Some(entry) => entry,
        None => {
            return Err(HarvestError::UnknownFunction {
                name: name.to_string(),
            })
        }
    };

    // The narrowed call is `name(...)`; the argument text sits between the
    // first `(` and the final `)`.
    let open = match call.find('(') {
        Some(pos) => pos,
        None => return Err(invocation("malformed call expression")),
    };
    let arg_text = &call[open + 1..call.len() - 1];

    let parsed = parse_call_args(arg_text)?;
    let bound = bind_args(&entry.params, parsed)?;

    (entry.func)(&bound).map_err(|reason| HarvestError::Invocation { reason })
}

fn invocation(reason: impl Into<String>) -> HarvestError {
    HarvestError::Invocation {
        reason: reason.into(),
    }
}

/// One parsed argument: optional keyword plus literal value.
#[derive(Debug, Clone, PartialEq)]
struct CallArg {
    keyword: Option<String>,
    value: ArgValue,
}

/// Parse argument text under the strict grammar.
fn parse_call_args(arg_text: &str) -> Result<Vec<CallArg>> {
    if arg_text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut args = Vec::new();
    for piece in split_top_level(arg_text)? {
        let piece = piece.trim();
        if piece.is_empty() {
            return Err(invocation("empty argument"));
        }
        let (keyword, value_text) = match split_keyword(piece) {
            Some((keyword, rest)) => (Some(keyword.to_string()), rest.trim()),
            None => (None, piece),
        };
        let value = parse_literal(value_text)?;
        args.push(CallArg { keyword, value });
    }
    Ok(args)
}

/// Split on commas outside quoted strings.
fn split_top_level(s: &str) -> Result<Vec<&str>> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut in_string: Option<char> = None;
    let mut escape_next = false;

    for (i, c) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        if let Some(quote) = in_string {
            if c == '\\' {
                escape_next = true;
            } else if c == quote {
                in_string = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => in_string = Some(c),
            ',' => {
                pieces.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if in_string.is_some() {
        return Err(invocation("unterminated string literal in arguments"));
    }
    pieces.push(&s[start..]);
    Ok(pieces)
}

/// Split `identifier = rest` when the piece has that shape. Pieces whose
/// head is not a plain identifier (for example a quoted string containing
/// `=`) are left whole for literal parsing.
fn split_keyword(piece: &str) -> Option<(&str, &str)> {
    let eq = piece.find('=')?;
    let head = piece[..eq].trim();
    let mut chars = head.chars();
    let first = chars.next()?;
    if !(first.is_ascii_alphabetic() || first == '_') {
        return None;
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    Some((head, &piece[eq + 1..]))
}

/// Parse a single literal: quoted string, boolean, integer, or float.
fn parse_literal(text: &str) -> Result<ArgValue> {
    if text.is_empty() {
        return Err(invocation("missing argument value"));
    }
    if text.starts_with('"') || text.starts_with('\'') {
        return parse_string_literal(text);
    }
    if text.eq_ignore_ascii_case("true") {
        return Ok(ArgValue::Bool(true));
    }
    if text.eq_ignore_ascii_case("false") {
        return Ok(ArgValue::Bool(false));
    }
    if let Ok(int) = text.parse::<i64>() {
        return Ok(ArgValue::Int(int));
    }
    if let Ok(float) = text.parse::<f64>() {
        return Ok(ArgValue::Float(float));
    }
    Err(invocation(format!(
        "argument value '{}' is not a literal (strings must be quoted)",
        text
    )))
}

/// Parse a quoted string literal with backslash escapes.
fn parse_string_literal(text: &str) -> Result<ArgValue> {
    let chars: Vec<char> = text.chars().collect();
    let quote = chars[0];
    let mut value = String::new();
    let mut i = 1;

    while i < chars.len() {
        match chars[i] {
            '\\' if i + 1 < chars.len() => {
                value.push(match chars[i + 1] {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    other => other,
                });
                i += 2;
            }
            c if c == quote => {
                if i == chars.len() - 1 {
                    return Ok(ArgValue::Str(value));
                }
                return Err(invocation("trailing characters after string literal"));
            }
            c => {
                value.push(c);
                i += 1;
            }
        }
    }
    Err(invocation("unterminated string literal"))
}

/// Bind parsed arguments to the declared parameter names.
///
/// Positionals bind in declaration order and must precede every keyword;
/// each declared parameter ends up bound exactly once.
fn bind_args(params: &[String], args: Vec<CallArg>) -> Result<InvocationArguments> {
    let mut bound = InvocationArguments::new();
    let mut positional = 0usize;
    let mut seen_keyword = false;

    for arg in args {
        match arg.keyword {
            Some(keyword) => {
                seen_keyword = true;
                if !params.iter().any(|p| *p == keyword) {
                    return Err(invocation(format!(
                        "unexpected keyword argument '{}'",
                        keyword
                    )));
                }
                if bound.insert(keyword.clone(), arg.value).is_some() {
                    return Err(invocation(format!("duplicate argument '{}'", keyword)));
                }
            }
            None => {
                if seen_keyword {
                    return Err(invocation("positional argument after keyword argument"));
                }
                let name = match params.get(positional) {
                    Some(name) => name,
                    None => {
                        return Err(invocation(format!(
                            "too many positional arguments (expected {})",
                            params.len()
                        )))
                    }
                };
                bound.insert(name.clone(), arg.value);
                positional += 1;
            }
        }
    }

    for param in params {
        if !bound.contains_key(param) {
            return Err(invocation(format!("missing argument '{}'", param)));
        }
    }

    Ok(bound)
}
