//! Invocation synthesis: typed arguments from a descriptor, and textual
//! narrowing of a model-proposed call expression.
//!
//! Two independent jobs live here. [`synthesize`] walks a parsed
//! [`FunctionDescriptor`] and converts each valued parameter through the
//! type table, producing keyword arguments ready to bind. Type errors
//! surface here, at synthesis time, never during descriptor parsing: a
//! descriptor declaring a `date` parameter parses fine and only fails once
//! someone asks for its arguments.
//!
//! [`narrow_call_expression`] does the opposite end of the trip: given the
//! model's free-text answer, it finds the first substring shaped like a
//! call, `Name(...)` with balanced parentheses, and returns exactly that.
//! The argument text is located, never interpreted.

use std::collections::HashMap;

use crate::convert::{convert_type, ArgValue};
use crate::descriptor::FunctionDescriptor;
use crate::error::{HarvestError, Result};

/// Keyword arguments ready to bind to a callable.
pub type InvocationArguments = HashMap<String, ArgValue>;

/// Convert a descriptor's parameters into typed keyword arguments.
///
/// Parameters without a raw value are omitted, silently; the result simply
/// has no entry for them. A parameter that does carry a value must also
/// carry its `name` and `type` attributes
/// ([`HarvestError::MalformedPayload`] otherwise), and the value must
/// convert per [`convert_type`]. When the same name appears twice, the last
/// occurrence wins.
///
/// # Examples
///
/// ```
/// use llm_harvest::descriptor::parse_function_descriptor;
/// use llm_harvest::convert::ArgValue;
/// use llm_harvest::synth::synthesize;
///
/// let payload = r#"<Function name="CalculateSum">
///   <Input>
///     <Parameter name="a" type="int">5</Parameter>
///     <Parameter name="b" type="int">3</Parameter>
///   </Input>
/// </Function>"#;
///
/// let descriptor = parse_function_descriptor(payload).unwrap();
/// let args = synthesize(&descriptor).unwrap();
/// assert_eq!(args["a"], ArgValue::Int(5));
/// assert_eq!(args["b"], ArgValue::Int(3));
/// ```
pub fn synthesize(descriptor: &FunctionDescriptor) -> Result<InvocationArguments> {
    let mut args = InvocationArguments::new();

    for param in &descriptor.parameters {
        let raw = match param.raw_value.as_deref() {
            Some(raw) => raw,
            None => continue,
        };
        let name = match param.name.as_deref() {
            Some(name) => name,
            None => {
                return Err(HarvestError::MalformedPayload {
                    reason: "valued parameter is missing its name attribute".into(),
                })
            }
        };
        let declared = match param.type_name.as_deref() {
            Some(declared) => declared,
            None => {
                return Err(HarvestError::MalformedPayload {
                    reason: format!("parameter '{}' is missing its type attribute", name),
                })
            }
        };
        args.insert(name.to_string(), convert_type(raw, declared)?);
    }

    Ok(args)
}

/// Narrow free text to its first call-shaped substring.
///
/// Scans for an identifier immediately followed by a balanced parenthesized
/// group and returns that substring; the prose, markdown, and anything after
/// the close paren are dropped. Parentheses inside quoted strings do not
/// count toward balance, and the group may span lines. Returns `None` when
/// no such substring exists.
///
/// # Examples
///
/// ```
/// use llm_harvest::synth::narrow_call_expression;
///
/// let text = "Sure! Here you go: `CalculateSum(a=5, b=3)` and good luck!";
/// assert_eq!(narrow_call_expression(text), Some("CalculateSum(a=5, b=3)"));
/// assert_eq!(narrow_call_expression("no call here"), None);
/// ```
pub fn narrow_call_expression(text: &str) -> Option<&str> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut k = 0;

    while k < chars.len() {
        if is_ident_start(chars[k].1) {
            let mut j = k;
            while j < chars.len() && is_ident_char(chars[j].1) {
                j += 1;
            }
            if j < chars.len() && chars[j].1 == '(' {
                if let Some(end) = balanced_group_end(&chars, j) {
                    let start_byte = chars[k].0;
                    // `)` is a single byte.
                    let end_byte = chars[end].0 + 1;
                    return Some(&text[start_byte..end_byte]);
                }
            }
            k = j;
        } else {
            k += 1;
        }
    }
    None
}

/// The candidate function name of a call expression: everything before the
/// first `(`, trimmed.
pub fn call_name(call: &str) -> &str {
    match call.find('(') {
        Some(pos) => call[..pos].trim(),
        None => call.trim(),
    }
}

/// Index of the `)` balancing the `(` at `open_at`, honoring quoted strings
/// and backslash escapes. `None` when the group never closes.
fn balanced_group_end(chars: &[(usize, char)], open_at: usize) -> Option<usize> {
    let mut depth = 0i32;
    let mut in_string: Option<char> = None;
    let mut escape_next = false;

    for (k, &(_, c)) in chars.iter().enumerate().skip(open_at) {
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
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(k);
                }
            }
            _ => {}
        }
    }
    None
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
