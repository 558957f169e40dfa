//! Function descriptor parsing.
//!
//! A function descriptor is a markup payload whose root names a callable
//! and lists its typed parameters under an `Input` section:
//!
//! ```text
//! <Function name="CalculateSum">
//!   <Input>
//!     <Parameter name="a" type="int">5</Parameter>
//!     <Parameter name="b" type="int">3</Parameter>
//!   </Input>
//! </Function>
//! ```
//!
//! Parsing is deliberately forgiving about parameters: a `Parameter` missing
//! its `name` or `type` attribute still parses, with the field left `None`.
//! Validation happens later, in [`synthesize`](crate::synth::synthesize),
//! and only for parameters that actually carry a value.

use crate::error::{HarvestError, Result};
use crate::markup;

/// One declared parameter of a function descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// The `name` attribute, if present.
    pub name: Option<String>,
    /// The `type` attribute, if present. Named `type_name` because `type`
    /// is reserved.
    pub type_name: Option<String>,
    /// The parameter's inline text, `None` when absent or empty.
    pub raw_value: Option<String>,
}

/// A parsed function descriptor: the callable's name plus its parameters in
/// document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDescriptor {
    pub name: String,
    pub parameters: Vec<Parameter>,
}

/// Parse a function descriptor payload.
///
/// The root element must carry a `name` attribute; a nameless root is
/// [`HarvestError::MalformedPayload`], as is unparsable markup. Parameters
/// are collected from every `Parameter` element under every direct `Input`
/// child, in document order; `Parameter` elements elsewhere in the document
/// are ignored. Matching is case-sensitive.
///
/// # Examples
///
/// ```
/// use llm_harvest::descriptor::parse_function_descriptor;
///
/// let payload = r#"
/// <Function name="CalculateSum">
///   <Input>
///     <Parameter name="a" type="int">5</Parameter>
///     <Parameter name="b" type="int">3</Parameter>
///   </Input>
/// </Function>"#;
///
/// let descriptor = parse_function_descriptor(payload).unwrap();
/// assert_eq!(descriptor.name, "CalculateSum");
/// assert_eq!(descriptor.parameters.len(), 2);
/// assert_eq!(descriptor.parameters[0].raw_value.as_deref(), Some("5"));
/// ```
pub fn parse_function_descriptor(payload: &str) -> Result<FunctionDescriptor> {
    let root = markup::parse(payload)?;

    let name = root
        .attr("name")
        .ok_or_else(|| HarvestError::MalformedPayload {
            reason: format!("descriptor root <{}> has no name attribute", root.name),
        })?
        .to_string();

    let mut parameters = Vec::new();
    for input in root.children_named("Input") {
        for param in input.children_named("Parameter") {
            parameters.push(Parameter {
                name: param.attr("name").map(str::to_string),
                type_name: param.attr("type").map(str::to_string),
                raw_value: param.text().map(str::to_string),
            });
        }
    }

    Ok(FunctionDescriptor { name, parameters })
}
