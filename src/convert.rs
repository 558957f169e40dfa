//! Typed argument values and the declared-type conversion table.

use serde_json::Value;

use crate::error::{HarvestError, Result};

/// A strongly typed argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
}

impl ArgValue {
    /// The integer payload, if this is an `Int`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ArgValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// The float payload. `Int` values widen, so a callable declared over
    /// floats accepts integer arguments the way a dynamic call would.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            ArgValue::Float(f) => Some(*f),
            ArgValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// The string payload, if this is a `Str`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArgValue::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// The boolean payload, if this is a `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ArgValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Convert to a `serde_json::Value` for serialization or reporting.
    pub fn to_value(&self) -> Value {
        match self {
            ArgValue::Int(i) => Value::from(*i),
            ArgValue::Float(f) => Value::from(*f),
            ArgValue::Str(s) => Value::from(s.clone()),
            ArgValue::Bool(b) => Value::from(*b),
        }
    }
}

impl std::fmt::Display for ArgValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArgValue::Int(i) => write!(f, "{}", i),
            ArgValue::Float(v) => write!(f, "{}", v),
            ArgValue::Str(s) => write!(f, "{}", s),
            ArgValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// Convert a raw string to its declared type.
///
/// The conversion table is closed:
///
/// | declared | conversion |
/// |----------|------------|
/// | `int`    | `i64` parse, surrounding whitespace tolerated |
/// | `float`  | `f64` parse, surrounding whitespace tolerated |
/// | `str`    | identity |
/// | `bool`   | case-insensitive equality with `"true"`; everything else is `false` |
///
/// Any other declared name fails with [`HarvestError::UnsupportedType`],
/// including names that merely look plausible (`date`, `list`, `Integer`).
/// A numeric raw value that does not parse fails with
/// [`HarvestError::ValueConversion`]. The bool rule never fails: `"yes"`,
/// `"1"`, and `"banana"` all convert to `false`.
///
/// # Examples
///
/// ```
/// use llm_harvest::convert::{convert_type, ArgValue};
///
/// assert_eq!(convert_type("5", "int").unwrap(), ArgValue::Int(5));
/// assert_eq!(convert_type("TRUE", "bool").unwrap(), ArgValue::Bool(true));
/// assert_eq!(convert_type("no", "bool").unwrap(), ArgValue::Bool(false));
/// assert!(convert_type("2024-01-01", "date").is_err());
/// ```
pub fn convert_type(raw: &str, declared: &str) -> Result<ArgValue> {
    match declared {
        "int" => raw
            .trim()
            .parse::<i64>()
            .map(ArgValue::Int)
            .map_err(|_| HarvestError::ValueConversion {
                declared: "int",
                raw: raw.to_string(),
            }),
        "float" => raw
            .trim()
            .parse::<f64>()
            .map(ArgValue::Float)
            .map_err(|_| HarvestError::ValueConversion {
                declared: "float",
                raw: raw.to_string(),
            }),
        "str" => Ok(ArgValue::Str(raw.to_string())),
        "bool" => Ok(ArgValue::Bool(raw.eq_ignore_ascii_case("true"))),
        other => Err(HarvestError::UnsupportedType {
            declared: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_conversion() {
        assert_eq!(convert_type("42", "int").unwrap(), ArgValue::Int(42));
        assert_eq!(convert_type("-7", "int").unwrap(), ArgValue::Int(-7));
        assert_eq!(convert_type(" 13 ", "int").unwrap(), ArgValue::Int(13));
    }

    #[test]
    fn test_int_rejects_garbage() {
        let err = convert_type("5x", "int").unwrap_err();
        assert!(matches!(
            err,
            HarvestError::ValueConversion { declared: "int", ref raw } if raw == "5x"
        ));
        assert!(convert_type("3.5", "int").is_err());
        assert!(convert_type("", "int").is_err());
    }

    #[test]
    fn test_float_conversion() {
        assert_eq!(convert_type("2.5", "float").unwrap(), ArgValue::Float(2.5));
        assert_eq!(convert_type("3", "float").unwrap(), ArgValue::Float(3.0));
        assert_eq!(convert_type("1e3", "float").unwrap(), ArgValue::Float(1000.0));
    }

    #[test]
    fn test_float_rejects_garbage() {
        assert!(matches!(
            convert_type("fast", "float").unwrap_err(),
            HarvestError::ValueConversion { declared: "float", .. }
        ));
    }

    #[test]
    fn test_str_is_identity() {
        assert_eq!(
            convert_type("  keep my spaces  ", "str").unwrap(),
            ArgValue::Str("  keep my spaces  ".to_string())
        );
    }

    #[test]
    fn test_bool_case_insensitive_true() {
        for raw in ["true", "True", "TRUE", "tRuE"] {
            assert_eq!(convert_type(raw, "bool").unwrap(), ArgValue::Bool(true));
        }
    }

    #[test]
    fn test_bool_everything_else_false() {
        for raw in ["false", "no", "yes", "1", "0", "", " true"] {
            assert_eq!(
                convert_type(raw, "bool").unwrap(),
                ArgValue::Bool(false),
                "{:?} should convert to false",
                raw
            );
        }
    }

    #[test]
    fn test_unsupported_type_names() {
        for declared in ["date", "list", "Integer", "INT", "string"] {
            assert!(matches!(
                convert_type("x", declared).unwrap_err(),
                HarvestError::UnsupportedType { .. }
            ));
        }
    }

    #[test]
    fn test_accessors() {
        assert_eq!(ArgValue::Int(5).as_int(), Some(5));
        assert_eq!(ArgValue::Int(5).as_float(), Some(5.0));
        assert_eq!(ArgValue::Float(2.5).as_float(), Some(2.5));
        assert_eq!(ArgValue::Float(2.5).as_int(), None);
        assert_eq!(ArgValue::Str("x".into()).as_str(), Some("x"));
        assert_eq!(ArgValue::Bool(true).as_bool(), Some(true));
        assert_eq!(ArgValue::Bool(true).as_int(), None);
    }

    #[test]
    fn test_display_and_json() {
        assert_eq!(ArgValue::Int(8).to_string(), "8");
        assert_eq!(ArgValue::Bool(false).to_string(), "false");
        assert_eq!(ArgValue::Str("hi".into()).to_value(), serde_json::json!("hi"));
        assert_eq!(ArgValue::Float(0.5).to_value(), serde_json::json!(0.5));
    }
}
