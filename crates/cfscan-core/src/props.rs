//! # Property Accessors
//!
//! CloudFormation properties are arbitrarily nested JSON/YAML with no fixed
//! schema. Rules read them through [`PropertyValue`], whose accessors return
//! `None` rather than failing, so a missing control can be reported as the
//! insecure default it is.
//!
//! Scalar accessors accept the string spellings CloudFormation itself
//! accepts (`"true"`, `"7"`). Intrinsic expressions (`{"Ref": ...}`,
//! `{"Fn::If": ...}`) are never coerced: they read as `None` from every
//! scalar accessor and callers decide how to treat them with
//! [`is_intrinsic`].

use serde_json::Value;

/// Whether `value` is an unresolved intrinsic expression: a mapping with a
/// single key that is `Ref` or starts with `Fn::`.
pub fn is_intrinsic(value: &Value) -> bool {
    match value {
        Value::Object(map) if map.len() == 1 => map
            .keys()
            .next()
            .is_some_and(|k| k == "Ref" || k.starts_with("Fn::")),
        _ => false,
    }
}

/// Absent-tolerant accessors over a property tree.
pub trait PropertyValue {
    /// Child of a mapping, `None` when absent, null, or not a mapping.
    fn prop(&self, key: &str) -> Option<&Value>;

    /// Nested child following `path`. An empty path returns `self`.
    fn path(&self, path: &[&str]) -> Option<&Value>;

    /// A literal string.
    fn as_text(&self) -> Option<&str>;

    /// A boolean, or the strings `true`/`false` in any case.
    fn as_flag(&self) -> Option<bool>;

    /// An integer, an integral float, or a string holding one.
    fn as_integer(&self) -> Option<i64>;

    /// Flattens the "scalar or list of scalars" convention: a sequence
    /// yields its elements, null yields nothing, anything else yields itself.
    fn items(&self) -> Vec<&Value>;

    /// Whether this value is the literal string `needle` or a sequence
    /// containing it.
    fn contains_text(&self, needle: &str) -> bool;

    /// Short name of the value's shape, for messages.
    fn shape_name(&self) -> &'static str;
}

impl PropertyValue for Value {
    fn prop(&self, key: &str) -> Option<&Value> {
        self.as_object()?.get(key).filter(|v| !v.is_null())
    }

    fn path(&self, path: &[&str]) -> Option<&Value> {
        let mut current = self;
        for key in path {
            current = current.prop(key)?;
        }
        Some(current)
    }

    fn as_text(&self) -> Option<&str> {
        self.as_str()
    }

    fn as_flag(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Some(true),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Some(false),
            _ => None,
        }
    }

    fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| f as i64)
            }),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn items(&self) -> Vec<&Value> {
        match self {
            Value::Array(items) => items.iter().collect(),
            Value::Null => Vec::new(),
            other => vec![other],
        }
    }

    fn contains_text(&self, needle: &str) -> bool {
        self.items().into_iter().any(|v| v.as_str() == Some(needle))
    }

    fn shape_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "sequence",
            Value::Object(_) => "mapping",
        }
    }
}
