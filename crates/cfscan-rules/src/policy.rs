//! Read-only view over IAM-style policy documents, shared by the identity
//! and bucket-policy rules.

use std::borrow::Cow;

use cfscan_core::{is_intrinsic, PropertyValue};
use serde_json::Value;

/// A policy document as written in the template.
///
/// CloudFormation accepts the document inline as a mapping or as a JSON
/// string; the string form is decoded here. An intrinsic document (for
/// example `Fn::Sub` over a JSON body) is unevaluable and yields `None`.
pub(crate) fn document(value: &Value) -> Result<Option<Cow<'_, Value>>, String> {
    match value {
        Value::Object(_) if is_intrinsic(value) => Ok(None),
        Value::Object(_) => Ok(Some(Cow::Borrowed(value))),
        Value::String(text) => serde_json::from_str::<Value>(text)
            .map(|parsed| Some(Cow::Owned(parsed)))
            .map_err(|e| format!("PolicyDocument string is not valid JSON: {e}")),
        other => Err(format!(
            "PolicyDocument must be a mapping, found {}",
            other.shape_name()
        )),
    }
}

/// One entry of a document's `Statement` list.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Statement<'a> {
    index: usize,
    body: &'a Value,
}

impl<'a> Statement<'a> {
    /// `Sid` when present, otherwise the statement's position.
    pub(crate) fn label(&self) -> String {
        match self.body.prop("Sid").and_then(PropertyValue::as_text) {
            Some(sid) => format!("statement '{sid}'"),
            None => format!("statement #{}", self.index),
        }
    }

    /// Only an explicit `Allow` grants anything.
    pub(crate) fn is_allow(&self) -> bool {
        self.body.prop("Effect").and_then(PropertyValue::as_text) == Some("Allow")
    }

    pub(crate) fn action(&self) -> Option<&'a Value> {
        self.body.prop("Action")
    }

    pub(crate) fn resource(&self) -> Option<&'a Value> {
        self.body.prop("Resource")
    }

    pub(crate) fn principal(&self) -> Option<&'a Value> {
        self.body.prop("Principal")
    }

    pub(crate) fn has_condition(&self) -> bool {
        self.body
            .prop("Condition")
            .is_some_and(|c| c.as_object().map_or(true, |m| !m.is_empty()))
    }
}

/// Statements of `document`. `Statement` may be a single mapping or a list.
pub(crate) fn statements(document: &Value) -> Result<Vec<Statement<'_>>, String> {
    let Some(raw) = document.prop("Statement") else {
        return Ok(Vec::new());
    };
    if is_intrinsic(raw) {
        return Ok(Vec::new());
    }
    raw.items()
        .into_iter()
        .enumerate()
        .filter(|(_, body)| !is_intrinsic(body))
        .map(|(index, body)| {
            if body.is_object() {
                Ok(Statement { index, body })
            } else {
                Err(format!(
                    "Statement #{index} must be a mapping, found {}",
                    body.shape_name()
                ))
            }
        })
        .collect()
}
