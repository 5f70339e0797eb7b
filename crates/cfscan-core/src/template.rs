//! # Resource Model
//!
//! A [`Template`] is the parsed, immutable form of one Infrastructure-as-Code
//! document: its identifier, the format it was read from, and its resources
//! in document order. A [`Resource`] is one named, typed unit of
//! infrastructure with a free-form property tree.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::props::PropertyValue;

/// Opaque identifier of a template under validation (e.g. its object key).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateId(String);

impl TemplateId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TemplateId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TemplateId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Encoding of a template document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateFormat {
    Json,
    Yaml,
}

impl TemplateFormat {
    /// Guess the format from content: a document whose first non-whitespace
    /// byte is `{` is JSON, anything else is treated as YAML.
    pub fn sniff(bytes: &[u8]) -> Self {
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
        match bytes.iter().find(|b| !b.is_ascii_whitespace()) {
            Some(b'{') => Self::Json,
            _ => Self::Yaml,
        }
    }

    /// Format implied by a file extension, if it implies one.
    ///
    /// `.template` files may hold either encoding, so they return `None`
    /// and are sniffed.
    pub fn from_extension(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Some(Self::Json),
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                Some(Self::Yaml)
            }
            _ => None,
        }
    }
}

impl fmt::Display for TemplateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "JSON"),
            Self::Yaml => write!(f, "YAML"),
        }
    }
}

/// One named, typed unit of infrastructure declared in a template.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    name: String,
    resource_type: String,
    properties: Map<String, Value>,
}

impl Resource {
    pub fn new(
        name: impl Into<String>,
        resource_type: impl Into<String>,
        properties: Map<String, Value>,
    ) -> Self {
        Self {
            name: name.into(),
            resource_type: resource_type.into(),
            properties,
        }
    }

    /// Logical resource name, unique within its template.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type tag, e.g. `AWS::IAM::Role`.
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn properties(&self) -> &Map<String, Value> {
        &self.properties
    }

    /// A top-level property, or `None` when absent or null.
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key).filter(|v| !v.is_null())
    }

    /// A nested property, or `None` when any step is absent or null.
    pub fn property_path(&self, path: &[&str]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        self.property(first)?.path(rest)
    }
}

/// The parsed form of one template document. Immutable after parse.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    id: TemplateId,
    format: TemplateFormat,
    format_version: Option<String>,
    description: Option<String>,
    resources: Vec<Resource>,
}

impl Template {
    pub fn new(
        id: TemplateId,
        format: TemplateFormat,
        format_version: Option<String>,
        description: Option<String>,
        resources: Vec<Resource>,
    ) -> Self {
        Self {
            id,
            format,
            format_version,
            description,
            resources,
        }
    }

    pub fn id(&self) -> &TemplateId {
        &self.id
    }

    pub fn format(&self) -> TemplateFormat {
        self.format
    }

    /// `AWSTemplateFormatVersion`, when declared.
    pub fn format_version(&self) -> Option<&str> {
        self.format_version.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Resources in document order.
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }
}
