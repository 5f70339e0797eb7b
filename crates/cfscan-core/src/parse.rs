//! # Document Parser
//!
//! Turns raw template bytes into a [`Template`]. Pure: no I/O, no global
//! state.
//!
//! ## Accepted Input
//!
//! - JSON, parsed with `serde_json` (insertion order preserved).
//! - YAML, parsed with `serde_yaml` and converted into the same JSON value
//!   tree. YAML is a superset of JSON, so either encoding ends up in one
//!   representation the rules can read.
//!
//! ## Rejected Input
//!
//! - Any YAML tag. CloudFormation short-hand intrinsics (`!Ref`, `!Sub`,
//!   `!GetAtt`) cannot be mapped onto the `Ref`/`Fn::*` convention without
//!   evaluating them, and dropping the tag would silently change the data.
//!   They fail with [`ParseError::UnsupportedTag`].
//! - A document whose root is not a mapping, or whose `Resources` is not a
//!   mapping.
//! - A resource without a string `Type`, or with non-mapping `Properties`.
//! - A mapping that repeats a key, in either encoding. A repeated resource
//!   name would otherwise hide the earlier resource.
//!
//! A document without `Resources` is a valid, empty template.

use std::fmt;

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde_json::{Map, Value};

use crate::error::{ParseError, UnsupportedShapeError};
use crate::props::PropertyValue;
use crate::template::{Resource, Template, TemplateFormat, TemplateId};

/// Parse template text into a [`Template`].
///
/// `format_hint` is the declared format; when `None` the format is sniffed
/// from the content (see [`TemplateFormat::sniff`]).
///
/// # Errors
///
/// Returns [`ParseError`] when the text is malformed, carries YAML tags, or
/// is not shaped like a template.
pub fn parse_template(
    bytes: &[u8],
    template_id: impl Into<TemplateId>,
    format_hint: Option<TemplateFormat>,
) -> Result<Template, ParseError> {
    let id = template_id.into();
    let format = format_hint.unwrap_or_else(|| TemplateFormat::sniff(bytes));

    let root = match format {
        TemplateFormat::Json => serde_json::from_slice::<UniqueKeys>(bytes)
            .map(|UniqueKeys(value)| value)
            .map_err(|e| ParseError::Malformed {
                format,
                reason: e.to_string(),
            })?,
        TemplateFormat::Yaml => {
            let yaml: serde_yaml::Value =
                serde_yaml::from_slice(bytes).map_err(|e| ParseError::Malformed {
                    format,
                    reason: e.to_string(),
                })?;
            let mut path = Vec::new();
            yaml_to_json_value(&yaml, &mut path)?
        }
    };

    let root = match root {
        Value::Object(map) => map,
        other => {
            return Err(UnsupportedShapeError {
                location: "(root)".into(),
                expected: "mapping".into(),
                found: other.shape_name().into(),
            }
            .into())
        }
    };

    let resources = match root.get("Resources") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Object(entries)) => entries
            .iter()
            .map(|(name, body)| build_resource(name, body))
            .collect::<Result<Vec<_>, _>>()?,
        Some(other) => {
            return Err(UnsupportedShapeError {
                location: "Resources".into(),
                expected: "mapping".into(),
                found: other.shape_name().into(),
            }
            .into())
        }
    };

    let format_version = root
        .get("AWSTemplateFormatVersion")
        .and_then(scalar_to_string);
    let description = root
        .get("Description")
        .and_then(|v| v.as_str())
        .map(str::to_string);

    tracing::debug!(
        template_id = %id,
        %format,
        resources = resources.len(),
        "parsed template"
    );

    Ok(Template::new(id, format, format_version, description, resources))
}

/// Build one [`Resource`] from its entry under `Resources`.
fn build_resource(name: &str, body: &Value) -> Result<Resource, ParseError> {
    let body = body.as_object().ok_or_else(|| ParseError::InvalidResource {
        name: name.to_string(),
        reason: format!("resource body must be a mapping, found {}", body.shape_name()),
    })?;

    let resource_type = body
        .get("Type")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ParseError::InvalidResource {
            name: name.to_string(),
            reason: "missing string 'Type'".into(),
        })?;

    let properties = match body.get("Properties") {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map.clone(),
        Some(other) => {
            return Err(ParseError::InvalidResource {
                name: name.to_string(),
                reason: format!("'Properties' must be a mapping, found {}", other.shape_name()),
            })
        }
    };

    Ok(Resource::new(name, resource_type, properties))
}

/// `AWSTemplateFormatVersion` is usually quoted but YAML authors sometimes
/// leave a date-like scalar bare.
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A JSON value whose mappings never repeat a key.
///
/// `serde_json::Value` keeps the last of two equal keys; this rejects the
/// document instead, matching what `serde_yaml` does for YAML.
struct UniqueKeys(Value);

impl<'de> Deserialize<'de> for UniqueKeys {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(UniqueKeysVisitor).map(UniqueKeys)
    }
}

struct UniqueKeysVisitor;

impl<'de> Visitor<'de> for UniqueKeysVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any JSON value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        serde_json::Number::from_f64(v)
            .map(Value::Number)
            .ok_or_else(|| E::custom(format!("cannot represent float {v}")))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        deserializer.deserialize_any(self)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(UniqueKeys(item)) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Value, A::Error> {
        let mut map = Map::new();
        while let Some(key) = access.next_key::<String>()? {
            if map.contains_key(&key) {
                return Err(de::Error::custom(format!("duplicate key {key:?}")));
            }
            let UniqueKeys(value) = access.next_value()?;
            map.insert(key, value);
        }
        Ok(Value::Object(map))
    }
}

fn display_path(path: &[String]) -> String {
    if path.is_empty() {
        "(root)".to_string()
    } else {
        path.join(".")
    }
}

/// Convert a `serde_yaml::Value` to a `serde_json::Value`.
///
/// Templates only use the JSON-compatible subset of YAML. Tags are the one
/// YAML feature with no JSON counterpart and are rejected with the path of
/// the tagged node.
fn yaml_to_json_value(
    yaml: &serde_yaml::Value,
    path: &mut Vec<String>,
) -> Result<Value, ParseError> {
    match yaml {
        serde_yaml::Value::Null => Ok(Value::Null),
        serde_yaml::Value::Bool(b) => Ok(Value::Bool(*b)),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Number(serde_json::Number::from(i)))
            } else if let Some(u) = n.as_u64() {
                Ok(Value::Number(serde_json::Number::from(u)))
            } else if let Some(f) = n.as_f64() {
                serde_json::Number::from_f64(f)
                    .map(Value::Number)
                    .ok_or_else(|| ParseError::Malformed {
                        format: TemplateFormat::Yaml,
                        reason: format!("cannot represent float {f} at {}", display_path(path)),
                    })
            } else {
                Err(ParseError::Malformed {
                    format: TemplateFormat::Yaml,
                    reason: format!("unsupported number {n:?} at {}", display_path(path)),
                })
            }
        }
        serde_yaml::Value::String(s) => Ok(Value::String(s.clone())),
        serde_yaml::Value::Sequence(seq) => {
            let mut items = Vec::with_capacity(seq.len());
            for (i, item) in seq.iter().enumerate() {
                path.push(i.to_string());
                items.push(yaml_to_json_value(item, path)?);
                path.pop();
            }
            Ok(Value::Array(items))
        }
        serde_yaml::Value::Mapping(map) => {
            let mut json_map = Map::new();
            for (k, v) in map {
                let key = match k {
                    serde_yaml::Value::String(s) => s.clone(),
                    serde_yaml::Value::Number(n) => n.to_string(),
                    serde_yaml::Value::Bool(b) => b.to_string(),
                    other => {
                        return Err(ParseError::Malformed {
                            format: TemplateFormat::Yaml,
                            reason: format!(
                                "unsupported mapping key {other:?} at {}",
                                display_path(path)
                            ),
                        })
                    }
                };
                path.push(key.clone());
                let value = yaml_to_json_value(v, path)?;
                path.pop();
                json_map.insert(key, value);
            }
            Ok(Value::Object(json_map))
        }
        serde_yaml::Value::Tagged(tagged) => Err(ParseError::UnsupportedTag {
            tag: tagged.tag.to_string(),
            path: display_path(path),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML_TEMPLATE: &str = r#"
AWSTemplateFormatVersion: "2010-09-09"
Description: Logging bucket and its role
Resources:
  LogsBucket:
    Type: AWS::S3::Bucket
    Properties:
      BucketName:
        Fn::Sub: "${AWS::StackName}-logs"
      VersioningConfiguration:
        Status: Enabled
  AppRole:
    Type: AWS::IAM::Role
    Properties:
      Policies:
        - PolicyName: app
          PolicyDocument:
            Statement:
              - Effect: Allow
                Action: "*"
                Resource: "*"
  Queue:
    Type: AWS::SQS::Queue
"#;

    #[test]
    fn parses_yaml_in_document_order() {
        let t = parse_template(YAML_TEMPLATE.as_bytes(), "app.yaml", None).unwrap();
        assert_eq!(t.format(), TemplateFormat::Yaml);
        assert_eq!(t.format_version(), Some("2010-09-09"));
        assert_eq!(t.description(), Some("Logging bucket and its role"));
        let names: Vec<&str> = t.resources().iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["LogsBucket", "AppRole", "Queue"]);
        assert_eq!(t.resources()[1].resource_type(), "AWS::IAM::Role");
        assert!(t.resources()[2].properties().is_empty());
    }

    #[test]
    fn long_form_intrinsics_survive_as_mappings() {
        let t = parse_template(YAML_TEMPLATE.as_bytes(), "app.yaml", None).unwrap();
        let name = t.resources()[0].property("BucketName").unwrap();
        assert!(crate::props::is_intrinsic(name));
    }

    #[test]
    fn parses_json_in_document_order() {
        let json = r#"{
            "Resources": {
                "Zeta": {"Type": "AWS::S3::Bucket"},
                "Alpha": {"Type": "AWS::Lambda::Function", "Properties": {"Runtime": "python3.12"}}
            }
        }"#;
        let t = parse_template(json.as_bytes(), "stack.json", None).unwrap();
        assert_eq!(t.format(), TemplateFormat::Json);
        let names: Vec<&str> = t.resources().iter().map(|r| r.name()).collect();
        assert_eq!(names, vec!["Zeta", "Alpha"]);
    }

    #[test]
    fn json_text_parses_as_yaml_too() {
        let json = r#"{"Resources": {"B": {"Type": "AWS::S3::Bucket"}}}"#;
        let t = parse_template(json.as_bytes(), "x", Some(TemplateFormat::Yaml)).unwrap();
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn missing_resources_is_empty_template() {
        let t = parse_template(b"Description: nothing here\n", "empty", None).unwrap();
        assert!(t.is_empty());
        let t = parse_template(b"{}", "empty.json", None).unwrap();
        assert!(t.is_empty());
        let t = parse_template(b"Resources:\n", "null-resources", None).unwrap();
        assert!(t.is_empty());
    }

    #[test]
    fn malformed_json_fails() {
        let err = parse_template(b"{\"Resources\": ", "bad.json", None).unwrap_err();
        assert!(matches!(
            err,
            ParseError::Malformed { format: TemplateFormat::Json, .. }
        ));
    }

    #[test]
    fn malformed_yaml_fails() {
        let err = parse_template(b"Resources: [unclosed\n", "bad.yaml", None).unwrap_err();
        assert!(matches!(
            err,
            ParseError::Malformed { format: TemplateFormat::Yaml, .. }
        ));
    }

    #[test]
    fn short_hand_tag_fails_loudly() {
        let yaml = "Resources:
  Bucket:
    Type: AWS::S3::Bucket
    Properties:
      BucketName: !Ref NameParam
";
        let err = parse_template(yaml.as_bytes(), "tags.yaml", None).unwrap_err();
        match err {
            ParseError::UnsupportedTag { tag, path } => {
                assert_eq!(tag, "!Ref");
                assert_eq!(path, "Resources.Bucket.Properties.BucketName");
            }
            other => panic!("expected UnsupportedTag, got {other:?}"),
        }
    }

    #[test]
    fn non_mapping_root_is_unsupported_shape() {
        let err = parse_template(b"- a\n- b\n", "list.yaml", None).unwrap_err();
        match err {
            ParseError::UnsupportedShape(shape) => {
                assert_eq!(shape.location, "(root)");
                assert_eq!(shape.found, "sequence");
            }
            other => panic!("expected UnsupportedShape, got {other:?}"),
        }
        let err = parse_template(b"~\n", "null.yaml", None).unwrap_err();
        assert!(matches!(err, ParseError::UnsupportedShape(ref s) if s.found == "null"));
        assert!(parse_template(b"", "empty.yaml", None).is_err());
    }

    #[test]
    fn non_mapping_resources_is_unsupported_shape() {
        let err = parse_template(b"Resources: [a, b]\n", "x.yaml", None).unwrap_err();
        match err {
            ParseError::UnsupportedShape(shape) => assert_eq!(shape.location, "Resources"),
            other => panic!("expected UnsupportedShape, got {other:?}"),
        }
    }

    #[test]
    fn resource_without_type_is_invalid() {
        let err = parse_template(
            b"Resources:\n  Orphan:\n    Properties: {}\n",
            "x.yaml",
            None,
        )
        .unwrap_err();
        assert_eq!(
            err,
            ParseError::InvalidResource {
                name: "Orphan".into(),
                reason: "missing string 'Type'".into(),
            }
        );
    }

    #[test]
    fn non_mapping_properties_is_invalid() {
        let err = parse_template(
            b"Resources:\n  B:\n    Type: AWS::S3::Bucket\n    Properties: [1]\n",
            "x.yaml",
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ParseError::InvalidResource { ref name, .. } if name == "B"));
    }

    #[test]
    fn repeated_resource_name_fails_in_both_formats() {
        let doc = br#"{"Resources": {
            "Data": {"Type": "AWS::S3::Bucket", "Properties": {"AccessControl": "PublicReadWrite"}},
            "Data": {"Type": "AWS::SQS::Queue"}
        }}"#;
        for format in [TemplateFormat::Json, TemplateFormat::Yaml] {
            let err = parse_template(doc, "dup", Some(format)).unwrap_err();
            match err {
                ParseError::Malformed { format: f, reason } => {
                    assert_eq!(f, format);
                    assert!(reason.contains("Data"), "{reason}");
                }
                other => panic!("expected Malformed, got {other:?}"),
            }
        }
    }

    #[test]
    fn repeated_property_key_fails_in_json() {
        let doc = br#"{"Resources": {"B": {"Type": "AWS::S3::Bucket", "Properties": {
            "VersioningConfiguration": {"Status": "Enabled", "Status": "Suspended"}
        }}}}"#;
        let err = parse_template(doc, "dup.json", None).unwrap_err();
        assert!(matches!(err, ParseError::Malformed { format: TemplateFormat::Json, .. }));
    }

    #[test]
    fn json_scalars_survive_unique_key_parsing() {
        let doc = br#"{"Resources": {"R": {"Type": "Custom::Thing", "Properties": {
            "Neg": -3, "Big": 18446744073709551615, "Ratio": 0.5, "On": true, "Nothing": null,
            "List": [1, "two", {"k": "v"}]
        }}}}"#;
        let t = parse_template(doc, "scalars.json", None).unwrap();
        let props = t.resources()[0].properties();
        assert_eq!(props["Neg"], serde_json::json!(-3));
        assert_eq!(props["Big"], serde_json::json!(u64::MAX));
        assert_eq!(props["Ratio"], serde_json::json!(0.5));
        assert_eq!(props["On"], Value::Bool(true));
        assert_eq!(props["Nothing"], Value::Null);
        assert_eq!(props["List"], serde_json::json!([1, "two", {"k": "v"}]));
    }

    #[test]
    fn numeric_yaml_keys_are_stringified() {
        let yaml = "Resources:
  B:
    Type: Custom::Thing
    Properties:
      Ports:
        22: ssh
";
        let t = parse_template(yaml.as_bytes(), "x.yaml", None).unwrap();
        assert_eq!(
            t.resources()[0].property_path(&["Ports", "22"]).and_then(|v| v.as_str()),
            Some("ssh")
        );
    }
}
