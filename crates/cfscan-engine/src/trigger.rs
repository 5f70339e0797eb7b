//! # Object-Created Triggers
//!
//! Decodes an object-storage event notification into the objects a host
//! should fetch and validate. Only `ObjectCreated:*` records are kept.
//!
//! Object keys arrive form-URL-encoded (`+` for space, `%XX` escapes); they
//! are decoded here so the key can be used as a template identifier and
//! storage path as-is.

use serde::Deserialize;
use thiserror::Error;

/// The notification body could not be understood.
#[derive(Error, Debug)]
pub enum TriggerError {
    #[error("notification is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("record #{index} is missing {field}")]
    MissingField { index: usize, field: &'static str },
}

/// One object to validate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    pub bucket: String,
    /// Decoded object key.
    pub key: String,
}

impl ObjectRef {
    /// `bucket/key`, the form used in logs.
    pub fn display_path(&self) -> String {
        format!("{}/{}", self.bucket, self.key)
    }
}

#[derive(Debug, Deserialize)]
struct Notification {
    #[serde(rename = "Records", default)]
    records: Vec<Record>,
}

#[derive(Debug, Deserialize)]
struct Record {
    #[serde(rename = "eventName", default)]
    event_name: String,
    s3: Option<S3Entity>,
}

#[derive(Debug, Deserialize)]
struct S3Entity {
    bucket: Option<NamedEntity>,
    object: Option<ObjectEntity>,
}

#[derive(Debug, Deserialize)]
struct NamedEntity {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ObjectEntity {
    key: String,
}

/// Objects created according to `notification`, in record order.
pub fn object_refs(notification: &[u8]) -> Result<Vec<ObjectRef>, TriggerError> {
    let notification: Notification = serde_json::from_slice(notification)?;
    let mut refs = Vec::new();
    for (index, record) in notification.records.into_iter().enumerate() {
        if !record.event_name.starts_with("ObjectCreated:") {
            tracing::debug!(index, event = %record.event_name, "skipping non-create record");
            continue;
        }
        let s3 = record
            .s3
            .ok_or(TriggerError::MissingField { index, field: "s3" })?;
        let bucket = s3
            .bucket
            .ok_or(TriggerError::MissingField { index, field: "s3.bucket.name" })?;
        let object = s3
            .object
            .ok_or(TriggerError::MissingField { index, field: "s3.object.key" })?;
        refs.push(ObjectRef {
            bucket: bucket.name,
            key: decode_key(&object.key),
        });
    }
    Ok(refs)
}

/// Undo the form-URL-encoding of an object key.
pub fn decode_key(raw: &str) -> String {
    // Literal separators are re-escaped so the whole key decodes as one name.
    let escaped = raw.replace('&', "%26").replace('=', "%3D");
    url::form_urlencoded::parse(escaped.as_bytes())
        .map(|(name, _)| name.into_owned())
        .next()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PUT_EVENT: &str = r#"{
        "Records": [
            {
                "eventVersion": "2.1",
                "eventSource": "aws:s3",
                "eventName": "ObjectCreated:Put",
                "s3": {
                    "bucket": {"name": "templates-inbox", "arn": "arn:aws:s3:::templates-inbox"},
                    "object": {"key": "teams/data+platform/stack%28v2%29.yaml", "size": 1024}
                }
            },
            {
                "eventName": "ObjectRemoved:Delete",
                "s3": {"bucket": {"name": "templates-inbox"}, "object": {"key": "old.yaml"}}
            }
        ]
    }"#;

    #[test]
    fn created_objects_are_decoded() {
        let refs = object_refs(PUT_EVENT.as_bytes()).unwrap();
        assert_eq!(
            refs,
            vec![ObjectRef {
                bucket: "templates-inbox".into(),
                key: "teams/data platform/stack(v2).yaml".into(),
            }]
        );
        assert_eq!(refs[0].display_path(), "templates-inbox/teams/data platform/stack(v2).yaml");
    }

    #[test]
    fn key_decoding() {
        assert_eq!(decode_key("plain.json"), "plain.json");
        assert_eq!(decode_key("a+b%2Bc.yaml"), "a b+c.yaml");
        assert_eq!(decode_key("q=1&r=2.json"), "q=1&r=2.json");
        assert_eq!(decode_key(""), "");
    }

    #[test]
    fn empty_notification_has_no_objects() {
        assert!(object_refs(b"{}").unwrap().is_empty());
    }

    #[test]
    fn malformed_notifications_are_errors() {
        assert!(matches!(object_refs(b"not json"), Err(TriggerError::Malformed(_))));
        let missing = br#"{"Records": [
            {"eventName": "ObjectCreated:Put", "s3": {"bucket": {"name": "b"}}}
        ]}"#;
        assert!(matches!(
            object_refs(missing),
            Err(TriggerError::MissingField { index: 0, field: "s3.object.key" })
        ));
    }
}
