//! # Processing Timestamps
//!
//! [`Timestamp`] is the time stamped on a validation result. Result stores
//! key records by `(templateId, timestamp)`, so one instant must have one
//! spelling: always UTC, always whole seconds, always `YYYY-MM-DDTHH:MM:SSZ`.

use std::fmt;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const RENDER_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// A timestamp string could not be accepted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid timestamp {input:?}: {reason}")]
pub struct TimestampError {
    pub input: String,
    pub reason: String,
}

/// UTC instant with seconds precision. Serializes as its string form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// The current time, sub-seconds dropped.
    pub fn now() -> Self {
        Self::from_utc(Utc::now())
    }

    pub fn from_utc(instant: DateTime<Utc>) -> Self {
        Self(instant.trunc_subsecs(0))
    }

    /// Accepts RFC 3339 text ending in `Z`. Offsets, even `+00:00`, are
    /// rejected; fractional seconds are dropped.
    pub fn parse(text: &str) -> Result<Self, TimestampError> {
        let reject = |reason: String| TimestampError {
            input: text.to_string(),
            reason,
        };
        if !text.ends_with('Z') {
            return Err(reject("expected a UTC time with a Z suffix".into()));
        }
        DateTime::parse_from_rfc3339(text)
            .map(|instant| Self::from_utc(instant.with_timezone(&Utc)))
            .map_err(|e| reject(e.to_string()))
    }

    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(RENDER_FORMAT))
    }
}

impl From<Timestamp> for String {
    fn from(ts: Timestamp) -> Self {
        ts.to_string()
    }
}

impl TryFrom<String> for Timestamp {
    type Error = TimestampError;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        Self::parse(&text)
    }
}
