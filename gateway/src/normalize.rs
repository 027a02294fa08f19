//! Shape detection for config upstream payloads.
//!
//! The config upstream is not consistent about how it wraps its records. A payload is
//! classified into one of the recognized [`UpstreamShape`]s and then flattened into an
//! ordered list of records.

use crate::errors::{Upstream, UpstreamError};
use serde_json::{Map, Value};

/// Envelope keys that may carry the record collection, in priority order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnvelopeKey {
    Data,
    Items,
    Results,
}

impl EnvelopeKey {
    pub const PRIORITY: [EnvelopeKey; 3] =
        [EnvelopeKey::Data, EnvelopeKey::Items, EnvelopeKey::Results];

    pub const fn as_str(&self) -> &'static str {
        match self {
            EnvelopeKey::Data => "data",
            EnvelopeKey::Items => "items",
            EnvelopeKey::Results => "results",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum UpstreamShape {
    /// A top-level array.
    Bare(Vec<Value>),
    /// An object carrying the array under one of the envelope keys.
    Enveloped { key: EnvelopeKey, records: Vec<Value> },
    /// An object that is itself the record.
    Single(Map<String, Value>),
    /// Anything else (string, number, bool, null).
    Unrecognized(Value),
}

impl UpstreamShape {
    pub fn detect(payload: Value) -> Self {
        match payload {
            Value::Array(records) => UpstreamShape::Bare(records),
            Value::Object(mut obj) => {
                for key in EnvelopeKey::PRIORITY {
                    if matches!(obj.get(key.as_str()), Some(Value::Array(_)))
                        && let Some(Value::Array(records)) = obj.remove(key.as_str())
                    {
                        return UpstreamShape::Enveloped { key, records };
                    }
                }
                UpstreamShape::Single(obj)
            }
            other => UpstreamShape::Unrecognized(other),
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            UpstreamShape::Bare(_) => "array",
            UpstreamShape::Enveloped { key, .. } => match key {
                EnvelopeKey::Data => "envelope:data",
                EnvelopeKey::Items => "envelope:items",
                EnvelopeKey::Results => "envelope:results",
            },
            UpstreamShape::Single(_) => "single_object",
            UpstreamShape::Unrecognized(value) => json_type_name(value),
        }
    }

    pub fn into_records(self) -> Result<Vec<Value>, UpstreamError> {
        match self {
            UpstreamShape::Bare(records) | UpstreamShape::Enveloped { records, .. } => Ok(records),
            UpstreamShape::Single(obj) => Ok(vec![Value::Object(obj)]),
            UpstreamShape::Unrecognized(value) => Err(UpstreamError::MalformedShape {
                upstream: Upstream::Config,
                found: json_type_name(&value),
            }),
        }
    }
}

/// Flattens any recognized payload into its ordered record list.
pub fn normalize(payload: Value) -> Result<Vec<Value>, UpstreamError> {
    let shape = UpstreamShape::detect(payload);
    tracing::debug!(shape = shape.describe(), "Detected config payload shape");
    shape.into_records()
}

pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
