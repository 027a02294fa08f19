use crate::locator::{self, WEIGHT};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_CONDITION: &str = "unknown";

/// Public view of a drone's static configuration.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConfigRecord {
    pub drone_id: i64,
    pub drone_name: Value,
    pub light: Value,
    pub country: Value,
    pub weight: Value,
    #[serde(skip_serializing)]
    pub condition: Option<String>,
}

impl ConfigRecord {
    /// Projects a located upstream record. Returns `None` if the record has no
    /// usable identifier.
    pub fn from_upstream(record: &Map<String, Value>) -> Option<Self> {
        let field = |name: &str| record.get(name).cloned().unwrap_or(Value::Null);

        Some(ConfigRecord {
            drone_id: locator::record_id(record)?,
            drone_name: field("drone_name"),
            light: field("light"),
            country: field("country"),
            weight: WEIGHT.resolve(record).cloned().unwrap_or(Value::Null),
            condition: match record.get("condition") {
                None | Some(Value::Null) => None,
                Some(Value::String(s)) if s.is_empty() => None,
                Some(Value::String(s)) => Some(s.clone()),
                Some(other) => Some(other.to_string()),
            },
        })
    }

    pub fn status(&self) -> DroneStatus {
        DroneStatus {
            condition: self
                .condition
                .clone()
                .unwrap_or_else(|| DEFAULT_CONDITION.to_string()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DroneStatus {
    pub condition: String,
}

/// Public view of a log entry. Fields are carried over from the upstream record
/// as-is; a missing field becomes `null`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct LogRecord {
    pub drone_id: Value,
    pub drone_name: Value,
    pub created: Value,
    pub country: Value,
    pub celsius: Value,
}

impl LogRecord {
    pub fn from_upstream(record: &Value) -> Self {
        let field = |name: &str| record.get(name).cloned().unwrap_or(Value::Null);

        LogRecord {
            drone_id: field("drone_id"),
            drone_name: field("drone_name"),
            created: field("created"),
            country: field("country"),
            celsius: field("celsius"),
        }
    }
}

/// Body sent to the log upstream when creating an entry.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NewLogRecord {
    pub drone_id: i64,
    pub drone_name: String,
    pub country: String,
    pub celsius: f64,
}

/// List envelope returned by the log upstream.
#[derive(Debug, Deserialize)]
pub struct LogListResponse {
    #[serde(default)]
    pub items: Vec<Value>,
    #[serde(default, rename = "totalItems")]
    pub total_items: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total_items: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total_items: u64) -> Self {
        let total_pages = if limit == 0 {
            0
        } else {
            total_items.div_ceil(u64::from(limit))
        };

        Pagination {
            page,
            limit,
            total_items,
            total_pages,
            has_next: u64::from(page) < total_pages,
            has_prev: page > 1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LogPage {
    pub data: Vec<LogRecord>,
    pub pagination: Pagination,
}
