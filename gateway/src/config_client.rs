use crate::errors::{Result, Upstream};
use crate::locator::{self, DRONE_ID, FieldAliases};
use crate::metrics_defs::CONFIG_LOOKUP_MISS;
use crate::normalize::{UpstreamShape, json_type_name, normalize};
use crate::types::ConfigRecord;
use crate::upstream::{self, build_client, preview, send_and_read};
use async_trait::async_trait;
use http::header::ACCEPT;
use serde::Serialize;
use serde_json::Value;
use shared::counter;
use std::time::Duration;
use url::Url;

const DRONE_NAME: FieldAliases = FieldAliases {
    field: "drone_name",
    aliases: &["drone_name", "droneName", "name"],
};

const SAMPLE_CHARS: usize = 500;
const RAW_RESPONSE_CHARS: usize = 1000;

/// Source of per-drone configuration.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    /// Looks up one drone. `Ok(None)` means the upstream answered but has no
    /// record for it.
    async fn fetch_config(&self, drone_id: &str) -> Result<Option<ConfigRecord>>;

    /// Fetches the raw upstream response and summarizes how it would be interpreted.
    async fn inspect(&self) -> Result<ConfigSnapshot>;
}

#[derive(Clone)]
pub struct HttpConfigClient {
    client: reqwest::Client,
    url: Url,
}

impl HttpConfigClient {
    pub fn new(url: Url, user_agent: &str, timeout: Duration) -> Result<Self> {
        Ok(HttpConfigClient {
            client: build_client(user_agent, timeout)?,
            url,
        })
    }

    async fn fetch_body(&self) -> Result<String> {
        let request = self
            .client
            .get(self.url.clone())
            .header(ACCEPT, "application/json");
        let (_status, body) = send_and_read(Upstream::Config, request).await?;
        Ok(body)
    }
}

#[async_trait]
impl ConfigSource for HttpConfigClient {
    #[tracing::instrument(skip(self), fields(upstream = "config"))]
    async fn fetch_config(&self, drone_id: &str) -> Result<Option<ConfigRecord>> {
        let body = self.fetch_body().await?;
        let payload: Value = upstream::parse_json(Upstream::Config, &body)?;

        let records = normalize(payload).inspect_err(|e| {
            tracing::error!(
                error = %e,
                body_preview = preview(&body, upstream::BODY_PREVIEW_CHARS),
                "Config upstream returned an unusable payload"
            );
        })?;

        match locator::find(&records, drone_id).and_then(ConfigRecord::from_upstream) {
            Some(record) => Ok(Some(record)),
            None => {
                counter!(CONFIG_LOOKUP_MISS).increment(1);
                tracing::info!(records = records.len(), "No config record matched");
                Ok(None)
            }
        }
    }

    #[tracing::instrument(skip(self), fields(upstream = "config"))]
    async fn inspect(&self) -> Result<ConfigSnapshot> {
        let body = self.fetch_body().await?;
        Ok(ConfigSnapshot::from_body(&body))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DroneSummary {
    pub drone_id: Value,
    pub drone_name: Value,
}

/// Diagnostic view of a raw config upstream response.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSnapshot {
    pub success: bool,
    pub raw_response_length: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_length: Option<usize>,
    pub available_drone_ids: Vec<DroneSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_item: Option<Value>,
}

impl ConfigSnapshot {
    pub fn from_body(body: &str) -> Self {
        let payload: Value = match serde_json::from_str(body) {
            Ok(payload) => payload,
            Err(e) => {
                return ConfigSnapshot {
                    success: false,
                    raw_response_length: body.len(),
                    error: Some(format!("JSON Parse Error: {e}")),
                    raw_response: Some(preview(body, RAW_RESPONSE_CHARS).to_string()),
                    data_type: None,
                    shape: None,
                    data_length: None,
                    available_drone_ids: Vec::new(),
                    sample_data: None,
                    first_item: None,
                };
            }
        };

        let data_type = json_type_name(&payload);
        let compact = payload.to_string();
        let sample_data = Some(preview(&compact, SAMPLE_CHARS).to_string());

        let shape = UpstreamShape::detect(payload);
        let shape_name = shape.describe();
        let records = shape.into_records().unwrap_or_default();

        let available_drone_ids = records
            .iter()
            .filter_map(Value::as_object)
            .filter_map(|record| {
                let drone_id = DRONE_ID.resolve(record)?.clone();
                Some(DroneSummary {
                    drone_id,
                    drone_name: DRONE_NAME.resolve(record).cloned().unwrap_or(Value::Null),
                })
            })
            .collect();

        ConfigSnapshot {
            success: true,
            raw_response_length: body.len(),
            error: None,
            raw_response: None,
            data_type: Some(data_type),
            shape: Some(shape_name),
            data_length: Some(records.len()),
            available_drone_ids,
            sample_data,
            first_item: records.into_iter().next(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::UpstreamError;
    use crate::testutils::MockUpstream;
    use axum::Json;
    use axum::routing::get;
    use http::StatusCode;
    use serde_json::json;

    async fn serve(payload: Value) -> (MockUpstream, HttpConfigClient) {
        let upstream = MockUpstream::spawn(
            axum::Router::new().route("/configs", get(move || async move { Json(payload) })),
        )
        .await;
        let client = HttpConfigClient::new(
            upstream.url("/configs"),
            "DroneAPI/1.0",
            Duration::from_secs(5),
        )
        .unwrap();
        (upstream, client)
    }

    #[tokio::test]
    async fn test_fetch_config_from_envelope() {
        let (upstream, client) = serve(json!({
            "data": [
                {"drone_id": "1", "drone_name": "Dot", "light": "red", "country": "India", "weight": 1.5},
                {"droneId": 2, "drone_name": "Dash", "light": "blue", "country": "Japan", "weigh": 2.5, "condition": "good"},
            ]
        }))
        .await;

        let record = client.fetch_config("2").await.unwrap().unwrap();
        assert_eq!(record.drone_id, 2);
        assert_eq!(record.drone_name, json!("Dash"));
        assert_eq!(record.weight, json!(2.5));
        assert_eq!(record.status().condition, "good");

        let requests = upstream.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].header("accept"), Some("application/json"));
        assert_eq!(requests[0].header("user-agent"), Some("DroneAPI/1.0"));
    }

    #[tokio::test]
    async fn test_fetch_config_not_found() {
        let (_upstream, client) = serve(json!([{"drone_id": 1, "drone_name": "Dot"}])).await;
        assert_eq!(client.fetch_config("999").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_fetch_config_single_object() {
        let (_upstream, client) = serve(json!({"id": 7, "drone_name": "Solo"})).await;
        let record = client.fetch_config("7").await.unwrap().unwrap();
        assert_eq!(record.drone_id, 7);
    }

    #[tokio::test]
    async fn test_fetch_config_malformed_shape() {
        let (_upstream, client) = serve(json!("just a string")).await;
        let err = client.fetch_config("1").await.unwrap_err();
        assert!(matches!(err, UpstreamError::MalformedShape { found: "string", .. }));
    }

    #[tokio::test]
    async fn test_fetch_config_invalid_json() {
        let upstream = MockUpstream::spawn(
            axum::Router::new().route("/configs", get(|| async { "<html>oops</html>" })),
        )
        .await;
        let client =
            HttpConfigClient::new(upstream.url("/configs"), "t", Duration::from_secs(5)).unwrap();

        let err = client.fetch_config("1").await.unwrap_err();
        assert!(matches!(err, UpstreamError::InvalidJson { .. }));
    }

    #[tokio::test]
    async fn test_fetch_config_http_error() {
        let upstream = MockUpstream::spawn(axum::Router::new().route(
            "/configs",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        ))
        .await;
        let client =
            HttpConfigClient::new(upstream.url("/configs"), "t", Duration::from_secs(5)).unwrap();

        let err = client.fetch_config("1").await.unwrap_err();
        assert!(matches!(
            err,
            UpstreamError::Http {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                ..
            }
        ));
    }

    #[test]
    fn test_snapshot_of_envelope() {
        let snapshot = ConfigSnapshot::from_body(
            r#"{"items": [{"droneId": 3, "name": "Trio"}, {"drone_name": "no id"}]}"#,
        );
        assert!(snapshot.success);
        assert_eq!(snapshot.data_type, Some("object"));
        assert_eq!(snapshot.shape, Some("envelope:items"));
        assert_eq!(snapshot.data_length, Some(2));
        assert_eq!(
            snapshot.available_drone_ids,
            vec![DroneSummary {
                drone_id: json!(3),
                drone_name: json!("Trio"),
            }]
        );
        assert_eq!(snapshot.first_item, Some(json!({"droneId": 3, "name": "Trio"})));
    }

    #[test]
    fn test_snapshot_of_invalid_json() {
        let body = "x".repeat(2000);
        let snapshot = ConfigSnapshot::from_body(&body);
        assert!(!snapshot.success);
        assert_eq!(snapshot.raw_response_length, 2000);
        assert_eq!(snapshot.raw_response.unwrap().len(), 1000);

        let value = serde_json::to_value(ConfigSnapshot::from_body("{")).unwrap();
        assert_eq!(value["success"], json!(false));
        assert!(value.get("firstItem").is_none());
    }
}
