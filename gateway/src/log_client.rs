use crate::errors::{Result, Upstream};
use crate::types::{LogListResponse, LogPage, LogRecord, NewLogRecord, Pagination};
use crate::upstream::{build_client, parse_json, send_and_read};
use async_trait::async_trait;
use http::header::ACCEPT;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Page size of the query used only to read `totalItems`.
const COUNT_QUERY_PAGE_SIZE: u32 = 0;

/// Store of drone temperature logs.
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Newest first, at most `limit` entries. `page` selects a later slice.
    async fn list_logs(&self, drone_id: i64, limit: u32, page: Option<u32>)
    -> Result<Vec<LogRecord>>;

    /// Total number of entries for a drone.
    async fn count_logs(&self, drone_id: i64) -> Result<u64>;

    async fn create_log(&self, record: &NewLogRecord) -> Result<LogRecord>;

    /// One page of entries together with its pagination envelope.
    async fn list_logs_page(&self, drone_id: i64, page: u32, limit: u32) -> Result<LogPage> {
        let data = self.list_logs(drone_id, limit, Some(page)).await?;
        let total_items = self.count_logs(drone_id).await?;

        Ok(LogPage {
            data,
            pagination: Pagination::new(page, limit, total_items),
        })
    }
}

#[derive(Clone)]
pub struct HttpLogClient {
    client: reqwest::Client,
    url: Url,
    api_token: String,
}

impl HttpLogClient {
    pub fn new(url: Url, api_token: String, user_agent: &str, timeout: Duration) -> Result<Self> {
        Ok(HttpLogClient {
            client: build_client(user_agent, timeout)?,
            url,
            api_token,
        })
    }

    fn query_url(&self, drone_id: i64, per_page: u32, sorted: bool, page: Option<u32>) -> Url {
        let mut url = self.url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("filter", &format!("drone_id={drone_id}"));
            if sorted {
                pairs.append_pair("sort", "-created");
            }
            pairs.append_pair("perPage", &per_page.to_string());
            if let Some(page) = page {
                pairs.append_pair("page", &page.to_string());
            }
        }
        url
    }

    async fn query(&self, url: Url) -> Result<LogListResponse> {
        let request = self
            .client
            .get(url)
            .bearer_auth(&self.api_token)
            .header(ACCEPT, "application/json");
        let (_status, body) = send_and_read(Upstream::Log, request).await?;
        parse_json(Upstream::Log, &body)
    }
}

#[async_trait]
impl LogStore for HttpLogClient {
    #[tracing::instrument(skip(self), fields(upstream = "log"))]
    async fn list_logs(
        &self,
        drone_id: i64,
        limit: u32,
        page: Option<u32>,
    ) -> Result<Vec<LogRecord>> {
        let response = self.query(self.query_url(drone_id, limit, true, page)).await?;
        tracing::debug!(items = response.items.len(), "Fetched drone logs");
        Ok(response.items.iter().map(LogRecord::from_upstream).collect())
    }

    #[tracing::instrument(skip(self), fields(upstream = "log"))]
    async fn count_logs(&self, drone_id: i64) -> Result<u64> {
        let url = self.query_url(drone_id, COUNT_QUERY_PAGE_SIZE, false, None);
        Ok(self.query(url).await?.total_items)
    }

    #[tracing::instrument(skip(self, record), fields(upstream = "log", drone_id = record.drone_id))]
    async fn create_log(&self, record: &NewLogRecord) -> Result<LogRecord> {
        let request = self
            .client
            .post(self.url.clone())
            .bearer_auth(&self.api_token)
            .header(ACCEPT, "application/json")
            .json(record);
        let (_status, body) = send_and_read(Upstream::Log, request).await?;
        let created: Value = parse_json(Upstream::Log, &body)?;
        tracing::info!(created = %created["created"], "Created drone log");
        Ok(LogRecord::from_upstream(&created))
    }
}
