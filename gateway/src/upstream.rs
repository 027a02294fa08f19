use crate::errors::{Result, Upstream, UpstreamError};
use crate::metrics_defs::{UPSTREAM_DURATION, UPSTREAM_REQUESTS};
use http::StatusCode;
use serde::de::DeserializeOwned;
use shared::{counter, histogram};
use std::time::{Duration, Instant};

/// Characters of an upstream body included in diagnostic logs.
pub const BODY_PREVIEW_CHARS: usize = 500;

/// Builds the reqwest client used for one upstream. The timeout bounds the whole
/// exchange, including reading the body.
pub fn build_client(user_agent: &str, timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .build()
        .map_err(UpstreamError::Client)
}

/// Sends `request` and reads the complete body as text.
///
/// Transport failures and non-success statuses are turned into [`UpstreamError`]s.
/// The body is always read in full before the status is checked so that it can be
/// included in diagnostics.
pub async fn send_and_read(
    upstream: Upstream,
    request: reqwest::RequestBuilder,
) -> Result<(StatusCode, String)> {
    let started = Instant::now();

    let exchange = async {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok::<_, reqwest::Error>((status, body))
    }
    .await;

    let (status, body) = match exchange {
        Ok(exchange) => exchange,
        Err(e) => {
            let err = UpstreamError::from_reqwest(upstream, e);
            record_call(upstream, started, err.kind());
            tracing::error!(upstream = %upstream, error = %err, "Upstream request failed");
            return Err(err);
        }
    };

    if !status.is_success() {
        record_call(upstream, started, "http_error");
        tracing::warn!(
            upstream = %upstream,
            status = %status,
            body_preview = preview(&body, BODY_PREVIEW_CHARS),
            "Upstream returned an error status"
        );
        return Err(UpstreamError::Http { upstream, status });
    }

    record_call(upstream, started, "ok");
    tracing::debug!(
        upstream = %upstream,
        status = %status,
        body_len = body.len(),
        "Upstream responded"
    );
    Ok((status, body))
}

/// Parses an upstream body, logging a preview of it on failure.
pub fn parse_json<T: DeserializeOwned>(upstream: Upstream, body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|source| {
        tracing::error!(
            upstream = %upstream,
            error = %source,
            body_preview = preview(body, BODY_PREVIEW_CHARS),
            "Could not parse upstream response"
        );
        UpstreamError::InvalidJson { upstream, source }
    })
}

/// The first `max_chars` characters of `body`.
pub fn preview(body: &str, max_chars: usize) -> &str {
    match body.char_indices().nth(max_chars) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

fn record_call(upstream: Upstream, started: Instant, outcome: &'static str) {
    counter!(UPSTREAM_REQUESTS, "upstream" => upstream.as_str(), "outcome" => outcome).increment(1);
    histogram!(UPSTREAM_DURATION, "upstream" => upstream.as_str())
        .record(started.elapsed().as_secs_f64());
}
