use http::StatusCode;
use std::fmt;
use thiserror::Error;

/// Result type alias for upstream operations
pub type Result<T, E = UpstreamError> = std::result::Result<T, E>;

/// The external services the gateway talks to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Upstream {
    Config,
    Log,
}

impl Upstream {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Upstream::Config => "config",
            Upstream::Log => "log",
        }
    }

    /// Human readable name used in client-facing messages.
    pub const fn server_name(&self) -> &'static str {
        match self {
            Upstream::Config => "drone config server",
            Upstream::Log => "drone log server",
        }
    }
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while talking to an upstream
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("{upstream} upstream unreachable: {source}")]
    Unreachable {
        upstream: Upstream,
        source: reqwest::Error,
    },

    #[error("{upstream} upstream timed out")]
    Timeout { upstream: Upstream },

    #[error("{upstream} upstream returned HTTP {status}")]
    Http {
        upstream: Upstream,
        status: StatusCode,
    },

    #[error("invalid JSON from {upstream} upstream: {source}")]
    InvalidJson {
        upstream: Upstream,
        source: serde_json::Error,
    },

    #[error("unrecognized response shape from {upstream} upstream: {found}")]
    MalformedShape { upstream: Upstream, found: &'static str },

    #[error("could not build HTTP client: {0}")]
    Client(reqwest::Error),
}

impl UpstreamError {
    /// Classifies a transport-level reqwest failure.
    pub fn from_reqwest(upstream: Upstream, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            UpstreamError::Timeout { upstream }
        } else {
            UpstreamError::Unreachable { upstream, source }
        }
    }

    pub fn upstream(&self) -> Option<Upstream> {
        match self {
            UpstreamError::Unreachable { upstream, .. }
            | UpstreamError::Timeout { upstream }
            | UpstreamError::Http { upstream, .. }
            | UpstreamError::InvalidJson { upstream, .. }
            | UpstreamError::MalformedShape { upstream, .. } => Some(*upstream),
            UpstreamError::Client(_) => None,
        }
    }

    /// Short label used for the `outcome` metric tag.
    pub const fn kind(&self) -> &'static str {
        match self {
            UpstreamError::Unreachable { .. } => "unreachable",
            UpstreamError::Timeout { .. } => "timeout",
            UpstreamError::Http { .. } => "http_error",
            UpstreamError::InvalidJson { .. } => "invalid_json",
            UpstreamError::MalformedShape { .. } => "malformed_shape",
            UpstreamError::Client(_) => "client",
        }
    }
}
