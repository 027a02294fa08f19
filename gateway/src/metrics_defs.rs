//! Metrics definitions for the gateway.

use shared::metrics_defs::{MetricDef, MetricType};

pub const UPSTREAM_REQUESTS: MetricDef = MetricDef {
    name: "upstream.requests",
    metric_type: MetricType::Counter,
    description: "Requests issued to an upstream. Tagged with upstream, outcome.",
};

pub const UPSTREAM_DURATION: MetricDef = MetricDef {
    name: "upstream.duration",
    metric_type: MetricType::Histogram,
    description: "Upstream round trip in seconds, including reading the body. Tagged with upstream.",
};

pub const CONFIG_LOOKUP_MISS: MetricDef = MetricDef {
    name: "config.lookup.miss",
    metric_type: MetricType::Counter,
    description: "Config lookups where no upstream record matched the requested drone",
};

pub const ALL_METRICS: &[MetricDef] = &[UPSTREAM_REQUESTS, UPSTREAM_DURATION, CONFIG_LOOKUP_MISS];
