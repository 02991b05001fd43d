use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};
use lazy_static::lazy_static;
use prometheus::{
    Counter, Gauge, Histogram, register_counter, register_gauge, register_histogram,
};

lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("guardian_requests_total", "Total number of requests").unwrap();
    pub static ref UPSTREAM_CALLS: Counter =
        register_counter!("guardian_upstream_calls_total", "Calls dispatched to Subscan").unwrap();
    pub static ref RATE_LIMIT_WAITS: Counter = register_counter!(
        "guardian_rate_limit_waits_total",
        "Times the Subscan queue backed off at the call ceiling"
    )
    .unwrap();
    pub static ref RATE_LIMIT_QUEUE_DEPTH: Gauge = register_gauge!(
        "guardian_rate_limit_queue_depth",
        "Calls waiting in the Subscan queue"
    )
    .unwrap();
    pub static ref CACHE_HITS: Counter =
        register_counter!("guardian_cache_hits_total", "Total cache hits").unwrap();
    pub static ref CACHE_MISSES: Counter =
        register_counter!("guardian_cache_misses_total", "Total cache misses").unwrap();
    pub static ref CACHE_SIZE: Gauge =
        register_gauge!("guardian_cache_size", "Current number of items in cache").unwrap();
    pub static ref REQUEST_LATENCY: Histogram = register_histogram!(
        "guardian_request_latency_seconds",
        "Request latency in seconds"
    )
    .unwrap();
}

// Counts every request and records its latency
pub async fn track_requests(request: Request, next: Next) -> Response {
    REQUEST_TOTAL.inc();
    let start_time = Instant::now();
    let response = next.run(request).await;
    REQUEST_LATENCY.observe(start_time.elapsed().as_secs_f64());
    response
}
