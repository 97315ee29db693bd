use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, HistogramVec,
    IntCounter, IntCounterVec,
};

lazy_static! {
    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total HTTP requests",
        &["method", "path", "status"]
    )
    .unwrap();

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();

    // Pipeline Metrics
    pub static ref API_ERRORS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "api_errors_total",
        "Error envelopes rendered, by error code",
        &["code"]
    )
    .unwrap();

    pub static ref RATE_LIMIT_REJECTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "rate_limit_rejections_total",
        "Requests rejected by a rate limiter",
        &["policy"]  // policy: general, credentials
    )
    .unwrap();

    pub static ref VALIDATION_FAILURES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "validation_failures_total",
        "Requests rejected by schema validation",
        &["part"]  // part: body, params, query
    )
    .unwrap();

    pub static ref SANITIZED_FIELDS_TOTAL: IntCounter = register_int_counter!(
        "sanitized_fields_total",
        "String fields rewritten by the sanitizer"
    )
    .unwrap();
}

/// Initialize all metrics (called on startup)
pub fn init_metrics() {
    // Force lazy_static initialization
    lazy_static::initialize(&HTTP_REQUESTS_TOTAL);
    lazy_static::initialize(&HTTP_REQUEST_DURATION_SECONDS);
    lazy_static::initialize(&API_ERRORS_TOTAL);
    lazy_static::initialize(&RATE_LIMIT_REJECTIONS_TOTAL);
    lazy_static::initialize(&VALIDATION_FAILURES_TOTAL);
    lazy_static::initialize(&SANITIZED_FIELDS_TOTAL);
}
