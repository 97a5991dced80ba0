use once_cell::sync::Lazy;
use prometheus::{register_int_counter, Encoder, IntCounter, TextEncoder};

// Prometheus metrics (default registry)
pub static LOGIN_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "auth_gateway_login_total",
        "Total login attempts"
    )
    .expect("register login_total")
});

pub static LOGIN_FAILED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "auth_gateway_login_failed_total",
        "Login attempts rejected for bad credentials"
    )
    .expect("register login_failed_total")
});

pub static TOKEN_REJECTED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "auth_gateway_token_rejected_total",
        "Requests rejected for a missing or invalid bearer token"
    )
    .expect("register token_rejected_total")
});

/// Force registration so every counter shows up on the first scrape.
pub fn init_metrics() {
    Lazy::force(&LOGIN_TOTAL);
    Lazy::force(&LOGIN_FAILED_TOTAL);
    Lazy::force(&TOKEN_REJECTED_TOTAL);
}

pub fn encode_metrics() -> (axum::http::StatusCode, String) {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            format!("metrics encode error: {e}"),
        );
    }
    (
        axum::http::StatusCode::OK,
        String::from_utf8(buffer).unwrap_or_default(),
    )
}
