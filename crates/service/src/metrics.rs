use once_cell::sync::Lazy;
use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge, Encoder, IntCounter,
    IntCounterVec, IntGauge, TextEncoder,
};

// Prometheus metrics (default registry)
pub static WRITES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "scheduler_writes_total",
        "Accepted writes applied to the in-memory store",
        &["kind"]
    )
    .expect("register writes_total")
});

pub static SAVE_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "scheduler_save_failures_total",
        "Blob saves that failed after an in-memory write"
    )
    .expect("register save_failures_total")
});

pub static ACTIVE_SUBSCRIPTIONS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "scheduler_active_subscriptions",
        "Live subscriptions registered on the notification bus"
    )
    .expect("register active_subscriptions")
});

pub static EVENTS_SENT_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "scheduler_events_sent_total",
        "State events pushed to subscribed connections"
    )
    .expect("register events_sent_total")
});

/// Render the default registry in the Prometheus text format.
pub fn gather_text() -> String {
    let encoder = TextEncoder::new();
    let mut buf = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buf) {
        tracing::warn!(error = %e, "failed to encode metrics");
    }
    String::from_utf8(buf).unwrap_or_default()
}
