use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter_vec, register_int_gauge, Encoder, HistogramVec,
    IntCounterVec, IntGauge, TextEncoder,
};

lazy_static! {
    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
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

    // Language model
    pub static ref LLM_CALLS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "llm_calls_total",
        "Total number of text generation calls",
        &["operation", "status"]
    )
    .unwrap();

    pub static ref LLM_CALL_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "llm_call_duration_seconds",
        "Text generation call duration in seconds",
        &["operation"],
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    )
    .unwrap();

    // Discovery providers
    pub static ref PROVIDER_ATTEMPTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "provider_attempts_total",
        "Search provider attempts by resource class and outcome",
        &["class", "provider", "status"]
    )
    .unwrap();

    pub static ref FALLBACKS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "fallbacks_total",
        "Number of times a deterministic fallback was used",
        &["stage"]
    )
    .unwrap();

    // Business Metrics
    pub static ref PLANS_GENERATED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "plans_generated_total",
        "Total number of study plans produced",
        &["source"]
    )
    .unwrap();

    pub static ref CHAT_MESSAGES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "chat_messages_total",
        "Total number of chat messages appended",
        &["role"]
    )
    .unwrap();

    pub static ref COUNTDOWN_TRANSITIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "countdown_transitions_total",
        "Countdown state transitions",
        &["transition"]
    )
    .unwrap();

    pub static ref STALE_FETCHES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "stale_resource_fetches_total",
        "Resource fetch results discarded because the module was no longer current",
        &["reason"]
    )
    .unwrap();

    pub static ref SSE_CONNECTIONS_ACTIVE: IntGauge = register_int_gauge!(
        "sse_connections_active",
        "Number of active SSE connections"
    )
    .unwrap();
}

/// Renders all metrics in Prometheus text format
pub fn render_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| prometheus::Error::Msg(format!("Failed to convert metrics to UTF-8: {}", e)))
}

/// Helper: track a text generation call with metrics
pub async fn track_llm_call<F, T, E>(operation: &str, future: F) -> Result<T, E>
where
    F: std::future::Future<Output = Result<T, E>>,
{
    let start = std::time::Instant::now();
    let result = future.await;
    let duration = start.elapsed().as_secs_f64();

    let status = if result.is_ok() { "success" } else { "error" };

    LLM_CALLS_TOTAL
        .with_label_values(&[operation, status])
        .inc();

    LLM_CALL_DURATION_SECONDS
        .with_label_values(&[operation])
        .observe(duration);

    result
}

pub fn record_provider_attempt(class: &str, provider: &str, status: &str) {
    PROVIDER_ATTEMPTS_TOTAL
        .with_label_values(&[class, provider, status])
        .inc();
}

pub fn record_fallback(stage: &str) {
    FALLBACKS_TOTAL.with_label_values(&[stage]).inc();
}

pub fn record_plan(source: &str) {
    PLANS_GENERATED_TOTAL.with_label_values(&[source]).inc();
}

pub fn record_chat_message(role: &str) {
    CHAT_MESSAGES_TOTAL.with_label_values(&[role]).inc();
}

pub fn record_countdown_transition(transition: &str) {
    COUNTDOWN_TRANSITIONS_TOTAL
        .with_label_values(&[transition])
        .inc();
}

pub fn record_stale_fetch(reason: &str) {
    STALE_FETCHES_TOTAL.with_label_values(&[reason]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registration() {
        let _ = HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/health", "200"])
            .get();
    }

    #[test]
    fn test_render_metrics() {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();
        record_fallback("test");

        let output = render_metrics().unwrap();
        assert!(output.contains("http_requests_total"));
        assert!(output.contains("fallbacks_total"));
    }

    #[tokio::test]
    async fn track_llm_call_passes_result_through() {
        let ok: Result<u8, String> = track_llm_call("test", async { Ok(7) }).await;
        assert_eq!(ok, Ok(7));

        let err: Result<u8, String> = track_llm_call("test", async { Err("boom".into()) }).await;
        assert!(err.is_err());
    }
}
