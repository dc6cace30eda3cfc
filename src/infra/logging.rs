pub fn init() {
    // RUST_LOG wins when set; "info" otherwise. try_init so repeated calls
    // (tests, CLI entry) are harmless.
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init();
}

/// Emit a counter/latency observation as a structured log line. The remote
/// clients use this for per-call latency and error totals.
pub fn log_metric(tool: &str, metric: &str, value: f64) {
    tracing::info!(tool = tool, metric = metric, value = value, "metric");
}
