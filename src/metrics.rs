// Prometheus metrics for the character designer
//
// Exposed on the /metrics route of the web server:
// - Generation outcomes (counter)
// - Generation latency (histogram)
// - Quota unlock attempts (counter)
// - Quota usage in the current window (gauge)
// - Quota persistence failures (counter)

use lazy_static::lazy_static;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;
use std::sync::Once;

lazy_static! {
    pub static ref REGISTRY: Arc<Registry> = Arc::new(Registry::new());

    pub static ref GENERATIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("character_generations_total", "Character generation requests by outcome"),
        &["outcome"]
    ).expect("Failed to create generations total metric");

    pub static ref GENERATION_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "character_generation_duration_seconds",
            "Time spent waiting on the text generator"
        ),
    ).expect("Failed to create generation duration metric");

    pub static ref UNLOCK_ATTEMPTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("quota_unlock_attempts_total", "Password override attempts by result"),
        &["result"]
    ).expect("Failed to create unlock attempts metric");

    pub static ref QUOTA_USED: IntGauge = IntGauge::new(
        "quota_used",
        "Generations consumed in the current window"
    ).expect("Failed to create quota used metric");

    pub static ref QUOTA_STORAGE_ERRORS_TOTAL: IntCounter = IntCounter::new(
        "quota_storage_errors_total",
        "Failed writes of the quota state file"
    ).expect("Failed to create quota storage errors metric");
}

static INIT: Once = Once::new();

/// Register all metrics with the registry. Safe to call more than once.
pub fn init() -> prometheus::Result<()> {
    let mut result = Ok(());
    INIT.call_once(|| {
        result = register_all();
    });
    result
}

fn register_all() -> prometheus::Result<()> {
    REGISTRY.register(Box::new(GENERATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(GENERATION_DURATION_SECONDS.clone()))?;
    REGISTRY.register(Box::new(UNLOCK_ATTEMPTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(QUOTA_USED.clone()))?;
    REGISTRY.register(Box::new(QUOTA_STORAGE_ERRORS_TOTAL.clone()))?;
    Ok(())
}

/// Gather all metrics in Prometheus text format
pub fn gather_metrics() -> anyhow::Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| anyhow::anyhow!("Failed to encode metrics: {}", e))?;
    String::from_utf8(buffer).map_err(|e| anyhow::anyhow!("Invalid UTF-8 in metrics: {}", e))
}
