use tracelink::trace::{LoggingSpanExporter, TracerProvider};
use tracelink_services::{config::Config, init_logging, loadgen};
use tracing::info;

#[tokio::main]
async fn main() {
    init_logging();
    let config = Config::from_env();

    let provider = TracerProvider::builder()
        .with_exporter(LoggingSpanExporter::new())
        .build();

    info!(
        interval_ms = config.loadgen_interval.as_millis() as u64,
        url = %config.frontend_url(),
        "load generator starting"
    );

    loadgen::run(provider, config.frontend_url(), config.loadgen_interval).await;
}
