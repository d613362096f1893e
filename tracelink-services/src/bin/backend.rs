use tokio::net::TcpListener;
use tracelink::trace::{LoggingSpanExporter, TracerProvider};
use tracelink_kv::{MemoryKv, TracedKvClient};
use tracelink_services::{backend, config::Config, init_logging};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_logging();
    let config = Config::from_env();

    let provider = TracerProvider::builder()
        .with_exporter(LoggingSpanExporter::new())
        .build();
    let kv = TracedKvClient::new(MemoryKv::new(), provider.tracer("kv"));

    let listener = TcpListener::bind(("127.0.0.1", config.backend_port)).await?;
    info!(port = config.backend_port, "backend listening");

    backend::run(listener, provider, kv).await
}
