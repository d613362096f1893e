use tokio::net::TcpListener;
use tracelink::trace::{LoggingSpanExporter, TracerProvider};
use tracelink_services::{config::Config, frontend, init_logging};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_logging();
    let config = Config::from_env();

    let provider = TracerProvider::builder()
        .with_exporter(LoggingSpanExporter::new())
        .build();

    let listener = TcpListener::bind(("127.0.0.1", config.frontend_port)).await?;
    info!(port = config.frontend_port, "frontend listening");

    frontend::run(listener, provider, config.backend_url()).await
}
