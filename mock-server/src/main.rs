use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,mock_server=debug";

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "1337".to_string());
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "serving /parse");
    mock_server::run(listener).await
}
