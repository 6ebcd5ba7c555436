use env_logger::Env;
use log::info;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    info!(
        "listening on {addr} (project {}, token {})",
        mock_server::DEFAULT_PROJECT_ID,
        mock_server::DEFAULT_TOKEN
    );
    mock_server::run(listener).await
}
