use forgescan_api::app::services::ApiConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    forgescan_observability::init();

    let config = ApiConfig::from_env();
    let app = forgescan_api::app::build_app(config).await;

    let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
