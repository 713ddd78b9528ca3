use anyhow::Context;
use todo_api::{
    application::todo_service::TodoServiceImpl,
    config::AppConfig,
    domain::repository::TodoRepository,
    http::routing::{self, todos},
    infrastructure::sqlite_repo::SqliteTodoRepository,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env()?;
    let repo = SqliteTodoRepository::connect(&config.database_url)
        .await
        .with_context(|| format!("opening database {}", config.database_url))?;
    repo.init().await.context("creating todos table")?;
    tracing::info!(database_url = %config.database_url, "todos table ready");

    let service = TodoServiceImpl::new(repo.clone());
    let todos_router = todos::router(todos::AppState { service });
    let router = routing::app(todos_router, &config.static_dir);

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");
    let served = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    repo.close().await;
    tracing::info!("database connection closed");
    served?;
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal::ctrl_c;
    let _ = ctrl_c().await;
    tracing::info!("shutdown");
}
