use anyhow::Context;
use infrastructure::{
    DynamoDbClient, DynamoDbTodoRepository, InMemoryTodoRepository, RetryConfig, TodoRepository,
};
use shared::{init_tracing, Config, StorageBackend};
use std::net::SocketAddr;
use std::sync::Arc;
use todo_api::cors::build_cors_layer;
use todo_api::sweeper::{spawn_sweeper, SWEEP_INTERVAL};
use todo_api::AppState;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env().context("設定の読み込みに失敗")?;
    init_tracing(config.log_format)
        .map_err(|e| anyhow::anyhow!("トレーシング初期化エラー: {e}"))?;

    info!(
        environment = %config.environment,
        storage = ?config.storage_backend,
        throttle_rate = config.throttle_user_rate.as_deref().unwrap_or("none"),
        "todo-api 起動"
    );

    let repo = build_repository(&config).await;
    let state = AppState::from_config(&config, repo)
        .context("THROTTLE_USER_RATE が不正")?;
    let sweeper = spawn_sweeper(state.throttle.clone(), SWEEP_INTERVAL);

    let cors = build_cors_layer(&config.cors_origins)
        .context("CORS_ORIGINS が不正")?;
    let app = todo_api::app(state).layer(cors);

    let listener = tokio::net::TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("{} へのバインドに失敗", config.bind_address()))?;
    info!(addr = %config.bind_address(), "サーバー起動");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("サーバーエラー")?;

    sweeper.abort();
    info!("シャットダウン完了");
    Ok(())
}

async fn build_repository(config: &Config) -> Arc<dyn TodoRepository> {
    match config.storage_backend {
        StorageBackend::Memory => Arc::new(InMemoryTodoRepository::new()),
        StorageBackend::DynamoDb => {
            let db = DynamoDbClient::new(config).await;
            info!(table = db.table_name(), "DynamoDB リポジトリを使用");
            Arc::new(DynamoDbTodoRepository::new(db, RetryConfig::from(config)))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Ctrl-C ハンドラーの登録に失敗");
        std::future::pending::<()>().await;
    }
    info!("シャットダウン要求を受信");
}
