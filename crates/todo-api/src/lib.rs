pub mod clock;
pub mod cors;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod serializer;
pub mod state;
pub mod sweeper;
pub mod throttle;
pub mod viewset;

pub use error::ApiError;
pub use state::AppState;

use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

/// アプリケーション全体のルーターを構築する
///
/// ビューセットのルートにだけスロットルを掛け、`/health` は対象外とする。
pub fn app(state: AppState) -> Router {
    let viewset = viewset::routes().layer(axum::middleware::from_fn_with_state(
        state.clone(),
        middleware::throttle_requests,
    ));

    Router::new()
        .route("/health", get(health))
        .merge(viewset)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
