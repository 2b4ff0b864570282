//! Todo ビューセット
//!
//! 標準の CRUD アクションと、スロットル確認用のカスタムアクション
//! `example_adhoc_method` を提供する。各ルートは末尾スラッシュの有無どちらでも受け付ける。

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use domain::{Todo, TodoId};
use serde_json::{json, Value};
use tracing::info;

use crate::error::ApiError;
use crate::serializer::parse_changes;
use crate::state::AppState;

pub const ADHOC_STATUS: &str = "request was permitted";

/// ビューセットのルート（スロットルは呼び出し側でレイヤーとして掛ける）
pub fn routes() -> Router<AppState> {
    let collection = get(list).post(create);
    let detail = get(retrieve)
        .put(update)
        .patch(partial_update)
        .delete(destroy);
    let adhoc = post(example_adhoc_method);

    Router::new()
        .route("/todos", collection.clone())
        .route("/todos/", collection)
        .route("/todos/:id", detail.clone())
        .route("/todos/:id/", detail)
        .route("/todos/:id/example_adhoc_method", adhoc.clone())
        .route("/todos/:id/example_adhoc_method/", adhoc)
}

async fn load(state: &AppState, id: &str) -> Result<Todo, ApiError> {
    let id: TodoId = id.parse()?;
    state.repo.get(&id).await?.ok_or(ApiError::NotFound)
}

async fn list(State(state): State<AppState>) -> Result<Json<Vec<Todo>>, ApiError> {
    let todos = state.repo.list().await?;
    Ok(Json(todos))
}

async fn create(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<Todo>), ApiError> {
    let changes = parse_changes(&body, false)?;
    let todo = Todo::create(changes, state.clock.now())?;

    state.repo.insert(&todo).await?;
    info!(todo_id = %todo.id, "Todo作成");

    Ok((StatusCode::CREATED, Json(todo)))
}

async fn retrieve(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Todo>, ApiError> {
    Ok(Json(load(&state, &id).await?))
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Todo>, ApiError> {
    save_changes(&state, &id, &body, false).await
}

async fn partial_update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Todo>, ApiError> {
    save_changes(&state, &id, &body, true).await
}

/// PUT と PATCH の違いは title を必須とするかどうかのみ
async fn save_changes(
    state: &AppState,
    id: &str,
    body: &[u8],
    partial: bool,
) -> Result<Json<Todo>, ApiError> {
    let mut todo = load(state, id).await?;
    let changes = parse_changes(body, partial)?;

    todo.apply(changes, state.clock.now())?;
    state.repo.update(&todo).await?;
    info!(todo_id = %todo.id, partial, "Todo更新");

    Ok(Json(todo))
}

async fn destroy(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id: TodoId = id.parse()?;

    if !state.repo.delete(&id).await? {
        return Err(ApiError::NotFound);
    }
    info!(todo_id = %id, "Todo削除");

    Ok(StatusCode::NO_CONTENT)
}

/// 対象インスタンスもリクエストボディも参照せず、固定のペイロードを返す
async fn example_adhoc_method(Path(_id): Path<String>) -> impl IntoResponse {
    Json::<Value>(json!({ "status": ADHOC_STATUS }))
}
