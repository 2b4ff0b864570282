use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use tracing::warn;

use crate::error::ApiError;
use crate::extract::Requester;
use crate::state::AppState;
use crate::throttle::ThrottleDecision;

/// 認証 → スロットル判定の順で処理し、許可された場合のみハンドラーへ渡す
///
/// ビューセット全体とカスタムアクションは同じ `user` スコープを共有するため、
/// 1リクエストにつき1回だけ記録する。
pub async fn throttle_requests(
    State(state): State<AppState>,
    requester: Requester,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    match state.throttle.allow_request(requester.throttle_ident()) {
        ThrottleDecision::Allowed => Ok(next.run(request).await),
        ThrottleDecision::Throttled { wait } => {
            warn!(
                ident = requester.throttle_ident(),
                path = %request.uri().path(),
                wait_secs = wait.map(|w| w.as_secs_f64()),
                "リクエストをスロットル"
            );
            Err(ApiError::Throttled { wait })
        }
    }
}
