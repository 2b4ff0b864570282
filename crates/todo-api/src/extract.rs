use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use shared::UserId;
use std::net::SocketAddr;

use crate::error::ApiError;
use crate::state::AppState;
use crate::throttle::client_ident;

/// リクエストの送信者
///
/// Authorization ヘッダが無ければ匿名として扱い、クライアントIPで識別する。
/// ヘッダがあるのに検証できない場合は 401 を返す。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requester {
    User(UserId),
    Anonymous { ident: String },
}

impl Requester {
    /// スロットルのキーに使う識別子
    pub fn throttle_ident(&self) -> &str {
        match self {
            Requester::User(user_id) => user_id.as_str(),
            Requester::Anonymous { ident } => ident,
        }
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for Requester {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(header) = parts.headers.get(AUTHORIZATION) else {
            return Ok(anonymous(parts, state));
        };

        let token = header
            .to_str()
            .ok()
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                ApiError::Unauthorized(
                    "Invalid Authorization format. Expected: Bearer <token>".into(),
                )
            })?;

        let verifier = state.auth.as_ref().ok_or_else(|| {
            ApiError::Unauthorized("Token authentication is not configured".into())
        })?;

        let claims = verifier.verify(token).map_err(|e| {
            tracing::debug!(error = %e, "トークン検証失敗");
            ApiError::Unauthorized("Invalid or expired token".into())
        })?;

        Ok(Requester::User(UserId::from_string(claims.sub)))
    }
}

fn anonymous(parts: &Parts, state: &AppState) -> Requester {
    let forwarded_for = parts
        .headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok());
    let remote_addr = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string());

    Requester::Anonymous {
        ident: client_ident(
            forwarded_for,
            remote_addr.as_deref(),
            state.throttle.num_proxies(),
        ),
    }
}
