//! 各クレートで共有する設定・認証・ログ初期化
pub mod auth;
pub mod config;
pub mod tracing;

pub use auth::{issue_token, AuthError, Claims, JwtVerifier, UserId};
pub use config::{Config, ConfigError, LogFormat, StorageBackend};
pub use tracing::init_tracing;
