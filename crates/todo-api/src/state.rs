use infrastructure::{InMemoryTodoRepository, TodoRepository};
use shared::{Config, JwtVerifier};
use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::throttle::{InMemoryThrottleStore, Rate, RateParseError, UserRateThrottle};

/// 全ハンドラーで共有するアプリケーション状態
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn TodoRepository>,
    pub throttle: Arc<UserRateThrottle>,
    /// None の場合、Bearer トークン付きのリクエストは 401
    pub auth: Option<Arc<JwtVerifier>>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(
        repo: Arc<dyn TodoRepository>,
        throttle: Arc<UserRateThrottle>,
        auth: Option<Arc<JwtVerifier>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repo,
            throttle,
            auth,
            clock,
        }
    }

    /// 設定からスロットルと認証を組み立てる
    pub fn from_config(
        config: &Config,
        repo: Arc<dyn TodoRepository>,
    ) -> Result<Self, RateParseError> {
        let rate = config
            .throttle_user_rate
            .as_deref()
            .map(str::parse::<Rate>)
            .transpose()?;

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let throttle = UserRateThrottle::new(
            rate,
            Arc::new(InMemoryThrottleStore::new()),
            clock.clone(),
        )
        .with_num_proxies(config.throttle_num_proxies);

        let auth = config
            .jwt_secret
            .as_deref()
            .map(|secret| Arc::new(JwtVerifier::new(secret)));

        Ok(Self::new(repo, Arc::new(throttle), auth, clock))
    }

    /// インメモリのリポジトリとシステム時計で構成する
    pub fn in_memory(rate: Option<Rate>) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let throttle = UserRateThrottle::new(
            rate,
            Arc::new(InMemoryThrottleStore::new()),
            clock.clone(),
        );

        Self::new(
            Arc::new(InMemoryTodoRepository::new()),
            Arc::new(throttle),
            None,
            clock,
        )
    }

    pub fn with_jwt_secret(mut self, secret: &str) -> Self {
        self.auth = Some(Arc::new(JwtVerifier::new(secret)));
        self
    }
}
