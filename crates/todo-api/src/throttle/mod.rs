//! ユーザー単位のレート制限
//!
//! 認証済みならユーザーID、匿名ならクライアントIPをキーに、
//! 直近 `duration` 内のリクエスト時刻履歴でスライディングウィンドウ判定を行う。

pub mod ident;
pub mod rate;
pub mod store;

pub use ident::client_ident;
pub use rate::{Rate, RateParseError};
pub use store::{HitOutcome, InMemoryThrottleStore, ThrottleStore};

use crate::clock::Clock;
use std::sync::Arc;
use std::time::Duration;

/// ビューセット全体とカスタムアクションが共有するスコープ
pub const USER_SCOPE: &str = "user";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThrottleDecision {
    Allowed,
    /// wait は次に許可されるまでの推定待ち時間（算出できない場合 None）
    Throttled { wait: Option<Duration> },
}

pub struct UserRateThrottle {
    rate: Option<Rate>,
    num_proxies: Option<usize>,
    store: Arc<dyn ThrottleStore>,
    clock: Arc<dyn Clock>,
}

impl UserRateThrottle {
    /// rate が None の場合はすべて許可する
    pub fn new(rate: Option<Rate>, store: Arc<dyn ThrottleStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            rate,
            num_proxies: None,
            store,
            clock,
        }
    }

    pub fn with_num_proxies(mut self, num_proxies: Option<usize>) -> Self {
        self.num_proxies = num_proxies;
        self
    }

    pub fn rate(&self) -> Option<Rate> {
        self.rate
    }

    pub fn num_proxies(&self) -> Option<usize> {
        self.num_proxies
    }

    pub fn cache_key(ident: &str) -> String {
        format!("throttle_{USER_SCOPE}_{ident}")
    }

    pub fn allow_request(&self, ident: &str) -> ThrottleDecision {
        let Some(rate) = self.rate else {
            return ThrottleDecision::Allowed;
        };

        let now_ms = self.clock.now().timestamp_millis();
        match self.store.hit(
            &Self::cache_key(ident),
            now_ms,
            rate.window_ms(),
            rate.num_requests,
        ) {
            HitOutcome::Recorded => ThrottleDecision::Allowed,
            HitOutcome::Rejected {
                oldest_ms,
                in_window,
            } => ThrottleDecision::Throttled {
                wait: wait_for(rate, now_ms, oldest_ms, in_window),
            },
        }
    }

    /// 期限切れの履歴を掃除する
    pub fn purge_expired(&self) -> usize {
        self.store.purge_expired(self.clock.now().timestamp_millis())
    }
}

/// 残り時間を空き枠数で割った値を待ち時間とする
fn wait_for(rate: Rate, now_ms: i64, oldest_ms: Option<i64>, in_window: usize) -> Option<Duration> {
    let remaining_ms = match oldest_ms {
        Some(oldest) => rate.window_ms() - (now_ms - oldest),
        None => rate.window_ms(),
    };

    let available = i64::from(rate.num_requests) - in_window as i64 + 1;
    if available <= 0 {
        return None;
    }

    let wait_secs = remaining_ms.max(0) as f64 / 1000.0 / available as f64;
    Some(Duration::from_secs_f64(wait_secs))
}

/// Retry-After ヘッダ用に切り上げた秒数
pub fn retry_after_secs(wait: Duration) -> u64 {
    wait.as_secs_f64().ceil() as u64
}
