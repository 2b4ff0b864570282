//! スロットル履歴の定期掃除
//!
//! `tokio::time::interval` で一定間隔ごとに期限切れのキーを削除する。
//! 返された JoinHandle を abort すると停止する。

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::throttle::UserRateThrottle;

pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

pub fn spawn_sweeper(throttle: Arc<UserRateThrottle>, every: Duration) -> JoinHandle<()> {
    tracing::info!(interval_secs = every.as_secs(), "スロットル掃除タスク開始");

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            let purged = throttle.purge_expired();
            if purged > 0 {
                tracing::debug!(purged, "期限切れのスロットル履歴を削除");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::throttle::{InMemoryThrottleStore, Rate, ThrottleStore};
    use chrono::{TimeZone, Utc};

    #[tokio::test]
    async fn test_sweeper_purges_expired_keys() {
        // Arrange
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ));
        let store = Arc::new(InMemoryThrottleStore::new());
        let throttle = Arc::new(UserRateThrottle::new(
            Some(Rate::new(5, Duration::from_secs(1))),
            store.clone(),
            clock.clone(),
        ));
        throttle.allow_request("user-1");
        assert_eq!(store.tracked_keys(), 1);

        // Act
        clock.advance(chrono::Duration::seconds(5));
        let handle = spawn_sweeper(throttle, Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(100)).await;

        // Assert
        assert_eq!(store.tracked_keys(), 0);
        assert_eq!(store.purge_expired(clock.now().timestamp_millis()), 0);
        handle.abort();
    }
}
