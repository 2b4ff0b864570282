use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

/// 履歴ストアへの記録結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitOutcome {
    Recorded,
    Rejected {
        /// 窓内で最も古いリクエスト時刻（履歴が空なら None）
        oldest_ms: Option<i64>,
        in_window: usize,
    },
}

/// スロットル用のリクエスト履歴ストア
///
/// `hit` は「窓外の履歴を捨てる → 上限判定 → 記録」を1キーについて不可分に行う。
pub trait ThrottleStore: Send + Sync {
    fn hit(&self, key: &str, now_ms: i64, window_ms: i64, limit: u32) -> HitOutcome;

    /// 期限切れのキーを削除し、削除件数を返す
    fn purge_expired(&self, now_ms: i64) -> usize;
}

#[derive(Debug, Default)]
struct History {
    /// 新しい順
    timestamps: VecDeque<i64>,
    expires_at_ms: i64,
}

#[derive(Debug, Default)]
pub struct InMemoryThrottleStore {
    entries: Mutex<HashMap<String, History>>,
}

impl InMemoryThrottleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tracked_keys(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl ThrottleStore for InMemoryThrottleStore {
    fn hit(&self, key: &str, now_ms: i64, window_ms: i64, limit: u32) -> HitOutcome {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let history = entries.entry(key.to_string()).or_default();

        let cutoff = now_ms - window_ms;
        while history.timestamps.back().is_some_and(|&t| t <= cutoff) {
            history.timestamps.pop_back();
        }

        if history.timestamps.len() >= limit as usize {
            return HitOutcome::Rejected {
                oldest_ms: history.timestamps.back().copied(),
                in_window: history.timestamps.len(),
            };
        }

        history.timestamps.push_front(now_ms);
        history.expires_at_ms = now_ms + window_ms;
        HitOutcome::Recorded
    }

    fn purge_expired(&self, now_ms: i64) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, history| history.expires_at_ms > now_ms);
        before - entries.len()
    }
}
