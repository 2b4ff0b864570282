use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RateParseError {
    #[error("rate must look like '<num>/<period>', got {0:?}")]
    Format(String),

    #[error("invalid request count in rate {0:?}")]
    Count(String),

    #[error("unknown period in rate {0:?} (expected s, m, h or d)")]
    Period(String),
}

/// 期間あたりの許可リクエスト数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rate {
    pub num_requests: u32,
    pub duration: Duration,
}

impl Rate {
    pub fn new(num_requests: u32, duration: Duration) -> Self {
        Self {
            num_requests,
            duration,
        }
    }

    pub fn window_ms(&self) -> i64 {
        i64::try_from(self.duration.as_millis()).unwrap_or(i64::MAX)
    }
}

impl FromStr for Rate {
    type Err = RateParseError;

    /// `"100/day"` や `"5/m"` を解釈する。期間は先頭1文字のみを見る。
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (num, period) = s
            .split_once('/')
            .ok_or_else(|| RateParseError::Format(s.to_string()))?;

        let num_requests = num
            .trim()
            .parse::<u32>()
            .map_err(|_| RateParseError::Count(s.to_string()))?;

        let seconds = match period.trim().chars().next() {
            Some('s') => 1,
            Some('m') => 60,
            Some('h') => 60 * 60,
            Some('d') => 24 * 60 * 60,
            _ => return Err(RateParseError::Period(s.to_string())),
        };

        Ok(Self::new(num_requests, Duration::from_secs(seconds)))
    }
}
