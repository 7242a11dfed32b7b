use std::future::Future;
use std::time::Duration;

/// 指數退避的上限
pub const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// 單次嘗試的結果，決定重試迴圈下一步
#[derive(Debug)]
pub enum Step<T, E> {
    /// 成功，結束迴圈
    Done(T),
    /// 不可重試的錯誤，立即結束
    Fatal(E),
    /// 暫時性錯誤：消耗一次嘗試並等待退避時間
    Backoff(String),
    /// 已修正狀態（例如刷新 token）：消耗一次嘗試但不等待
    Repeat(String),
}

#[derive(Debug, PartialEq, Eq)]
pub enum RetryError<E> {
    Fatal(E),
    Exhausted { attempts: u32, last: String },
}

/// 認證與送出共用的重試政策：delay = min(base * 2^attempt, 30s)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay: MAX_BACKOFF,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        // 2^31 以上必定超過上限，避免乘法溢位
        let multiplier = 1u32.checked_shl(attempt.min(31)).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(multiplier)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// 依序執行 `op`，直到成功、致命錯誤或嘗試次數用盡。
    ///
    /// `op` 收到的是從 0 開始的嘗試索引。最後一次失敗後不再等待。
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut op: F) -> Result<T, RetryError<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Step<T, E>>,
    {
        let mut last = String::from("no attempts made");

        for attempt in 0..self.max_attempts {
            match op(attempt).await {
                Step::Done(value) => return Ok(value),
                Step::Fatal(err) => return Err(RetryError::Fatal(err)),
                Step::Repeat(reason) => {
                    tracing::debug!("🔁 {} attempt {} repeating: {}", label, attempt + 1, reason);
                    last = reason;
                }
                Step::Backoff(reason) => {
                    if attempt + 1 < self.max_attempts {
                        let delay = self.delay_for(attempt);
                        tracing::warn!(
                            "⚠️ {} attempt {}/{} failed ({}), retrying in {:?}",
                            label,
                            attempt + 1,
                            self.max_attempts,
                            reason,
                            delay
                        );
                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }
                    }
                    last = reason;
                }
            }
        }

        Err(RetryError::Exhausted {
            attempts: self.max_attempts,
            last,
        })
    }
}
