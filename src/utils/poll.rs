// src/utils/poll.rs - Bounded polling of asynchronous jobs
use anyhow::{anyhow, Result};
use log::debug;
use std::future::Future;
use std::time::Duration;

use super::cancel::CancelToken;

/// What one status check observed.
#[derive(Debug, Clone, PartialEq)]
pub enum PollStatus<T> {
    Ready(T),
    Pending,
    Failed(String),
}

/// Polling schedule: a fixed interval and a bounded number of checks.
#[derive(Debug, Clone, Copy)]
pub struct PollSchedule {
    pub interval: Duration,
    pub max_attempts: u32,
}

/// Calls `check` until it reports `Ready` or `Failed`, sleeping `interval` between checks.
///
/// Exhausting `max_attempts` is an error whose message says "timed out", so it classifies as
/// a timeout upstream. A cancelled token stops polling before the next check.
pub async fn poll_with_timeout<T, F, Fut>(
    label: &str,
    schedule: PollSchedule,
    cancel: &CancelToken,
    mut check: F,
) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<PollStatus<T>>>,
{
    for attempt in 1..=schedule.max_attempts {
        if cancel.is_cancelled() {
            return Err(anyhow!("{}: polling cancelled", label));
        }
        match check(attempt).await? {
            PollStatus::Ready(value) => {
                debug!("{}: ready after {} checks", label, attempt);
                return Ok(value);
            }
            PollStatus::Failed(reason) => {
                return Err(anyhow!("{}: job failed: {}", label, reason));
            }
            PollStatus::Pending => {
                debug!("{}: pending (check {}/{})", label, attempt, schedule.max_attempts);
            }
        }
        if attempt < schedule.max_attempts {
            tokio::time::sleep(schedule.interval).await;
        }
    }
    Err(anyhow!(
        "{}: polling timed out after {} checks",
        label,
        schedule.max_attempts
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast(max_attempts: u32) -> PollSchedule {
        PollSchedule {
            interval: Duration::from_millis(1),
            max_attempts,
        }
    }

    #[tokio::test]
    async fn test_ready_after_pending() {
        let result = poll_with_timeout("job", fast(5), &CancelToken::new(), |attempt| async move {
            Ok(if attempt < 3 {
                PollStatus::Pending
            } else {
                PollStatus::Ready(attempt)
            })
        })
        .await
        .unwrap();
        assert_eq!(result, 3);
    }

    #[tokio::test]
    async fn test_exhaustion_reports_timeout() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let err = poll_with_timeout::<(), _, _>("job", fast(4), &CancelToken::new(), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(PollStatus::Pending) }
        })
        .await
        .unwrap_err();
        assert!(err.to_string().contains("timed out"));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_failed_job_and_cancellation() {
        let err = poll_with_timeout::<(), _, _>("job", fast(4), &CancelToken::new(), |_| async {
            Ok(PollStatus::Failed("ABORTED".to_string()))
        })
        .await
        .unwrap_err();
        assert!(err.to_string().contains("ABORTED"));

        let token = CancelToken::new();
        token.cancel();
        let err = poll_with_timeout::<(), _, _>("job", fast(4), &token, |_| async {
            Ok(PollStatus::Pending)
        })
        .await
        .unwrap_err();
        assert!(err.to_string().contains("cancelled"));
    }
}
