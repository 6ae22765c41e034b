//! Fixed-interval status polling.
//!
//! Both the payment-status and join-approval flows wait on the server by
//! re-asking at a fixed interval. A failed tick is a soft error: it is logged
//! and the next tick tries again. An optional attempt cap turns exhaustion
//! into [`AnosunuError::Timeout`].

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::error::{AnosunuError, Result};

/// Consecutive failed ticks after which logging escalates to `error!`.
const FAILURE_ESCALATION: u32 = 5;

/// Outcome of one poll tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollStep<T> {
    /// Not terminal yet; ask again next tick.
    Pending,
    /// Terminal value; polling stops.
    Done(T),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    /// `None` polls until the future is dropped or the handle cancelled.
    pub max_attempts: Option<u32>,
}

impl PollConfig {
    pub fn new(interval: Duration, max_attempts: Option<u32>) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }
}

/// Call `tick` once per interval until it yields [`PollStep::Done`].
///
/// The first call happens one full interval after start, matching a timer
/// armed when the waiting screen opens. `tick` receives the 1-based attempt
/// number. Errors from `tick` count as attempts.
pub async fn poll_until<T, F, Fut>(label: &'static str, config: PollConfig, mut tick: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<PollStep<T>>>,
{
    let mut ticker = tokio::time::interval(config.interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // interval() yields immediately once; swallow it so the first poll waits.
    ticker.tick().await;

    let mut attempts: u32 = 0;
    let mut consecutive_failures: u32 = 0;

    loop {
        if let Some(max) = config.max_attempts {
            if attempts >= max {
                warn!(label, attempts, "poll gave up without a final status");
                return Err(AnosunuError::Timeout { attempts });
            }
        }

        ticker.tick().await;
        attempts = attempts.saturating_add(1);

        match tick(attempts).await {
            Ok(PollStep::Done(value)) => {
                debug!(label, attempts, "poll reached final status");
                return Ok(value);
            }
            Ok(PollStep::Pending) => {
                consecutive_failures = 0;
                debug!(label, attempts, "still pending");
            }
            Err(e) => {
                consecutive_failures = consecutive_failures.saturating_add(1);
                if consecutive_failures >= FAILURE_ESCALATION {
                    error!(
                        label,
                        error = %e,
                        attempts,
                        consecutive_failures,
                        "poll failed repeatedly, will retry next tick"
                    );
                } else {
                    warn!(label, error = %e, attempts, "poll failed, will retry next tick");
                }
            }
        }
    }
}

/// A spawned poll task that is aborted when the handle is dropped.
///
/// Holding the handle is what keeps the poll alive; leaving a screen drops
/// it and no stale callback can fire afterwards. Requests already in flight
/// are not cancelled, their results are just discarded.
#[derive(Debug)]
pub struct PollHandle<T> {
    task: Option<JoinHandle<T>>,
}

impl<T: Send + 'static> PollHandle<T> {
    pub fn spawn<F>(fut: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        Self {
            task: Some(tokio::spawn(fut)),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Stop polling now.
    pub fn cancel(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Wait for the poll to finish. `None` if the task was aborted or panicked.
    pub async fn wait(mut self) -> Option<T> {
        let task = self.task.take()?;
        task.await.ok()
    }
}

impl<T> Drop for PollHandle<T> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    fn cfg(secs: u64, max: Option<u32>) -> PollConfig {
        PollConfig::new(Duration::from_secs(secs), max)
    }

    #[tokio::test(start_paused = true)]
    async fn returns_value_on_done() {
        let start = Instant::now();
        let out = poll_until("t", cfg(10, None), |n| async move {
            if n == 3 {
                Ok(PollStep::Done("ok"))
            } else {
                Ok(PollStep::Pending)
            }
        })
        .await
        .unwrap();
        assert_eq!(out, "ok");
        assert_eq!(start.elapsed(), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_waits_one_interval() {
        let start = Instant::now();
        poll_until("t", cfg(3, None), |_| async { Ok(PollStep::Done(())) })
            .await
            .unwrap();
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn pending_until_first_interval() {
        let mut fut = tokio_test::task::spawn(poll_until("t", cfg(5, None), |_| async {
            Ok(PollStep::Done(7))
        }));
        tokio_test::assert_pending!(fut.poll());
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(tokio_test::assert_ready!(fut.poll()).unwrap(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_after_exact_max_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let err = poll_until("t", cfg(3, Some(60)), move |_| {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(PollStep::<()>::Pending)
            }
        })
        .await
        .unwrap_err();
        assert!(matches!(err, AnosunuError::Timeout { attempts: 60 }));
        assert_eq!(calls.load(Ordering::SeqCst), 60);
    }

    #[tokio::test(start_paused = true)]
    async fn errors_are_soft_and_count_as_attempts() {
        let out = poll_until("t", cfg(1, Some(5)), |n| async move {
            if n < 4 {
                Err(AnosunuError::Connect {
                    url: "x".into(),
                    detail: "refused".into(),
                })
            } else {
                Ok(PollStep::Done(n))
            }
        })
        .await
        .unwrap();
        assert_eq!(out, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn errors_exhaust_cap() {
        let err = poll_until("t", cfg(1, Some(2)), |_| async {
            Err::<PollStep<()>, _>(AnosunuError::InvalidState("boom"))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, AnosunuError::Timeout { attempts: 2 }));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_cap_times_out_without_calling() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let err = poll_until("t", cfg(1, Some(0)), move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            async { Ok(PollStep::<()>::Pending) }
        })
        .await
        .unwrap_err();
        assert!(matches!(err, AnosunuError::Timeout { attempts: 0 }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn handle_wait_returns_result() {
        let handle = PollHandle::spawn(async {
            poll_until("t", cfg(1, None), |n| async move {
                Ok(if n == 2 { PollStep::Done(n) } else { PollStep::Pending })
            })
            .await
        });
        assert_eq!(handle.wait().await.unwrap().unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_handle_stops_polling() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let handle = PollHandle::spawn(async move {
            poll_until("t", cfg(1, None), move |_| {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok(PollStep::<()>::Pending)
                }
            })
            .await
        });
        tokio::time::sleep(Duration::from_millis(3500)).await;
        drop(handle);
        let seen = calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(calls.load(Ordering::SeqCst), seen);
        assert_eq!(seen, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_marks_finished() {
        let handle = PollHandle::spawn(async {
            tokio::time::sleep(Duration::from_secs(100)).await;
        });
        assert!(!handle.is_finished());
        handle.cancel();
    }
}
