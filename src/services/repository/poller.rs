use std::future::Future;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::errors::{DataPrepError, Result};
use super::config::{PollConfig, TimeoutPolicy};

/// State the poller waits for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Awaited {
    Created,
    Deleted,
}

impl Awaited {
    fn is_reached(self, exists: bool) -> bool {
        match self {
            Awaited::Created => exists,
            Awaited::Deleted => !exists,
        }
    }
}

/// How a poll ended. `attempts` counts existence queries issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Confirmed { attempts: u32 },
    TimedOut { attempts: u32 },
}

impl PollOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, PollOutcome::Confirmed { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            PollOutcome::Confirmed { attempts } | PollOutcome::TimedOut { attempts } => *attempts,
        }
    }
}

/// Bounded wait for a path to appear or disappear
#[derive(Debug, Clone)]
pub struct ExistencePoller {
    config: PollConfig,
}

impl ExistencePoller {
    pub fn new(config: PollConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Default budget for `awaited`
    pub fn budget_for(&self, awaited: Awaited) -> u32 {
        match awaited {
            Awaited::Created => self.config.creation_attempts,
            Awaited::Deleted => self.config.deletion_attempts,
        }
    }

    /// Queries `check` until it reports the awaited state or `max_attempts`
    /// queries have been made, sleeping one interval between queries.
    ///
    /// A check error ends the poll immediately. Running out of attempts is
    /// `TimedOut` under `TimeoutPolicy::BestEffort` and `PollTimedOut` under
    /// `TimeoutPolicy::Fail`.
    pub async fn wait_for<F, Fut>(
        &self,
        path: &str,
        awaited: Awaited,
        max_attempts: u32,
        mut check: F,
    ) -> Result<PollOutcome>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<bool>>,
    {
        let mut attempts = 0;

        while attempts < max_attempts {
            if attempts > 0 {
                sleep(self.config.interval).await;
            }
            attempts += 1;

            let exists = check().await?;
            if awaited.is_reached(exists) {
                debug!("{:?} state of '{}' confirmed after {} attempts", awaited, path, attempts);
                return Ok(PollOutcome::Confirmed { attempts });
            }
        }

        match self.config.on_timeout {
            TimeoutPolicy::BestEffort => {
                warn!(
                    "⚠️ Gave up waiting for '{}' to be {:?} after {} attempts, continuing",
                    path, awaited, attempts
                );
                Ok(PollOutcome::TimedOut { attempts })
            }
            TimeoutPolicy::Fail => Err(DataPrepError::PollTimedOut {
                path: path.to_string(),
                attempts,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn fast_config(policy: TimeoutPolicy) -> PollConfig {
        PollConfig {
            creation_attempts: 15,
            deletion_attempts: 4,
            interval: Duration::ZERO,
            on_timeout: policy,
        }
    }

    #[tokio::test]
    async fn test_times_out_after_exactly_the_budget() {
        let poller = ExistencePoller::new(fast_config(TimeoutPolicy::BestEffort));
        let calls = AtomicU32::new(0);

        let outcome = poller
            .wait_for("/never/gone", Awaited::Deleted, 7, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(true) }
            })
            .await
            .unwrap();

        assert_eq!(outcome, PollOutcome::TimedOut { attempts: 7 });
        assert_eq!(calls.load(Ordering::SeqCst), 7);
    }

    #[tokio::test]
    async fn test_confirms_as_soon_as_state_is_reached() {
        let poller = ExistencePoller::new(fast_config(TimeoutPolicy::BestEffort));
        let calls = AtomicU32::new(0);

        let outcome = poller
            .wait_for("/appears", Awaited::Created, 15, || {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move { Ok(n >= 3) }
            })
            .await
            .unwrap();

        assert_eq!(outcome, PollOutcome::Confirmed { attempts: 3 });
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_strict_policy_fails_on_timeout() {
        let poller = ExistencePoller::new(fast_config(TimeoutPolicy::Fail));

        let err = poller
            .wait_for("/stuck", Awaited::Created, 2, || async { Ok(false) })
            .await
            .unwrap_err();

        match err {
            DataPrepError::PollTimedOut { path, attempts } => {
                assert_eq!(path, "/stuck");
                assert_eq!(attempts, 2);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_check_error_stops_polling() {
        let poller = ExistencePoller::new(fast_config(TimeoutPolicy::BestEffort));
        let calls = AtomicU32::new(0);

        let result = poller
            .wait_for("/broken", Awaited::Created, 10, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(DataPrepError::binding("connection reset")) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_budget_times_out_without_querying() {
        let poller = ExistencePoller::new(fast_config(TimeoutPolicy::BestEffort));
        let outcome = poller
            .wait_for("/x", Awaited::Created, 0, || async { Ok(true) })
            .await
            .unwrap();
        assert_eq!(outcome, PollOutcome::TimedOut { attempts: 0 });
    }

    #[test]
    fn test_budget_for() {
        let poller = ExistencePoller::new(fast_config(TimeoutPolicy::BestEffort));
        assert_eq!(poller.budget_for(Awaited::Created), 15);
        assert_eq!(poller.budget_for(Awaited::Deleted), 4);
    }
}
