//! Catalog crawler trigger.
//!
//! After a run writes new tables, the downstream metadata catalog has to be
//! refreshed by starting a named crawler job. The job may already be
//! running (a previous run, a schedule), in which case we wait a fixed delay
//! and look again, a bounded number of times.

#[cfg(feature = "aws")]
mod glue;

#[cfg(feature = "aws")]
pub use glue::GlueCrawlerService;

use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Observed state of a catalog job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Not running; a start request is allowed.
    Idle,
    Running,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum JobServiceError {
    /// The job does not exist. The trigger treats this as idle.
    #[error("Catalog job not found: {0}")]
    NotFound(String),

    /// Status lookup failed for any other reason (network, auth, throttling).
    #[error("Catalog job status lookup failed: {0}")]
    Lookup(String),

    #[error("Catalog job start failed: {0}")]
    Start(String),
}

/// Whatever the service returned when accepting a start request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartConfirmation {
    pub job_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Status and start operations of the catalog job service.
pub trait CatalogJobService {
    fn get_status(&self, job_name: &str) -> Result<JobState, JobServiceError>;

    fn start(&self, job_name: &str) -> Result<StartConfirmation, JobServiceError>;
}

/// Bounded, constant-delay polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(10),
        }
    }
}

/// Result of a trigger call that did not error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    Started(StartConfirmation),
    /// Every attempt found the job running (or there were no attempts).
    NotStarted { attempts: u32 },
}

impl TriggerOutcome {
    pub fn is_started(&self) -> bool {
        matches!(self, TriggerOutcome::Started(_))
    }
}

/// Starts a catalog job unless it is already running, retrying on a fixed
/// delay. Calls block the current thread.
pub struct CrawlerTrigger<'a> {
    service: &'a dyn CatalogJobService,
    policy: RetryPolicy,
    sleep: Box<dyn Fn(Duration) + 'a>,
}

impl<'a> CrawlerTrigger<'a> {
    pub fn new(service: &'a dyn CatalogJobService, policy: RetryPolicy) -> Self {
        Self {
            service,
            policy,
            sleep: Box::new(std::thread::sleep),
        }
    }

    /// Replace the wait primitive.
    pub fn with_sleep(mut self, sleep: impl Fn(Duration) + 'a) -> Self {
        self.sleep = Box::new(sleep);
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Status of `job_name`, with "not found" folded into `Idle`.
    fn observe(&self, job_name: &str) -> Result<JobState, JobServiceError> {
        match self.service.get_status(job_name) {
            Err(JobServiceError::NotFound(_)) => {
                debug!(job_name, "Catalog job not found, treating as idle");
                Ok(JobState::Idle)
            }
            other => other,
        }
    }

    /// Start `job_name` if it is idle, otherwise wait and re-check, up to
    /// `max_attempts` status checks.
    ///
    /// Lookup failures other than "not found" and start failures are
    /// returned as errors; running out of attempts is not an error.
    pub fn start_with_retry(&self, job_name: &str) -> Result<TriggerOutcome, JobServiceError> {
        let RetryPolicy {
            max_attempts,
            delay,
        } = self.policy;

        for attempt in 1..=max_attempts {
            match self.observe(job_name)? {
                JobState::Idle => {
                    let confirmation = self.service.start(job_name)?;
                    let detail = serde_json::to_string(&confirmation)
                        .unwrap_or_else(|_| confirmation.job_name.clone());
                    info!("Crawler started: {}", detail);
                    return Ok(TriggerOutcome::Started(confirmation));
                }
                JobState::Running => {
                    info!(
                        "Crawler {} is already running, retrying... ({}/{})",
                        job_name, attempt, max_attempts
                    );
                    (self.sleep)(delay);
                }
            }
        }

        warn!(
            "Failed to start crawler {} after {} attempts",
            job_name, max_attempts
        );
        Ok(TriggerOutcome::NotStarted {
            attempts: max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ScriptedJobService;
    use std::cell::RefCell;

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            delay: Duration::ZERO,
        }
    }

    #[test]
    fn test_always_running_exhausts_attempts() {
        let service = ScriptedJobService::always(Ok(JobState::Running));
        let outcome = CrawlerTrigger::new(&service, policy(3))
            .start_with_retry("crawler")
            .unwrap();

        assert_eq!(outcome, TriggerOutcome::NotStarted { attempts: 3 });
        assert_eq!(service.status_calls(), 3);
        assert_eq!(service.start_calls(), 0);
    }

    #[test]
    fn test_not_found_starts_immediately() {
        let service = ScriptedJobService::always(Err(JobServiceError::NotFound("crawler".into())));
        let outcome = CrawlerTrigger::new(&service, policy(3))
            .start_with_retry("crawler")
            .unwrap();

        assert!(outcome.is_started());
        assert_eq!(service.status_calls(), 1);
        assert_eq!(service.start_calls(), 1);
    }

    #[test]
    fn test_zero_attempts_never_polls() {
        let service = ScriptedJobService::always(Ok(JobState::Idle));
        let outcome = CrawlerTrigger::new(&service, policy(0))
            .start_with_retry("crawler")
            .unwrap();

        assert_eq!(outcome, TriggerOutcome::NotStarted { attempts: 0 });
        assert_eq!(service.status_calls(), 0);
        assert_eq!(service.start_calls(), 0);
    }

    #[test]
    fn test_starts_once_job_goes_idle() {
        let service = ScriptedJobService::scripted(vec![
            Ok(JobState::Running),
            Ok(JobState::Running),
            Ok(JobState::Idle),
        ]);
        let waits = RefCell::new(Vec::new());
        let policy = RetryPolicy {
            max_attempts: 5,
            delay: Duration::from_millis(250),
        };

        let outcome = CrawlerTrigger::new(&service, policy)
            .with_sleep(|d| waits.borrow_mut().push(d))
            .start_with_retry("crawler")
            .unwrap();

        assert_eq!(
            outcome,
            TriggerOutcome::Started(StartConfirmation {
                job_name: "crawler".to_string(),
                request_id: None,
            })
        );
        assert_eq!(service.status_calls(), 3);
        assert_eq!(service.start_calls(), 1);
        // Constant delay, one wait per running observation
        assert_eq!(*waits.borrow(), vec![Duration::from_millis(250); 2]);
    }

    #[test]
    fn test_lookup_error_propagates() {
        let service = ScriptedJobService::scripted(vec![
            Ok(JobState::Running),
            Err(JobServiceError::Lookup("access denied".into())),
        ]);
        let err = CrawlerTrigger::new(&service, policy(3))
            .start_with_retry("crawler")
            .unwrap_err();

        assert!(matches!(err, JobServiceError::Lookup(_)));
        assert_eq!(service.status_calls(), 2);
        assert_eq!(service.start_calls(), 0);
    }

    #[test]
    fn test_start_error_propagates() {
        let service = ScriptedJobService::always(Ok(JobState::Idle)).failing_start();
        let err = CrawlerTrigger::new(&service, policy(3))
            .start_with_retry("crawler")
            .unwrap_err();

        assert!(matches!(err, JobServiceError::Start(_)));
        assert_eq!(service.start_calls(), 1);
    }
}
