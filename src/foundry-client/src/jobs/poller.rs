//! Watches a single job until it reaches a terminal state, a hard error occurs or the
//! completion timeout elapses.
//!
//! The poller owns nothing but its own loop state; it is cancelled by dropping the future
//! returned from [`Poller::poll`], which releases the pending timer (or request) immediately.

use std::time::{Duration, Instant};

use super::{ErrorDetails, Job, JobStatus};
use crate::errors::Error;

/// The capability the poller uses to read a job. Implementations must be safe to call
/// repeatedly; the poller never issues a second read before the previous one resolved.
#[allow(async_fn_in_trait)]
pub trait JobSource {
  /// Fetches the current state of the job.
  async fn fetch_job(&self, job_id: &str) -> Result<Job, Error>;
}

impl<T> JobSource for &T
where
  T: JobSource,
{
  async fn fetch_job(&self, job_id: &str) -> Result<Job, Error> {
    (**self).fetch_job(job_id).await
  }
}

/// Where the poller gets its notion of time from.
#[allow(async_fn_in_trait)]
pub trait Clock {
  /// The current instant.
  fn now(&self) -> Instant;

  /// Suspends the current task; this must never block the executor thread.
  async fn sleep(&self, duration: Duration);
}

/// The wall clock + async-std timers.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> Instant {
    Instant::now()
  }

  async fn sleep(&self, duration: Duration) {
    async_std::task::sleep(duration).await
  }
}

/// The terminal result of one polling session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
  /// The job reached `FINISHED`.
  Completed,
  /// The job reached `FAILED`.
  Failed(ErrorDetails),
  /// The completion timeout elapsed before the job reached a terminal state.
  TimedOut,
}

/// Pacing for the poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
  /// How long to wait between two reads.
  pub interval: Duration,
  /// `None` polls indefinitely.
  pub completion_timeout: Option<Duration>,
}

impl Default for PollSettings {
  fn default() -> Self {
    Self {
      interval: crate::constants::DEFAULT_POLL_INTERVAL,
      completion_timeout: Some(crate::constants::DEFAULT_COMPLETION_TIMEOUT),
    }
  }
}

impl PollSettings {
  /// Builds settings from a completion timeout; a zero duration means "no deadline".
  pub fn with_timeout(completion_timeout: Duration) -> Self {
    Self {
      completion_timeout: Some(completion_timeout).filter(|timeout| !timeout.is_zero()),
      ..Self::default()
    }
  }

  /// Replaces the interval between reads.
  pub fn interval(self, interval: Duration) -> Self {
    Self { interval, ..self }
  }

  /// Builds settings from signed millisecond values, as they arrive from configuration files
  /// and the command line. A negative timeout is rejected, zero means "no deadline".
  pub fn from_millis(interval: i64, completion_timeout: i64) -> Result<Self, Error> {
    if interval <= 0 {
      return Err(Error::invalid_argument(format!(
        "poll interval must be positive, got {interval}ms"
      )));
    }

    if completion_timeout < 0 {
      return Err(Error::invalid_argument(format!(
        "completion timeout must not be negative, got {completion_timeout}ms"
      )));
    }

    Ok(Self {
      interval: Duration::from_millis(interval as u64),
      completion_timeout: Some(Duration::from_millis(completion_timeout as u64)).filter(|t| !t.is_zero()),
    })
  }
}

/// Polls one job through to a [`PollOutcome`].
#[derive(Debug)]
pub struct Poller<S, C = SystemClock> {
  /// Where jobs are read from.
  source: S,
  /// Where time comes from.
  clock: C,
  /// The job being watched.
  job_id: String,
  /// Interval + deadline.
  settings: PollSettings,
}

impl<S> Poller<S, SystemClock>
where
  S: JobSource,
{
  /// Validates the inputs; nothing is fetched until [`Poller::poll`] is awaited.
  pub fn new<I>(source: S, job_id: I, settings: PollSettings) -> Result<Self, Error>
  where
    I: AsRef<str>,
  {
    let job_id = job_id.as_ref().trim().to_string();

    if job_id.is_empty() {
      return Err(Error::invalid_argument("job id must not be empty"));
    }

    if settings.interval.is_zero() {
      return Err(Error::invalid_argument("poll interval must be positive"));
    }

    Ok(Self {
      source,
      clock: SystemClock,
      job_id,
      settings,
    })
  }
}

impl<S, C> Poller<S, C>
where
  S: JobSource,
  C: Clock,
{
  /// Swaps the clock used for deadlines and sleeping.
  pub fn with_clock<D>(self, clock: D) -> Poller<S, D>
  where
    D: Clock,
  {
    Poller {
      source: self.source,
      clock,
      job_id: self.job_id,
      settings: self.settings,
    }
  }

  /// The id of the job this poller watches.
  pub fn job_id(&self) -> &str {
    &self.job_id
  }

  /// Runs the poll loop.
  pub async fn poll(&self) -> Result<PollOutcome, Error> {
    let started = self.clock.now();
    let deadline = self
      .settings
      .completion_timeout
      .and_then(|timeout| started.checked_add(timeout));

    let mut attempts = 0u32;
    let mut last_status: Option<JobStatus> = None;

    loop {
      if attempts > 0 {
        if let Some(deadline) = deadline {
          if self.clock.now() >= deadline {
            log::info!(
              "job '{}' timed out after {attempts} attempt(s), last status {last_status:?}",
              self.job_id
            );
            return Ok(PollOutcome::TimedOut);
          }
        }
      }

      attempts += 1;
      log::debug!("fetching job '{}' (attempt {attempts})", self.job_id);

      match self.source.fetch_job(&self.job_id).await {
        Err(error) if error.is_transient() => {
          log::warn!("transient failure reading job '{}' - {error}", self.job_id);
        }
        Err(error) => {
          log::warn!("unable to read job '{}' - {error}", self.job_id);
          return Err(error);
        }
        Ok(job) => match job.status()? {
          JobStatus::Finished => {
            log::info!("job '{}' finished after {attempts} attempt(s)", self.job_id);
            return Ok(PollOutcome::Completed);
          }
          JobStatus::Failed => {
            let details = job.error_details.unwrap_or_default();
            log::info!("job '{}' failed - {details:?}", self.job_id);
            return Ok(PollOutcome::Failed(details));
          }
          status => {
            log::trace!("job '{}' is still '{status}'", self.job_id);
            last_status = Some(status);
          }
        },
      }

      self.clock.sleep(self.settings.interval).await;
    }
  }
}

/// Builds a poller against the system clock and runs it.
pub async fn wait_for_completion<S, I>(source: S, job_id: I, settings: PollSettings) -> Result<PollOutcome, Error>
where
  S: JobSource,
  I: AsRef<str>,
{
  Poller::new(source, job_id, settings)?.poll().await
}

#[cfg(test)]
mod tests {
  use super::{wait_for_completion, Clock, JobSource, PollOutcome, PollSettings, Poller};
  use crate::errors::Error;
  use crate::jobs::{ErrorDetails, Job, JobStatus};
  use std::collections::{HashMap, VecDeque};
  use std::sync::{Arc, Mutex};
  use std::time::{Duration, Instant};

  /// Time only moves when something sleeps.
  #[derive(Clone)]
  struct VirtualClock {
    origin: Instant,
    elapsed: Arc<Mutex<Duration>>,
    sleeps: Arc<Mutex<usize>>,
  }

  impl VirtualClock {
    fn new() -> Self {
      Self {
        origin: Instant::now(),
        elapsed: Arc::new(Mutex::new(Duration::ZERO)),
        sleeps: Arc::new(Mutex::new(0)),
      }
    }

    fn sleeps(&self) -> usize {
      *self.sleeps.lock().expect("lock")
    }
  }

  impl Clock for VirtualClock {
    fn now(&self) -> Instant {
      self.origin + *self.elapsed.lock().expect("lock")
    }

    async fn sleep(&self, duration: Duration) {
      *self.elapsed.lock().expect("lock") += duration;
      *self.sleeps.lock().expect("lock") += 1;
      futures_lite::future::yield_now().await;
    }
  }

  /// Replays scripted responses per job id; once a script runs dry the `fallback` status is
  /// returned forever.
  #[derive(Default)]
  struct Scripted {
    scripts: Mutex<HashMap<String, VecDeque<Result<Job, Error>>>>,
    calls: Mutex<HashMap<String, usize>>,
    fallback: Option<JobStatus>,
  }

  impl Scripted {
    fn script<I>(self, job_id: &str, responses: I) -> Self
    where
      I: IntoIterator<Item = Result<Job, Error>>,
    {
      self
        .scripts
        .lock()
        .expect("lock")
        .insert(job_id.to_string(), responses.into_iter().collect());
      self
    }

    fn calls(&self, job_id: &str) -> usize {
      self.calls.lock().expect("lock").get(job_id).copied().unwrap_or_default()
    }
  }

  impl JobSource for Scripted {
    async fn fetch_job(&self, job_id: &str) -> Result<Job, Error> {
      *self.calls.lock().expect("lock").entry(job_id.to_string()).or_default() += 1;
      let next = self
        .scripts
        .lock()
        .expect("lock")
        .get_mut(job_id)
        .and_then(|script| script.pop_front());
      futures_lite::future::yield_now().await;

      match (next, self.fallback) {
        (Some(response), _) => response,
        (None, Some(status)) => Ok(Job::new(job_id, status)),
        (None, None) => Err(Error::NotFound(job_id.to_string())),
      }
    }
  }

  fn status(job_id: &str, status: JobStatus) -> Result<Job, Error> {
    Ok(Job::new(job_id, status))
  }

  fn settings(interval_ms: u64, timeout_ms: u64) -> PollSettings {
    PollSettings::with_timeout(Duration::from_millis(timeout_ms)).interval(Duration::from_millis(interval_ms))
  }

  #[async_std::test]
  async fn test_finished_on_first_fetch() {
    let source = Scripted::default().script("job", [status("job", JobStatus::Finished)]);
    let clock = VirtualClock::new();
    let poller = Poller::new(&source, "job", settings(1000, 5000))
      .expect("poller")
      .with_clock(clock.clone());

    assert_eq!(poller.poll().await, Ok(PollOutcome::Completed));
    assert_eq!(source.calls("job"), 1);
    assert_eq!(clock.sleeps(), 0);
  }

  #[async_std::test]
  async fn test_queued_running_failed() {
    let details = ErrorDetails {
      code: Some(10001),
      error_code: "CF-AssociationNotEmpty".to_string(),
      description: "space is not empty".to_string(),
    };
    let source = Scripted::default().script(
      "job",
      [
        status("job", JobStatus::Queued),
        status("job", JobStatus::Running),
        Ok(Job::new("job", JobStatus::Failed).with_error_details(details.clone())),
      ],
    );
    let poller = Poller::new(&source, "job", settings(1000, 60_000))
      .expect("poller")
      .with_clock(VirtualClock::new());

    assert_eq!(poller.poll().await, Ok(PollOutcome::Failed(details)));
    assert_eq!(source.calls("job"), 3);
  }

  #[async_std::test]
  async fn test_queued_straight_to_finished() {
    let source = Scripted::default().script(
      "job",
      [status("job", JobStatus::Queued), status("job", JobStatus::Finished)],
    );
    let poller = Poller::new(&source, "job", settings(1000, 60_000))
      .expect("poller")
      .with_clock(VirtualClock::new());

    assert_eq!(poller.poll().await, Ok(PollOutcome::Completed));
    assert_eq!(source.calls("job"), 2);
  }

  #[async_std::test]
  async fn test_timeout_between_intervals() {
    let source = Scripted {
      fallback: Some(JobStatus::Running),
      ..Scripted::default()
    };
    let clock = VirtualClock::new();
    let poller = Poller::new(&source, "job", settings(1000, 2500))
      .expect("poller")
      .with_clock(clock.clone());

    assert_eq!(poller.poll().await, Ok(PollOutcome::TimedOut));
    // floor(2500 / 1000) + 1
    assert_eq!(source.calls("job"), 3);
  }

  #[async_std::test]
  async fn test_deadline_reached_exactly_is_expired() {
    let source = Scripted {
      fallback: Some(JobStatus::Queued),
      ..Scripted::default()
    };
    let poller = Poller::new(&source, "job", settings(1000, 3000))
      .expect("poller")
      .with_clock(VirtualClock::new());

    assert_eq!(poller.poll().await, Ok(PollOutcome::TimedOut));
    assert_eq!(source.calls("job"), 3);
  }

  #[async_std::test]
  async fn test_zero_timeout_polls_indefinitely() {
    let mut responses = (0..25).map(|_| status("job", JobStatus::Running)).collect::<Vec<_>>();
    responses.push(status("job", JobStatus::Finished));
    let source = Scripted::default().script("job", responses);
    let poller = Poller::new(&source, "job", settings(1000, 0))
      .expect("poller")
      .with_clock(VirtualClock::new());

    assert_eq!(poller.poll().await, Ok(PollOutcome::Completed));
    assert_eq!(source.calls("job"), 26);
  }

  #[test]
  fn test_negative_timeout_rejected() {
    assert!(matches!(
      PollSettings::from_millis(1000, -1),
      Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(PollSettings::from_millis(0, 1000), Err(Error::InvalidArgument(_))));
    assert_eq!(
      PollSettings::from_millis(500, 0).map(|s| s.completion_timeout),
      Ok(None)
    );
  }

  #[async_std::test]
  async fn test_empty_job_id_rejected() {
    let source = Scripted::default();
    let result = wait_for_completion(&source, "  ", PollSettings::default()).await;
    assert!(matches!(result, Err(Error::InvalidArgument(_))));
    assert_eq!(source.calls("  "), 0);
    assert_eq!(source.calls(""), 0);
  }

  #[async_std::test]
  async fn test_not_found_is_not_retried() {
    let source = Scripted::default().script("job", [Err(Error::NotFound("job".to_string()))]);
    let poller = Poller::new(&source, "job", settings(1000, 60_000))
      .expect("poller")
      .with_clock(VirtualClock::new());

    assert_eq!(poller.poll().await, Err(Error::NotFound("job".to_string())));
    assert_eq!(source.calls("job"), 1);
  }

  #[async_std::test]
  async fn test_rejected_is_not_retried() {
    let rejected = Error::from_status(403, "forbidden");
    let source = Scripted::default().script("job", [Err(rejected.clone())]);
    let poller = Poller::new(&source, "job", settings(1000, 60_000))
      .expect("poller")
      .with_clock(VirtualClock::new());

    assert_eq!(poller.poll().await, Err(rejected));
    assert_eq!(source.calls("job"), 1);
  }

  #[async_std::test]
  async fn test_unrecognized_status() {
    let bogus = Job {
      guid: "job".to_string(),
      status: "BOGUS".to_string(),
      error_details: None,
    };
    let source = Scripted {
      fallback: Some(JobStatus::Running),
      ..Scripted::default()
    }
    .script("job", [Ok(bogus)]);
    let poller = Poller::new(&source, "job", settings(1000, 0))
      .expect("poller")
      .with_clock(VirtualClock::new());

    assert!(matches!(poller.poll().await, Err(Error::UnrecognizedStatus { .. })));
    assert_eq!(source.calls("job"), 1);
  }

  #[async_std::test]
  async fn test_transient_errors_are_retried() {
    let source = Scripted::default().script(
      "job",
      [
        Err(Error::Transport("connection reset".to_string())),
        Err(Error::from_status(502, "bad gateway")),
        status("job", JobStatus::Finished),
      ],
    );
    let clock = VirtualClock::new();
    let poller = Poller::new(&source, "job", settings(1000, 60_000))
      .expect("poller")
      .with_clock(clock.clone());

    assert_eq!(poller.poll().await, Ok(PollOutcome::Completed));
    assert_eq!(source.calls("job"), 3);
    assert_eq!(clock.sleeps(), 2);
  }

  #[async_std::test]
  async fn test_transient_errors_count_toward_deadline() {
    let errors = (0..10).map(|_| Err(Error::Transport("down".to_string()))).collect::<Vec<_>>();
    let source = Scripted::default().script("job", errors);
    let poller = Poller::new(&source, "job", settings(1000, 1500))
      .expect("poller")
      .with_clock(VirtualClock::new());

    assert_eq!(poller.poll().await, Ok(PollOutcome::TimedOut));
    assert_eq!(source.calls("job"), 2);
  }

  #[async_std::test]
  async fn test_concurrent_pollers_are_independent() {
    let mut slow = (0..4).map(|_| status("slow", JobStatus::Running)).collect::<Vec<_>>();
    slow.push(status("slow", JobStatus::Finished));
    let source = Scripted {
      fallback: Some(JobStatus::Running),
      ..Scripted::default()
    }
    .script("slow", slow)
    .script("fast", [status("fast", JobStatus::Queued), status("fast", JobStatus::Finished)]);

    let slow_poller = Poller::new(&source, "slow", settings(1000, 60_000))
      .expect("poller")
      .with_clock(VirtualClock::new());
    let stuck_poller = Poller::new(&source, "stuck", settings(1000, 3500))
      .expect("poller")
      .with_clock(VirtualClock::new());
    let fast_poller = Poller::new(&source, "fast", settings(1000, 60_000))
      .expect("poller")
      .with_clock(VirtualClock::new());

    let ((slow, stuck), fast) = futures_lite::future::zip(
      futures_lite::future::zip(slow_poller.poll(), stuck_poller.poll()),
      fast_poller.poll(),
    )
    .await;

    assert_eq!(slow, Ok(PollOutcome::Completed));
    assert_eq!(stuck, Ok(PollOutcome::TimedOut));
    assert_eq!(fast, Ok(PollOutcome::Completed));
    assert_eq!(source.calls("slow"), 5);
    assert_eq!(source.calls("stuck"), 4);
    assert_eq!(source.calls("fast"), 2);
  }

  #[async_std::test]
  async fn test_dropping_the_poll_stops_requests() {
    let source = Scripted {
      fallback: Some(JobStatus::Running),
      ..Scripted::default()
    };
    let poller = Poller::new(&source, "job", settings(5, 0)).expect("poller");

    let cancelled = async_std::future::timeout(Duration::from_millis(60), poller.poll()).await;
    assert!(cancelled.is_err());

    let seen = source.calls("job");
    assert!(seen > 0);
    async_std::task::sleep(Duration::from_millis(40)).await;
    assert_eq!(source.calls("job"), seen);
  }
}
