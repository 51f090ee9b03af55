//! The schema of asynchronous jobs as reported by the control plane, along with the poller that
//! watches them through to completion.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The poller itself, plus the seams (`JobSource`, `Clock`) it is built on.
pub mod poller;
pub use poller::{Clock, JobSource, PollOutcome, PollSettings, Poller, SystemClock};

/// The closed set of states a job may be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
  /// Accepted, not yet started.
  Queued,
  /// In progress.
  Running,
  /// Terminal success.
  Finished,
  /// Terminal failure; the job will carry error details.
  Failed,
}

impl JobStatus {
  /// Once terminal, a job's status never changes again.
  pub fn is_terminal(&self) -> bool {
    matches!(self, Self::Finished | Self::Failed)
  }
}

impl FromStr for JobStatus {
  type Err = String;

  fn from_str(value: &str) -> Result<Self, Self::Err> {
    match value.to_ascii_lowercase().as_str() {
      "queued" => Ok(Self::Queued),
      "running" => Ok(Self::Running),
      "finished" => Ok(Self::Finished),
      "failed" => Ok(Self::Failed),
      _ => Err(value.to_string()),
    }
  }
}

impl fmt::Display for JobStatus {
  fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
    let value = match self {
      Self::Queued => "queued",
      Self::Running => "running",
      Self::Finished => "finished",
      Self::Failed => "failed",
    };

    write!(formatter, "{value}")
  }
}

/// The failure information attached to jobs that ended up `FAILED`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct ErrorDetails {
  /// The numeric code, when the server provides one.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub code: Option<u64>,
  /// The symbolic code, e.g `CF-AssociationNotEmpty`.
  #[serde(default)]
  pub error_code: String,
  /// A human readable reason.
  #[serde(default)]
  pub description: String,
}

/// The job entity. The `status` is kept as the raw wire value; it is validated against the
/// closed set of states by [`Job::status`] so that an unknown value surfaces as an error rather
/// than a deserialization failure.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Job {
  /// The id assigned by the server.
  pub guid: String,
  /// The raw status string.
  pub status: String,
  /// Present when the job failed.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error_details: Option<ErrorDetails>,
}

impl Job {
  /// Builds a job, mostly useful for servers and test doubles.
  pub fn new<S>(guid: S, status: JobStatus) -> Self
  where
    S: AsRef<str>,
  {
    Self {
      guid: guid.as_ref().to_string(),
      status: status.to_string(),
      error_details: None,
    }
  }

  /// Attaches failure information to the job.
  pub fn with_error_details(self, details: ErrorDetails) -> Self {
    Self {
      error_details: Some(details),
      ..self
    }
  }

  /// Attempts to interpret the raw status against the closed set of states.
  pub fn status(&self) -> Result<JobStatus, crate::errors::Error> {
    self
      .status
      .parse::<JobStatus>()
      .map_err(|status| crate::errors::Error::UnrecognizedStatus {
        job_id: self.guid.clone(),
        status,
      })
  }
}

/// The `metadata` portion of the v2 resource envelope.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
  /// The resource id.
  pub guid: String,
  /// When the resource was created.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub created_at: Option<chrono::DateTime<chrono::Utc>>,
  /// The path of the resource itself.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub url: Option<String>,
}

/// The v2 resource envelope wrapping a job entity.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct JobResource {
  /// Resource metadata.
  pub metadata: Metadata,
  /// The job itself.
  pub entity: Job,
}

/// The job endpoint may answer with either the envelope or the bare entity.
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum JobPayload {
  /// `{ "metadata": .., "entity": .. }`
  Resource(JobResource),
  /// `{ "guid": .., "status": .. }`
  Bare(Job),
}

impl JobPayload {
  /// Parses a response body from the job endpoint.
  pub fn parse<S>(body: S) -> Result<Job, crate::errors::Error>
  where
    S: AsRef<str>,
  {
    let payload = serde_json::from_str::<Self>(body.as_ref())?;
    Ok(payload.into())
  }
}

impl From<JobPayload> for Job {
  fn from(payload: JobPayload) -> Self {
    match payload {
      JobPayload::Resource(mut resource) => {
        if resource.entity.guid.is_empty() {
          resource.entity.guid = resource.metadata.guid;
        }
        resource.entity
      }
      JobPayload::Bare(job) => job,
    }
  }
}

/// The handle returned by mutations the server executes asynchronously.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReference {
  /// The id of the job to poll.
  pub id: String,
}

impl From<Job> for JobReference {
  fn from(job: Job) -> Self {
    Self { id: job.guid }
  }
}
