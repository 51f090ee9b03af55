//! The error type shared by the http client, the job poller and the operation facade. The
//! variants are split so that callers can tell a timeout apart from a job failure and from a
//! transport problem; each implies a different remedy.

use thiserror::Error;

/// Every fallible api in this crate returns this.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
  /// A network failure, a `5xx` or a `429`. These are retried inside the poll loop.
  #[error("transport failure - {0}")]
  Transport(String),

  /// The server has no record of the resource.
  #[error("not found - {0}")]
  NotFound(String),

  /// Any other `4xx` response.
  #[error("request rejected ({status}) - {description}")]
  Rejected {
    /// The http status code.
    status: u16,
    /// Whatever body the server sent back.
    description: String,
  },

  /// The response body could not be decoded (e.g a job payload without a `status`).
  #[error("unable to decode response - {0}")]
  Decode(String),

  /// The server reported a job status outside of the known set.
  #[error("job '{job_id}' reported unrecognized status '{status}'")]
  UnrecognizedStatus {
    /// The id of the job being polled.
    job_id: String,
    /// The raw status value.
    status: String,
  },

  /// Caller input was rejected before any request was made.
  #[error("invalid argument - {0}")]
  InvalidArgument(String),

  /// A job reached its `FAILED` state. Produced by the operation facade, never by the poller.
  #[error("job '{job_id}' failed [{error_code}]: {description}")]
  JobFailed {
    /// The id of the failed job.
    job_id: String,
    /// The control plane's error code, e.g `CF-SpaceNotFound`.
    error_code: String,
    /// The human readable reason.
    description: String,
  },

  /// A job did not reach a terminal state before the completion timeout.
  #[error("job '{0}' did not complete in time")]
  JobTimedOut(String),
}

impl Error {
  /// Builds the appropriate variant for a non-successful http status.
  pub fn from_status<S>(status: u16, body: S) -> Self
  where
    S: AsRef<str>,
  {
    let description = body.as_ref().to_string();

    match status {
      404 => Self::NotFound(description),
      429 | 500..=599 => Self::Transport(format!("status {status} - {description}")),
      _ => Self::Rejected { status, description },
    }
  }

  /// Whether or not this error is worth another attempt.
  pub fn is_transient(&self) -> bool {
    matches!(self, Self::Transport(_))
  }

  /// Shorthand for [`Error::InvalidArgument`].
  pub fn invalid_argument<S>(message: S) -> Self
  where
    S: Into<String>,
  {
    Self::InvalidArgument(message.into())
  }
}

impl From<surf::Error> for Error {
  fn from(error: surf::Error) -> Self {
    let status = u16::from(error.status());
    let message = error.to_string();

    // surf reports connection problems as 500s; everything lands in the same bucket.
    match status {
      400..=499 => Self::from_status(status, message),
      _ => Self::Transport(message),
    }
  }
}

impl From<serde_json::Error> for Error {
  fn from(error: serde_json::Error) -> Self {
    Self::Decode(error.to_string())
  }
}

impl From<Error> for std::io::Error {
  fn from(error: Error) -> Self {
    std::io::Error::new(std::io::ErrorKind::Other, error.to_string())
  }
}
