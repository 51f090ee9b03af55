use std::time::Duration;

/// How long the poller waits between two reads of the same job.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// How long the operation facade waits for a job when the caller did not say otherwise.
pub const DEFAULT_COMPLETION_TIMEOUT: Duration = Duration::from_secs(60 * 5);

/// The collection path of the v2 job resource.
pub const JOBS_PATH: &str = "/v2/jobs";

/// Sent along with every request unless configured otherwise.
pub const DEFAULT_USER_AGENT: &str = "foundry-client";
