//! An in-memory stand-in for the control plane's job table. Jobs advance one state per status
//! read rather than on a timer so that local runs are reproducible.

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};

use foundry::jobs::{ErrorDetails, Job, JobResource, JobStatus, Metadata};

/// Targets whose id carries this prefix produce failed jobs.
pub const FAILURE_PREFIX: &str = "fail-";

/// How many times a terminal job can be read before it is dropped from the table; later reads
/// see a `404` like they would for any job the server has forgotten.
pub const TERMINAL_READS: u32 = 3;

/// A job created by a mock deletion.
#[derive(Debug, Clone)]
pub struct MockJob {
  /// The id handed back to clients.
  pub guid: String,
  /// The collection the deleted resource lived in, e.g `spaces`.
  pub collection: String,
  /// The id of the deleted resource.
  pub target: String,
  /// When the job was created.
  pub created_at: chrono::DateTime<chrono::Utc>,
  /// How many times the job has been read.
  pub reads: u32,
  /// How many reads the job stays non-terminal for.
  pub steps: u32,
}

impl MockJob {
  /// The status for the current amount of reads: `queued` first, `running` until `steps` reads
  /// have happened, then terminal.
  pub fn status(&self) -> JobStatus {
    match self.reads {
      reads if reads > self.steps => {
        if self.target.starts_with(FAILURE_PREFIX) {
          JobStatus::Failed
        } else {
          JobStatus::Finished
        }
      }
      0 | 1 => JobStatus::Queued,
      _ => JobStatus::Running,
    }
  }

  /// Whether the job has been read as terminal often enough to be forgotten.
  fn expired(&self) -> bool {
    self.reads >= self.steps.saturating_add(TERMINAL_READS)
  }

  /// The job in the v2 resource envelope.
  pub fn resource(&self) -> JobResource {
    let status = self.status();
    let mut entity = Job::new(&self.guid, status);

    if status == JobStatus::Failed {
      entity = entity.with_error_details(ErrorDetails {
        code: Some(10006),
        error_code: "CF-AssociationNotEmpty".to_string(),
        description: format!("Please delete the associations for your {}.", self.collection),
      });
    }

    JobResource {
      metadata: Metadata {
        guid: self.guid.clone(),
        created_at: Some(self.created_at),
        url: Some(format!("{}/{}", foundry::constants::JOBS_PATH, self.guid)),
      },
      entity,
    }
  }
}

/// The shared job table.
#[derive(Clone)]
pub struct Registry {
  /// Live jobs by guid; terminal ones are removed after `TERMINAL_READS` reads.
  jobs: Arc<Mutex<HashMap<String, MockJob>>>,
  /// How many reads new jobs stay non-terminal for.
  steps: u32,
}

impl Registry {
  pub fn new(steps: u32) -> Self {
    Self {
      jobs: Arc::new(Mutex::new(HashMap::new())),
      steps,
    }
  }

  /// Records a new job for the deletion of `target` and returns its initial state.
  pub fn create<S>(&self, collection: S, target: S) -> io::Result<JobResource>
  where
    S: AsRef<str>,
  {
    let job = MockJob {
      guid: uuid::Uuid::new_v4().to_string(),
      collection: collection.as_ref().to_string(),
      target: target.as_ref().to_string(),
      created_at: chrono::Utc::now(),
      reads: 0,
      steps: self.steps,
    };
    let resource = job.resource();

    let mut jobs = self.lock()?;
    log::info!(
      "created job '{}' deleting {}/{} ({} other job(s) live)",
      job.guid,
      job.collection,
      job.target,
      jobs.len()
    );
    jobs.insert(job.guid.clone(), job);

    Ok(resource)
  }

  /// Reads a job, advancing it one step.
  pub fn read<S>(&self, guid: S) -> io::Result<Option<JobResource>>
  where
    S: AsRef<str>,
  {
    let mut jobs = self.lock()?;

    let (resource, expired) = match jobs.get_mut(guid.as_ref()) {
      Some(job) => {
        job.reads += 1;
        log::debug!("job '{}' read {} time(s) - '{}'", job.guid, job.reads, job.status());
        (job.resource(), job.expired())
      }
      None => return Ok(None),
    };

    if expired {
      log::info!("dropping job '{}'", resource.metadata.guid);
      jobs.remove(guid.as_ref());
    }

    Ok(Some(resource))
  }

  fn lock(&self) -> io::Result<std::sync::MutexGuard<'_, HashMap<String, MockJob>>> {
    self
      .jobs
      .lock()
      .map_err(|error| io::Error::new(io::ErrorKind::Other, format!("poisoned job registry - {error}")))
  }
}
