//! Resource operations the control plane executes asynchronously. Each one is the same
//! sequence: issue the mutation, take the job reference from the response, poll that job and
//! translate the outcome into a plain `Result`.

use std::time::Duration;

use crate::errors::Error;
use crate::jobs::{JobReference, JobSource, PollOutcome, PollSettings, Poller};

/// The mutations the facade needs on top of reading jobs.
#[allow(async_fn_in_trait)]
pub trait ControlPlane: JobSource {
  /// `DELETE {path}?async=true`, returning the job created by the server (if any).
  async fn delete_async(&self, path: &str, recursive: bool) -> Result<Option<JobReference>, Error>;
}

impl ControlPlane for crate::client::Client {
  async fn delete_async(&self, path: &str, recursive: bool) -> Result<Option<JobReference>, Error> {
    crate::client::Client::delete_async(self, path, recursive).await
  }
}

/// The v2 resources that support asynchronous deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
  /// `/v2/organizations`; deleted recursively.
  Organization,
  /// `/v2/spaces`; deleted recursively.
  Space,
  /// `/v2/routes`
  Route,
  /// `/v2/users`
  User,
  /// `/v2/service_bindings`
  ServiceBinding,
  /// `/v2/shared_domains`
  SharedDomain,
  /// `/v2/private_domains`
  PrivateDomain,
}

impl Resource {
  /// The collection path of this resource.
  pub fn collection(&self) -> &'static str {
    match self {
      Self::Organization => "/v2/organizations",
      Self::Space => "/v2/spaces",
      Self::Route => "/v2/routes",
      Self::User => "/v2/users",
      Self::ServiceBinding => "/v2/service_bindings",
      Self::SharedDomain => "/v2/shared_domains",
      Self::PrivateDomain => "/v2/private_domains",
    }
  }

  /// Organizations and spaces own other resources; deleting them must take those along.
  fn recursive(&self) -> bool {
    matches!(self, Self::Organization | Self::Space)
  }

  /// Validates the id and builds the path of a single resource.
  fn path(&self, id: &str) -> Result<String, Error> {
    let id = id.trim();

    if id.is_empty() || id.contains(['/', '?', '#']) {
      return Err(Error::invalid_argument(format!("invalid resource id '{id}'")));
    }

    Ok(format!("{}/{id}", self.collection()))
  }
}

/// The operation facade.
#[derive(Debug, Clone)]
pub struct Operations<P> {
  /// The control plane.
  plane: P,
  /// Used when the caller does not provide a completion timeout.
  settings: PollSettings,
}

impl<P> Operations<P>
where
  P: ControlPlane,
{
  /// Wraps a control plane.
  pub fn new(plane: P, settings: PollSettings) -> Self {
    Self { plane, settings }
  }

  /// The control plane this facade talks to.
  pub fn plane(&self) -> &P {
    &self.plane
  }

  /// The default settings, with the completion timeout replaced when one was provided.
  fn settings(&self, completion_timeout: Option<Duration>) -> PollSettings {
    match completion_timeout {
      Some(timeout) => PollSettings::with_timeout(timeout).interval(self.settings.interval),
      None => self.settings,
    }
  }

  /// Polls a job to completion, turning `Failed` and `TimedOut` into errors.
  pub async fn await_job(&self, reference: &JobReference, completion_timeout: Option<Duration>) -> Result<(), Error> {
    let poller = Poller::new(&self.plane, &reference.id, self.settings(completion_timeout))?;

    match poller.poll().await? {
      PollOutcome::Completed => Ok(()),
      PollOutcome::Failed(details) => Err(Error::JobFailed {
        job_id: reference.id.clone(),
        error_code: details.error_code,
        description: details.description,
      }),
      PollOutcome::TimedOut => Err(Error::JobTimedOut(reference.id.clone())),
    }
  }

  /// Deletes a resource and waits for the job the deletion created.
  pub async fn delete(&self, resource: Resource, id: &str, completion_timeout: Option<Duration>) -> Result<(), Error> {
    let path = resource.path(id)?;
    log::info!("deleting {resource:?} '{id}'");

    let reference = match self.plane.delete_async(&path, resource.recursive()).await {
      Ok(reference) => reference,
      // A user that is already gone is as good as deleted.
      Err(Error::NotFound(_)) if resource == Resource::User => {
        log::info!("user '{id}' not found, nothing to delete");
        None
      }
      Err(error) => return Err(error),
    };

    match reference {
      Some(reference) => {
        log::debug!("waiting on job '{}' for {resource:?} '{id}'", reference.id);
        self.await_job(&reference, completion_timeout).await
      }
      None => Ok(()),
    }
  }

  /// Deletes an organization along with its spaces and everything in them.
  pub async fn delete_organization(&self, id: &str, completion_timeout: Option<Duration>) -> Result<(), Error> {
    self.delete(Resource::Organization, id, completion_timeout).await
  }

  /// Deletes a space along with its applications, routes and service instances.
  pub async fn delete_space(&self, id: &str, completion_timeout: Option<Duration>) -> Result<(), Error> {
    self.delete(Resource::Space, id, completion_timeout).await
  }

  /// Deletes a route.
  pub async fn delete_route(&self, id: &str, completion_timeout: Option<Duration>) -> Result<(), Error> {
    self.delete(Resource::Route, id, completion_timeout).await
  }

  /// Deletes a user; a user the server does not know about is treated as already deleted.
  pub async fn delete_user(&self, id: &str, completion_timeout: Option<Duration>) -> Result<(), Error> {
    self.delete(Resource::User, id, completion_timeout).await
  }

  /// Unbinds a service instance from an application.
  pub async fn delete_service_binding(&self, id: &str, completion_timeout: Option<Duration>) -> Result<(), Error> {
    self.delete(Resource::ServiceBinding, id, completion_timeout).await
  }

  /// Deletes a domain shared across all organizations.
  pub async fn delete_shared_domain(&self, id: &str, completion_timeout: Option<Duration>) -> Result<(), Error> {
    self.delete(Resource::SharedDomain, id, completion_timeout).await
  }

  /// Deletes a domain owned by a single organization.
  pub async fn delete_private_domain(&self, id: &str, completion_timeout: Option<Duration>) -> Result<(), Error> {
    self.delete(Resource::PrivateDomain, id, completion_timeout).await
  }
}
