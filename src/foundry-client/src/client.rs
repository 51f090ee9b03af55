//! The http client used to talk to the control plane. This is intentionally thin; it knows how
//! to build urls, attach credentials and classify responses, and leaves everything else to the
//! callers.

use crate::errors::Error;
use crate::jobs::{Job, JobPayload, JobReference, JobSource};

/// A connection to one control plane.
#[derive(Clone)]
pub struct Client {
  /// The underlying surf client.
  http: surf::Client,
  /// The root url all paths are resolved against.
  base: url::Url,
  /// The bearer token, if any.
  token: Option<String>,
  /// The `User-Agent` header value.
  user_agent: String,
}

impl std::fmt::Debug for Client {
  fn fmt(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
    formatter
      .debug_struct("Client")
      .field("base", &self.base.as_str())
      .field("authenticated", &self.token.is_some())
      .finish()
  }
}

impl Client {
  /// Validates the configured url and prepares the http client.
  pub fn new(config: &crate::config::ApiConfiguration) -> Result<Self, Error> {
    let base = url::Url::parse(&config.url)
      .map_err(|error| Error::invalid_argument(format!("invalid api url '{}' - {error}", config.url)))?;

    if base.cannot_be_a_base() {
      return Err(Error::invalid_argument(format!("api url '{}' cannot be a base", config.url)));
    }

    let http = surf::Client::new().with(surf::middleware::Logger::new());

    Ok(Self {
      http,
      base,
      token: config.token.clone(),
      user_agent: config
        .user_agent
        .clone()
        .unwrap_or_else(|| crate::constants::DEFAULT_USER_AGENT.to_string()),
    })
  }

  /// Appends path segments to our base url. Every segment is percent-encoded on its own, so
  /// ids can never step outside the collection they are meant for; any path prefix on the
  /// base url (e.g a gateway mount point) is kept.
  pub(crate) fn endpoint<I, S>(&self, segments: I) -> Result<url::Url, Error>
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    let mut url = self.base.clone();

    {
      let mut path = url
        .path_segments_mut()
        .map_err(|_| Error::invalid_argument(format!("api url '{}' cannot be a base", self.base)))?;
      path.pop_if_empty();

      for segment in segments {
        let segment = segment.as_ref();

        if segment.is_empty() || segment == "." || segment == ".." {
          return Err(Error::invalid_argument(format!("invalid path segment '{segment}'")));
        }

        path.push(segment);
      }
    }

    Ok(url)
  }

  /// Attaches the headers every request carries.
  fn prepare(&self, request: surf::RequestBuilder) -> surf::RequestBuilder {
    let request = request
      .header("Accept", "application/json")
      .header("User-Agent", self.user_agent.as_str());

    match &self.token {
      Some(token) => request.header("Authorization", format!("bearer {token}")),
      None => request,
    }
  }

  /// Sends the request and reads the body, turning every non-successful status into an error.
  async fn send(&self, request: surf::RequestBuilder) -> Result<(u16, String), Error> {
    let mut response = self.prepare(request).await?;
    let status = u16::from(response.status());

    let body = response
      .body_string()
      .await
      .map_err(|error| Error::Transport(format!("unable to read response body - {error}")))?;

    log::trace!("response status '{status}' ({} bytes)", body.len());

    if status >= 400 {
      log::warn!("unsuccessful response '{status}' - '{body}'");
      return Err(Error::from_status(status, body));
    }

    Ok((status, body))
  }

  /// Reads the current state of a job: `GET /v2/jobs/:guid`.
  pub async fn job<S>(&self, job_id: S) -> Result<Job, Error>
  where
    S: AsRef<str>,
  {
    let url = self.endpoint(segments(crate::constants::JOBS_PATH).chain([job_id.as_ref()]))?;
    log::debug!("fetching job from '{url}'");

    let (_, body) = self.send(self.http.get(url.as_str())).await?;
    JobPayload::parse(body)
  }

  /// Issues an asynchronous delete against a resource path. Returns the job created by the
  /// server, or `None` when the server completed the deletion synchronously.
  pub async fn delete_async<S>(&self, path: S, recursive: bool) -> Result<Option<JobReference>, Error>
  where
    S: AsRef<str>,
  {
    let mut url = self.endpoint(segments(path.as_ref()))?;

    {
      let mut query = url.query_pairs_mut();
      query.append_pair("async", "true");

      if recursive {
        query.append_pair("recursive", "true");
      }
    }

    log::debug!("deleting '{url}'");
    let (status, body) = self.send(self.http.delete(url.as_str())).await?;

    job_reference(status, &body)
  }
}

/// Splits a `/`-separated path into the segments `Client::endpoint` expects.
fn segments(path: &str) -> impl Iterator<Item = &str> {
  path.split('/').filter(|segment| !segment.is_empty())
}

/// Interprets the response to an async mutation.
fn job_reference(status: u16, body: &str) -> Result<Option<JobReference>, Error> {
  if status == 204 || body.trim().is_empty() {
    log::debug!("mutation completed synchronously ('{status}')");
    return Ok(None);
  }

  JobPayload::parse(body).map(|job| Some(JobReference::from(job)))
}

impl JobSource for Client {
  async fn fetch_job(&self, job_id: &str) -> Result<Job, Error> {
    self.job(job_id).await
  }
}
