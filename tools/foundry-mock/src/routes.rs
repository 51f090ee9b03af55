use serde::Serialize;

use crate::registry::Registry;

/// The collections that accept asynchronous deletes.
const DELETABLE: &[&str] = &[
  "organizations",
  "spaces",
  "routes",
  "users",
  "service_bindings",
  "shared_domains",
  "private_domains",
];

/// The error envelope used by the v2 api.
#[derive(Serialize, Debug)]
struct ApiError {
  code: u32,
  description: String,
  error_code: &'static str,
}

#[derive(Serialize, Debug)]
struct HeartbeatPayload {
  version: String,
  timestamp: chrono::DateTime<chrono::Utc>,
}

impl Default for HeartbeatPayload {
  fn default() -> Self {
    HeartbeatPayload {
      version: option_env!("FOUNDRY_VERSION").unwrap_or("dev").into(),
      timestamp: chrono::Utc::now(),
    }
  }
}

fn not_found<S>(description: S) -> tide::Result
where
  S: Into<String>,
{
  let body = ApiError {
    code: 10000,
    description: description.into(),
    error_code: "CF-NotFound",
  };

  Ok(tide::Response::builder(404).body(tide::Body::from_json(&body)?).build())
}

async fn heartbeat(_request: tide::Request<Registry>) -> tide::Result {
  Ok(
    tide::Response::builder(200)
      .body(tide::Body::from_json(&HeartbeatPayload::default())?)
      .build(),
  )
}

/// Route: GET /v2/jobs/:id
async fn find(request: tide::Request<Registry>) -> tide::Result {
  let id = request.param("id")?;
  log::debug!("attempting to find job '{id}'");

  match request.state().read(id)? {
    Some(resource) => Ok(
      tide::Response::builder(200)
        .body(tide::Body::from_json(&resource)?)
        .build(),
    ),
    None => {
      log::warn!("no job '{id}'");
      not_found(format!("The job could not be found: {id}"))
    }
  }
}

/// Route: DELETE /v2/:collection/:id
///
/// Every deletion is accepted and answered with a freshly queued job.
async fn remove(request: tide::Request<Registry>) -> tide::Result {
  let collection = request.param("collection")?;
  let id = request.param("id")?;

  if !DELETABLE.contains(&collection) {
    log::warn!("unsupported delete of '{collection}'");
    return not_found(format!("Unknown request: {collection}"));
  }

  let resource = request.state().create(collection, id)?;

  Ok(
    tide::Response::builder(202)
      .body(tide::Body::from_json(&resource)?)
      .build(),
  )
}

async fn missing(request: tide::Request<Registry>) -> tide::Result {
  log::debug!("not-found - '{}'", request.url().path());
  not_found("Unknown request")
}

pub fn new(registry: Registry) -> tide::Server<Registry> {
  let mut app = tide::with_state(registry);

  app.at("/v2/jobs/:id").get(find);
  app.at("/v2/:collection/:id").delete(remove);

  app.at("/status").get(heartbeat);
  app.at("/*").all(missing);
  app.at("/").all(missing);

  app
}
