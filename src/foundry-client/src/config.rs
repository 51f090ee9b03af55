use serde::Deserialize;

/// Where the control plane lives and how to talk to it.
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "snake_case")]
pub struct ApiConfiguration {
  /// The root of the api, e.g `https://api.example.com`.
  pub url: String,
  /// A bearer token; omitted for unauthenticated (mock) environments.
  pub token: Option<String>,
  /// Overrides the default `User-Agent` header.
  pub user_agent: Option<String>,
}

/// Pacing for job polls. Values are signed so that a negative value in a config file is reported
/// instead of silently wrapping.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "snake_case")]
pub struct PollingConfiguration {
  /// Milliseconds between two reads of a job.
  pub interval_millis: Option<i64>,
  /// Seconds to wait for a job; `0` waits indefinitely.
  pub completion_timeout_seconds: Option<i64>,
}

impl PollingConfiguration {
  /// Validates + converts into the settings used by the poller.
  pub fn settings(&self) -> Result<crate::jobs::PollSettings, crate::errors::Error> {
    let defaults = crate::jobs::PollSettings::default();

    let interval = self
      .interval_millis
      .unwrap_or(defaults.interval.as_millis() as i64);

    let timeout = match self.completion_timeout_seconds {
      None => defaults.completion_timeout.map(|d| d.as_millis() as i64).unwrap_or_default(),
      Some(seconds) if seconds < 0 => {
        return Err(crate::errors::Error::invalid_argument(format!(
          "completion timeout must not be negative, got {seconds}s"
        )))
      }
      Some(seconds) => seconds.checked_mul(1000).ok_or_else(|| {
        crate::errors::Error::invalid_argument(format!("completion timeout of {seconds}s is too large"))
      })?,
    };

    crate::jobs::PollSettings::from_millis(interval, timeout)
  }
}

/// The full configuration schema, typically read from an `env.toml` file.
#[derive(Deserialize, Debug, Clone)]
pub struct Configuration {
  /// The api configuration.
  pub api: ApiConfiguration,
  /// Polling configuration; defaults apply when missing.
  #[serde(default)]
  pub polling: PollingConfiguration,
}

impl Configuration {
  /// Builds the operation facade from whatever we were able to deserialize.
  pub fn operations(&self) -> Result<crate::operations::Operations<crate::client::Client>, crate::errors::Error> {
    let client = crate::client::Client::new(&self.api)?;
    let settings = self.polling.settings()?;
    Ok(crate::operations::Operations::new(client, settings))
  }
}
