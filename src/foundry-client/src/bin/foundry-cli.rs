#![deny(unsafe_code)]

//! Command line access to the asynchronous operations of the control plane. Every command
//! waits on the job it created (or was given) and reports how it ended.

use anyhow::Context;
use clap::Parser;
use std::io;

mod cli;

/// Reads + validates the toml configuration file.
async fn load_config(path: &str) -> anyhow::Result<foundry::config::Configuration> {
  let contents = async_std::fs::read_to_string(path)
    .await
    .with_context(|| format!("unable to read config file '{path}'"))?;

  toml::from_str::<foundry::config::Configuration>(&contents).with_context(|| format!("invalid toml config '{path}'"))
}

/// Polls an existing job, printing the outcome to stdout.
async fn watch(config: &foundry::config::Configuration, command: &cli::ResourceCommand) -> anyhow::Result<()> {
  let client = foundry::Client::new(&config.api)?;
  let mut settings = config.polling.settings()?;

  if let Some(timeout) = cli::completion_timeout(command.timeout_seconds)? {
    settings = foundry::PollSettings::with_timeout(timeout).interval(settings.interval);
  }

  let poller = foundry::Poller::new(&client, &command.id, settings)?;
  log::info!("watching job '{}' - {settings:?}", poller.job_id());

  match poller.poll().await? {
    foundry::PollOutcome::Completed => println!("job '{}' finished", command.id),
    foundry::PollOutcome::Failed(details) => {
      println!(
        "job '{}' failed [{}]: {}",
        command.id, details.error_code, details.description
      );
      return Err(anyhow::Error::msg("job failed"));
    }
    foundry::PollOutcome::TimedOut => {
      println!("job '{}' did not complete in time", command.id);
      return Err(anyhow::Error::msg("job timed out"));
    }
  }

  Ok(())
}

async fn run(args: cli::CommandLineArguments) -> anyhow::Result<()> {
  let config = load_config(&args.config).await?;
  log::debug!("loaded configuration for '{}'", config.api.url);

  let resource = match args.command.deletion() {
    None => return watch(&config, args.command.resource()).await,
    Some(resource) => resource,
  };

  let command = args.command.resource();
  let timeout = cli::completion_timeout(command.timeout_seconds)?;
  let operations = config.operations()?;

  operations.delete(resource, &command.id, timeout).await.map_err(|error| {
    log::warn!("unable to delete {resource:?} '{}' - {error}", command.id);
    error
  })?;

  println!("{resource:?} '{}' deleted", command.id);
  Ok(())
}

fn main() -> io::Result<()> {
  let load_env = std::fs::metadata(".env").map(|meta| meta.is_file()).unwrap_or(false);

  if load_env {
    let env_result = dotenv::dotenv();
    println!(".env loaded? {:?}", env_result.is_ok());
  }

  env_logger::init();
  let args = cli::CommandLineArguments::parse();

  async_std::task::block_on(run(args)).map_err(|error| {
    log::error!("{error:#}");
    io::Error::new(io::ErrorKind::Other, format!("{error:#}"))
  })
}
