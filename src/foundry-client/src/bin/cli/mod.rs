use clap::{Parser, Subcommand};

/// Commands that operate on a single resource share these arguments.
#[derive(Parser, PartialEq, Debug)]
pub struct ResourceCommand {
  /// The guid of the resource (or job).
  #[arg(short = 'i', long)]
  pub id: String,

  /// Overrides the configured completion timeout; `0` waits indefinitely.
  #[arg(short = 't', long, allow_negative_numbers = true)]
  pub timeout_seconds: Option<i64>,
}

#[derive(Subcommand, PartialEq, Debug)]
pub enum CommandLineCommand {
  /// Polls an existing job until it completes.
  Watch(ResourceCommand),
  /// Deletes an organization and everything in it.
  DeleteOrganization(ResourceCommand),
  /// Deletes a space and everything in it.
  DeleteSpace(ResourceCommand),
  /// Deletes a route.
  DeleteRoute(ResourceCommand),
  /// Deletes a user.
  DeleteUser(ResourceCommand),
  /// Deletes a service binding.
  DeleteServiceBinding(ResourceCommand),
  /// Deletes a shared domain.
  DeleteSharedDomain(ResourceCommand),
  /// Deletes a private domain.
  DeletePrivateDomain(ResourceCommand),
}

#[derive(Parser, Debug)]
#[command(author, version = option_env!("FOUNDRY_VERSION").unwrap_or("dev"), about, long_about = None)]
pub struct CommandLineArguments {
  /// The path to the toml configuration file.
  #[clap(short, long, default_value = "env.toml")]
  pub config: String,

  #[command(subcommand)]
  pub command: CommandLineCommand,
}

impl CommandLineCommand {
  /// The arguments shared by every command.
  pub fn resource(&self) -> &ResourceCommand {
    match self {
      Self::Watch(inner)
      | Self::DeleteOrganization(inner)
      | Self::DeleteSpace(inner)
      | Self::DeleteRoute(inner)
      | Self::DeleteUser(inner)
      | Self::DeleteServiceBinding(inner)
      | Self::DeleteSharedDomain(inner)
      | Self::DeletePrivateDomain(inner) => inner,
    }
  }

  /// The resource deleted by this command, `None` for `watch`.
  pub fn deletion(&self) -> Option<foundry::Resource> {
    match self {
      Self::Watch(_) => None,
      Self::DeleteOrganization(_) => Some(foundry::Resource::Organization),
      Self::DeleteSpace(_) => Some(foundry::Resource::Space),
      Self::DeleteRoute(_) => Some(foundry::Resource::Route),
      Self::DeleteUser(_) => Some(foundry::Resource::User),
      Self::DeleteServiceBinding(_) => Some(foundry::Resource::ServiceBinding),
      Self::DeleteSharedDomain(_) => Some(foundry::Resource::SharedDomain),
      Self::DeletePrivateDomain(_) => Some(foundry::Resource::PrivateDomain),
    }
  }
}

/// Converts the optional signed command line timeout into a duration, rejecting negative values.
pub fn completion_timeout(seconds: Option<i64>) -> Result<Option<std::time::Duration>, foundry::Error> {
  match seconds {
    None => Ok(None),
    Some(value) if value < 0 => Err(foundry::Error::invalid_argument(format!(
      "completion timeout must not be negative, got {value}s"
    ))),
    Some(value) => Ok(Some(std::time::Duration::from_secs(value as u64))),
  }
}
