use clap::Parser;

#[derive(Parser)]
#[command(author, version = option_env!("FOUNDRY_VERSION").unwrap_or("dev"), about, long_about = None)]
pub struct CommandLineArguments {
  /// The address the mock control plane listens on.
  #[clap(short, long, default_value = "127.0.0.1:8337")]
  pub addr: String,

  /// The amount of status reads a job stays non-terminal for.
  #[clap(short, long, default_value = "2")]
  pub steps: u32,
}
