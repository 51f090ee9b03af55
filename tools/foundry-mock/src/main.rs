#![deny(unsafe_code)]

//! A stand-in control plane for local development. It accepts the asynchronous deletes the
//! client issues and serves the jobs they create, advancing each job one state per read.

use clap::Parser;
use std::io;

mod arguments;
mod registry;
mod routes;

async fn run(args: arguments::CommandLineArguments) -> io::Result<()> {
  let registry = registry::Registry::new(args.steps);
  log::info!("mock control plane listening on '{}' ({} step(s) per job)", args.addr, args.steps);
  routes::new(registry).listen(&args.addr).await
}

fn main() -> io::Result<()> {
  let load_env = std::fs::metadata(".env").map(|meta| meta.is_file()).unwrap_or(false);

  if load_env {
    let env_result = dotenv::dotenv();
    println!(".env loaded? {:?}", env_result.is_ok());
  }

  env_logger::init();
  let args = arguments::CommandLineArguments::parse();
  async_std::task::block_on(run(args))
}
