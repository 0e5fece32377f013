use crate::session::launch;
use anyhow::Result;
use clap::Parser;

mod agents;
mod catalog;
mod cli;
mod config;
mod error;
mod llm;
mod outlet;
mod session;
mod types;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Args::parse();
    let request = args.writer_request()?;
    let config = args.into_config();

    launch(&config, request).await
}
