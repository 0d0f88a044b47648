#![allow(unsafe_code)]

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod daemon;
mod settings;

use cli::Cli;
use commands::dispatch;

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let code = match dispatch(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("xcover: {err:#}");
            1
        }
    };
    std::process::exit(code);
}
