mod api;
mod artifacts;
mod catalog;
mod categories;
mod config;
mod durations;
mod errors;
mod events;
mod naming;
mod openapi;
mod query;
mod service;
mod shuffle;
mod startup;
mod state;
#[cfg(test)]
mod test_support;
mod transcoder;
mod watcher;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GALLERY_GIT_SHA"),
    " ",
    env!("GALLERY_BUILD_DATE"),
    ")"
);

#[derive(Parser, Debug)]
#[command(name = "gallery-server", version = VERSION)]
pub(crate) struct Args {
    /// HTTP bind address, e.g. 0.0.0.0:3000
    #[arg(long)]
    bind: Option<std::net::SocketAddr>,

    /// Media library root directory
    #[arg(long)]
    media_dir: Option<PathBuf>,

    /// Optional server config file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[actix_web::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,actix_web=info,gallery_server=info")
        }))
        .init();

    startup::run(args).await
}
