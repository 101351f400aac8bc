use anyhow::Result;
use clap::error::ErrorKind;
use clap::Parser;
use std::path::PathBuf;
use tracing::Level;

use sysinternals_sync::commands;
use sysinternals_sync::core::config::{Config, USAGE};

#[derive(Parser)]
#[clap(name = "sysinternals-sync")]
#[clap(about = "Download the Sysinternals Suite and update a local copy")]
#[clap(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Directory that holds the Sysinternals tools (created if missing)
    #[clap(value_name = "DIRECTORY")]
    directories: Vec<PathBuf>,

    /// Reuse the archive already in the downloads directory instead of fetching it again
    #[clap(long)]
    skip_download_if_cached: bool,

    /// Stage the archive here instead of the user's downloads directory
    #[clap(long, value_name = "PATH")]
    downloads_dir: Option<PathBuf>,

    /// Print diagnostic output to stderr
    #[clap(short, long)]
    verbose: bool,
}

fn usage_exit() -> ! {
    println!("{USAGE}");
    std::process::exit(1);
}

fn main() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(_) => usage_exit(),
    };

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let target_dir = match commands::sync::resolve_target_dir(&cli.directories) {
        Ok(dir) => dir,
        Err(e) if e.is_usage() => usage_exit(),
        Err(e) => return Err(e.into()),
    };

    let config = Config::new(target_dir)
        .with_skip_download_if_cached(cli.skip_download_if_cached)
        .with_downloads_dir(cli.downloads_dir);

    if let Err(e) = commands::sync::sync_tools(&config) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    Ok(())
}
