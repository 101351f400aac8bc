use crate::core::config::{Config, USAGE};
use crate::core::download::{acquire_archive, ArchiveFetcher, Downloader};
use crate::core::downloads::{default_locator, DownloadsDirLocator, FixedLocator};
use crate::core::sync::{sync_archive, SyncReport};
use crate::error::{Result, SyncError};
use crate::utils::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Validates the positional arguments and makes sure the target directory
/// exists. Exactly one directory must be given.
pub fn resolve_target_dir<P: AsRef<Path>>(args: &[P]) -> Result<PathBuf> {
    let [dir] = args else {
        return Err(SyncError::usage(USAGE));
    };
    let dir = dir.as_ref();
    fs::ensure_dir_exists(dir)?;
    Ok(dir.to_path_buf())
}

pub fn sync_tools(config: &Config) -> Result<SyncReport> {
    let locator: Box<dyn DownloadsDirLocator> = match &config.downloads_dir {
        Some(dir) => Box::new(FixedLocator(dir.clone())),
        None => default_locator(),
    };
    let downloader = Downloader::new()?;
    sync_tools_with(config, locator.as_ref(), &downloader)
}

pub fn sync_tools_with(
    config: &Config,
    locator: &dyn DownloadsDirLocator,
    fetcher: &dyn ArchiveFetcher,
) -> Result<SyncReport> {
    fs::ensure_dir_exists(&config.target_dir)?;

    let archive_path = acquire_archive(config, locator, fetcher)?;
    info!(archive = %archive_path.display(), target = %config.target_dir.display(), "synchronizing");

    let report = sync_archive(&archive_path, &config.target_dir, &mut |outcome| {
        if outcome.is_change() {
            println!("{outcome}");
        }
    })?;

    if report.failures.is_empty() {
        Ok(report)
    } else {
        for (name, e) in &report.failures {
            error!(entry = %name, "{e}");
        }
        Err(SyncError::EntryFailures {
            count: report.failures.len(),
        })
    }
}
