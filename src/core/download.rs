use crate::core::config::Config;
use crate::core::downloads::DownloadsDirLocator;
use crate::error::{Result, SyncError};
use crate::utils::fs;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub trait ArchiveFetcher {
    fn fetch(&self, url: &str, destination: &Path) -> Result<()>;
}

pub struct Downloader {
    client: reqwest::blocking::Client,
}

impl Downloader {
    pub fn new() -> Result<Self> {
        // No request timeout: the archive is large and a slow link should finish.
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("sysinternals-sync/", env!("CARGO_PKG_VERSION")))
            .timeout(None)
            .build()?;
        Ok(Self { client })
    }
}

impl ArchiveFetcher for Downloader {
    fn fetch(&self, url: &str, destination: &Path) -> Result<()> {
        info!(url, destination = %destination.display(), "downloading archive");

        let mut response = self.client.get(url).send()?;
        if !response.status().is_success() {
            debug!(status = %response.status(), "download rejected");
            return Err(SyncError::DownloadFailed {
                url: url.to_string(),
            });
        }

        let mut file = File::create(destination)?;
        let bytes = response.copy_to(&mut file)?;
        debug!(bytes, "download complete");
        Ok(())
    }
}

/// Puts the archive in the downloads directory and returns its path.
///
/// The fetch is skipped when `skip_download_if_cached` is set and a copy is
/// already present.
pub fn acquire_archive(
    config: &Config,
    locator: &dyn DownloadsDirLocator,
    fetcher: &dyn ArchiveFetcher,
) -> Result<PathBuf> {
    let downloads_dir = locator.downloads_dir()?;
    fs::ensure_dir_exists(&downloads_dir)?;
    let destination = downloads_dir.join(&config.archive_name);

    if config.skip_download_if_cached && destination.is_file() {
        info!(path = %destination.display(), "using cached archive");
        return Ok(destination);
    }

    fetcher.fetch(&config.archive_url, &destination)?;
    Ok(destination)
}
