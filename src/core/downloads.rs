//! Discovery of the directory the archive is staged in.
//!
//! On Windows the location is read from the current user's registry, the same
//! value Edge uses for its download folder. Other platforms fall back to the
//! conventional user downloads directory.

use crate::error::{Result, SyncError};
use std::path::PathBuf;
use std::process::Command;
use tracing::debug;

pub const REGISTRY_KEY: &str = r"HKCU\SOFTWARE\Classes\Local Settings\Software\Microsoft\Windows\CurrentVersion\AppContainer\Storage\microsoft.microsoftedge_8wekyb3d8bbwe\MicrosoftEdge\Main";
pub const REGISTRY_VALUE: &str = "Default Download Directory";

pub trait DownloadsDirLocator {
    fn downloads_dir(&self) -> Result<PathBuf>;
}

/// Reads the downloads directory from the registry via `reg query`.
pub struct RegistryLocator;

impl DownloadsDirLocator for RegistryLocator {
    fn downloads_dir(&self) -> Result<PathBuf> {
        debug!(key = REGISTRY_KEY, value = REGISTRY_VALUE, "querying registry");

        let output = Command::new("reg")
            .arg("query")
            .arg(REGISTRY_KEY)
            .arg("/v")
            .arg(REGISTRY_VALUE)
            .output()?;

        if !output.status.success() {
            return Err(SyncError::downloads_dir_not_found(format!(
                "reg query exited with status {:?}",
                output.status.code()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_reg_query_output(&stdout, REGISTRY_VALUE)
            .map(PathBuf::from)
            .ok_or_else(|| {
                SyncError::downloads_dir_not_found(format!(
                    "value '{REGISTRY_VALUE}' missing under {REGISTRY_KEY}"
                ))
            })
    }
}

/// Uses the platform's user downloads directory.
pub struct UserDirsLocator;

impl DownloadsDirLocator for UserDirsLocator {
    fn downloads_dir(&self) -> Result<PathBuf> {
        dirs::download_dir()
            .ok_or_else(|| SyncError::downloads_dir_not_found("no user downloads directory"))
    }
}

/// Always returns the path it was built with.
pub struct FixedLocator(pub PathBuf);

impl DownloadsDirLocator for FixedLocator {
    fn downloads_dir(&self) -> Result<PathBuf> {
        Ok(self.0.clone())
    }
}

pub fn default_locator() -> Box<dyn DownloadsDirLocator> {
    if cfg!(windows) {
        Box::new(RegistryLocator)
    } else {
        Box::new(UserDirsLocator)
    }
}

/// Extracts a value's data from `reg query` output. Lines look like
/// `    <name>    REG_SZ    <data>`.
pub fn parse_reg_query_output(output: &str, value_name: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let rest = line.trim_start().strip_prefix(value_name)?;
        let rest = rest.trim_start();
        let (kind, data) = rest.split_once(char::is_whitespace)?;
        if !kind.starts_with("REG_") {
            return None;
        }
        let data = data.trim();
        if data.is_empty() {
            None
        } else {
            Some(data.to_string())
        }
    })
}
