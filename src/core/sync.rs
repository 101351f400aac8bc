use crate::core::version_info::product_version;
use crate::error::{Result, SyncError};
use crate::utils::fs;
use chrono::{DateTime, Local, NaiveDate, TimeZone};
use std::fmt;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use zip::ZipArchive;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Created {
        name: String,
        version: Option<String>,
    },
    Updated {
        name: String,
        old_version: Option<String>,
        new_version: Option<String>,
    },
    Unchanged {
        name: String,
    },
}

impl SyncOutcome {
    pub fn is_change(&self) -> bool {
        !matches!(self, SyncOutcome::Unchanged { .. })
    }
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncOutcome::Created { name, version } => {
                write!(f, "Creating {name} version {}", version.as_deref().unwrap_or(""))
            }
            SyncOutcome::Updated {
                name,
                old_version,
                new_version,
            } => write!(
                f,
                "Updating {name} from version {} to {}",
                old_version.as_deref().unwrap_or(""),
                new_version.as_deref().unwrap_or("")
            ),
            SyncOutcome::Unchanged { name } => write!(f, "{name} is up to date"),
        }
    }
}

#[derive(Debug, Default)]
pub struct SyncReport {
    pub outcomes: Vec<SyncOutcome>,
    pub failures: Vec<(String, SyncError)>,
}

impl SyncReport {
    pub fn changes(&self) -> impl Iterator<Item = &SyncOutcome> {
        self.outcomes.iter().filter(|outcome| outcome.is_change())
    }
}

/// Converts a zip entry's DOS timestamp, which carries no zone, to local time.
pub fn entry_timestamp(dt: zip::DateTime) -> Option<DateTime<Local>> {
    let date = NaiveDate::from_ymd_opt(
        i32::from(dt.year()),
        u32::from(dt.month()),
        u32::from(dt.day()),
    )?;
    let naive = date.and_hms_opt(
        u32::from(dt.hour()),
        u32::from(dt.minute()),
        u32::from(dt.second()),
    )?;
    Local.from_local_datetime(&naive).earliest()
}

/// Opens the archive at `archive_path` and synchronizes every entry into
/// `target_dir`. Outcomes are passed to `on_outcome` as they happen.
///
/// Failures on individual entries are collected in the report; the archive is
/// always processed to the end.
pub fn sync_archive(
    archive_path: &Path,
    target_dir: &Path,
    on_outcome: &mut dyn FnMut(&SyncOutcome),
) -> Result<SyncReport> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(file)?;
    sync_entries(&mut archive, target_dir, on_outcome)
}

pub fn sync_entries<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    target_dir: &Path,
    on_outcome: &mut dyn FnMut(&SyncOutcome),
) -> Result<SyncReport> {
    let mut report = SyncReport::default();

    for i in 0..archive.len() {
        let mut entry = match archive.by_index(i) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(index = i, error = %e, "unreadable archive entry");
                report.failures.push((format!("#{i}"), SyncError::from(e)));
                continue;
            }
        };

        if entry.is_dir() {
            continue;
        }

        // Subfolders are flattened; names escaping the archive root are dropped.
        let name = entry
            .enclosed_name()
            .and_then(|path| path.file_name().and_then(|n| n.to_str()).map(str::to_string));
        let Some(name) = name else {
            debug!(entry = entry.name(), "skipping entry without a usable file name");
            continue;
        };

        let target = target_dir.join(&name);
        let timestamp = entry.last_modified().and_then(entry_timestamp);
        let mode = entry.unix_mode();

        match sync_entry(&mut entry, &name, &target, timestamp, mode) {
            Ok(outcome) => {
                debug!(%outcome, "entry processed");
                on_outcome(&outcome);
                report.outcomes.push(outcome);
            }
            Err(e) => {
                warn!(entry = %name, error = %e, "failed to synchronize entry");
                report.failures.push((name, e));
            }
        }
    }

    Ok(report)
}

fn sync_entry<R: Read>(
    entry: &mut R,
    name: &str,
    target: &Path,
    timestamp: Option<DateTime<Local>>,
    mode: Option<u32>,
) -> Result<SyncOutcome> {
    // A dangling symlink is an existing entry; extraction replaces the link
    // itself and never writes through it.
    let Some(metadata) = fs::entry_metadata(target)? else {
        extract(entry, name, target, timestamp, mode)?;
        return Ok(SyncOutcome::Created {
            name: name.to_string(),
            version: product_version(target),
        });
    };

    let on_disk = DateTime::<Local>::from(metadata.modified()?);
    let newer = timestamp.is_some_and(|entry_time| entry_time > on_disk);
    if !newer {
        return Ok(SyncOutcome::Unchanged {
            name: name.to_string(),
        });
    }

    let old_version = product_version(target);
    extract(entry, name, target, timestamp, mode)?;
    Ok(SyncOutcome::Updated {
        name: name.to_string(),
        old_version,
        new_version: product_version(target),
    })
}

/// Writes the entry to a temporary file next to `target` and renames it into
/// place, so a failed copy never leaves a truncated file behind.
fn extract<R: Read>(
    entry: &mut R,
    name: &str,
    target: &Path,
    timestamp: Option<DateTime<Local>>,
    mode: Option<u32>,
) -> Result<()> {
    let failed = |source: std::io::Error| SyncError::Extraction {
        name: name.to_string(),
        source,
    };

    let dir = target.parent().unwrap_or_else(|| Path::new("."));
    let mut staged = NamedTempFile::new_in(dir).map_err(failed)?;
    std::io::copy(entry, &mut staged).map_err(failed)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = mode
            .map(|mode| mode & 0o7777)
            .filter(|mode| mode & 0o600 == 0o600)
            .unwrap_or(0o644);
        std::fs::set_permissions(staged.path(), std::fs::Permissions::from_mode(mode))
            .map_err(failed)?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    if let Some(time) = timestamp {
        fs::set_modified_time(staged.as_file(), time)?;
    }

    staged.persist(target).map_err(|e| failed(e.error))?;
    Ok(())
}
