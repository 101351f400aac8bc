use crate::error::{Result, SyncError};
use chrono::{DateTime, Local};
use std::fs::{File, Metadata};
use std::path::Path;
use std::time::SystemTime;

pub fn ensure_dir_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => SyncError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => SyncError::from(e),
        })?;
    }
    Ok(())
}

/// Metadata of whatever sits at `path`, without following symlinks. `None`
/// when nothing is there; a dangling symlink counts as present.
pub fn entry_metadata(path: &Path) -> Result<Option<Metadata>> {
    match std::fs::symlink_metadata(path) {
        Ok(metadata) => Ok(Some(metadata)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Last modification time of `path` in local time. Symlinks report their own
/// time, not the target's.
pub fn modified_time(path: &Path) -> Result<DateTime<Local>> {
    let modified = std::fs::symlink_metadata(path)?.modified()?;
    Ok(DateTime::<Local>::from(modified))
}

pub fn set_modified_time(file: &File, time: DateTime<Local>) -> Result<()> {
    file.set_modified(SystemTime::from(time))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_ensure_dir_exists_is_idempotent() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path().join("a").join("b");

        ensure_dir_exists(&dir).unwrap();
        std::fs::write(dir.join("keep.txt"), b"data").unwrap();
        ensure_dir_exists(&dir).unwrap();

        assert!(dir.is_dir());
        assert_eq!(std::fs::read(dir.join("keep.txt")).unwrap(), b"data");
    }

    #[test]
    fn test_set_and_read_modified_time() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("file.bin");
        let file = File::create(&path).unwrap();

        let time = Local.with_ymd_and_hms(2023, 5, 17, 10, 30, 0).unwrap();
        set_modified_time(&file, time).unwrap();
        drop(file);

        assert_eq!(modified_time(&path).unwrap(), time);

        let earlier = time - Duration::hours(1);
        let file = File::options().write(true).open(&path).unwrap();
        set_modified_time(&file, earlier).unwrap();
        drop(file);
        assert!(modified_time(&path).unwrap() < time);
    }

    #[test]
    fn test_entry_metadata_missing_path() {
        let temp = tempfile::tempdir().unwrap();
        assert!(entry_metadata(&temp.path().join("absent")).unwrap().is_none());
        assert!(entry_metadata(temp.path()).unwrap().is_some());
    }

    #[cfg(unix)]
    #[test]
    fn test_entry_metadata_sees_dangling_symlink() {
        let temp = tempfile::tempdir().unwrap();
        let link = temp.path().join("link.exe");
        std::os::unix::fs::symlink(temp.path().join("nowhere.exe"), &link).unwrap();

        let metadata = entry_metadata(&link).unwrap().unwrap();

        assert!(metadata.file_type().is_symlink());
        assert!(modified_time(&link).is_ok());
    }
}
