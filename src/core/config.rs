use std::path::PathBuf;

pub const ARCHIVE_URL: &str = "https://download.sysinternals.com/files/SysinternalsSuite.zip";
pub const ARCHIVE_NAME: &str = "SysinternalsSuite.zip";

pub const USAGE: &str = "Usage: sysinternals-sync <DirectoryName>
       where <DirectoryName> is the directory that holds your Sysinternals tools.
       If <DirectoryName> doesn't exist, it will be created.";

/// Settings for a single sync run.
#[derive(Debug, Clone)]
pub struct Config {
    pub target_dir: PathBuf,
    pub archive_url: String,
    pub archive_name: String,
    pub skip_download_if_cached: bool,
    pub downloads_dir: Option<PathBuf>,
}

impl Config {
    pub fn new(target_dir: PathBuf) -> Self {
        Config {
            target_dir,
            archive_url: ARCHIVE_URL.to_string(),
            archive_name: ARCHIVE_NAME.to_string(),
            skip_download_if_cached: false,
            downloads_dir: None,
        }
    }

    pub fn with_skip_download_if_cached(mut self, skip: bool) -> Self {
        self.skip_download_if_cached = skip;
        self
    }

    pub fn with_downloads_dir(mut self, downloads_dir: Option<PathBuf>) -> Self {
        self.downloads_dir = downloads_dir;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_config_uses_fixed_archive() {
        let config = Config::new(PathBuf::from("tools"));
        assert_eq!(config.archive_url, ARCHIVE_URL);
        assert_eq!(config.archive_name, "SysinternalsSuite.zip");
        assert!(!config.skip_download_if_cached);
        assert!(config.downloads_dir.is_none());
    }

    #[test]
    fn test_builder_flags() {
        let config = Config::new(PathBuf::from("tools"))
            .with_skip_download_if_cached(true)
            .with_downloads_dir(Some(PathBuf::from("dl")));
        assert!(config.skip_download_if_cached);
        assert_eq!(config.downloads_dir, Some(PathBuf::from("dl")));
    }
}
