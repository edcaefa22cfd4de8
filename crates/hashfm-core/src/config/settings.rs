//! File-browser configuration loaded from a TOML file.
//!
//! Every field has a default, so a host can run without any config file.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::fs::paths::DEFAULT_MFS_ROOT;
use crate::nav::sort::{SortBy, SortSpec};

/// Top-level configuration.
///
/// Call [`FilesConfig::load`] to read from a TOML path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesConfig {
    /// Route prefix under which the browser lives (e.g. `/files`).
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Logical prefix of the mutable namespace.
    #[serde(default = "default_mfs_root")]
    pub mfs_root: String,
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default)]
    pub listing: ListingConfig,
    #[serde(default)]
    pub sort: SortConfig,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            mfs_root: default_mfs_root(),
            gateway_url: default_gateway_url(),
            api_url: default_api_url(),
            listing: ListingConfig::default(),
            sort: SortConfig::default(),
        }
    }
}

impl FilesConfig {
    /// Loads configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// - [`CoreError::NotFound`] if the file does not exist.
    /// - [`CoreError::ConfigParse`] if the TOML is malformed.
    pub fn load(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CoreError::NotFound(path.to_path_buf()),
            _ => CoreError::Io(e),
        })?;
        toml::from_str(&content).map_err(|e| CoreError::ConfigParse(e.to_string()))
    }

    /// The sort order a fresh state starts with.
    pub fn initial_sort(&self) -> SortSpec {
        SortSpec::new(self.sort.by, self.sort.asc)
    }
}

/// Listing resolution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingConfig {
    /// Directories with fewer children than this get each child directory
    /// stat'ed for its cumulative size.
    #[serde(default = "default_eager_stat_threshold")]
    pub eager_stat_threshold: usize,
    /// How long a fetch must be pending before the loading indicator shows.
    #[serde(default = "default_loading_delay_ms")]
    pub loading_delay_ms: u64,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            eager_stat_threshold: default_eager_stat_threshold(),
            loading_delay_ms: default_loading_delay_ms(),
        }
    }
}

impl ListingConfig {
    pub fn loading_delay(&self) -> Duration {
        Duration::from_millis(self.loading_delay_ms)
    }
}

/// Initial sort order and directory grouping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortConfig {
    #[serde(default)]
    pub by: SortBy,
    #[serde(default = "default_true")]
    pub asc: bool,
    /// Sort directories and files together instead of directories first.
    #[serde(default = "default_mix_directories")]
    pub mix_directories: bool,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            by: SortBy::Name,
            asc: true,
            mix_directories: default_mix_directories(),
        }
    }
}

fn default_base_url() -> String {
    "/files".to_string()
}

fn default_mfs_root() -> String {
    DEFAULT_MFS_ROOT.to_string()
}

fn default_gateway_url() -> String {
    "https://ipfs.io".to_string()
}

fn default_api_url() -> String {
    "http://127.0.0.1:5001".to_string()
}

fn default_eager_stat_threshold() -> usize {
    100
}

fn default_loading_delay_ms() -> u64 {
    1000
}

fn default_true() -> bool {
    true
}

fn default_mix_directories() -> bool {
    cfg!(target_os = "macos")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn default_config() {
        let config = FilesConfig::default();

        assert_eq!(config.base_url, "/files");
        assert_eq!(config.mfs_root, "/home");
        assert_eq!(config.gateway_url, "https://ipfs.io");
        assert_eq!(config.listing.eager_stat_threshold, 100);
        assert_eq!(config.listing.loading_delay(), Duration::from_secs(1));
        assert_eq!(config.initial_sort(), SortSpec::default());
    }

    #[test]
    fn load_full_toml() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("files.toml");
        fs::write(
            &path,
            r#"
base_url = "/browse"
mfs_root = "/mfs"
gateway_url = "http://localhost:8080"
api_url = "http://localhost:5001"

[listing]
eager_stat_threshold = 10
loading_delay_ms = 250

[sort]
by = "size"
asc = false
mix_directories = true
"#,
        )
        .unwrap();

        let config = FilesConfig::load(&path).unwrap();
        assert_eq!(config.base_url, "/browse");
        assert_eq!(config.mfs_root, "/mfs");
        assert_eq!(config.gateway_url, "http://localhost:8080");
        assert_eq!(config.listing.eager_stat_threshold, 10);
        assert_eq!(config.listing.loading_delay_ms, 250);
        assert_eq!(config.initial_sort(), SortSpec::new(SortBy::Size, false));
        assert!(config.sort.mix_directories);
    }

    #[test]
    fn load_partial_toml_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("files.toml");
        fs::write(&path, "[sort]\nby = \"size\"\n").unwrap();

        let config = FilesConfig::load(&path).unwrap();
        assert_eq!(config.base_url, "/files");
        assert_eq!(config.sort.by, SortBy::Size);
        assert!(config.sort.asc);
        assert_eq!(config.listing.eager_stat_threshold, 100);
    }

    #[test]
    fn load_missing_file() {
        let result = FilesConfig::load(Path::new("/nonexistent/files.toml"));
        assert!(matches!(result, Err(CoreError::NotFound(_))));
    }

    #[test]
    fn load_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.toml");
        fs::write(&path, "this is [not valid toml").unwrap();

        let result = FilesConfig::load(&path);
        assert!(matches!(result, Err(CoreError::ConfigParse(_))));
    }

    #[test]
    fn unknown_sort_key_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("files.toml");
        fs::write(&path, "[sort]\nby = \"date\"\n").unwrap();

        assert!(matches!(
            FilesConfig::load(&path),
            Err(CoreError::ConfigParse(_))
        ));
    }
}
