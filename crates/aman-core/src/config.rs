//! Configuration for aman.
//!
//! Settings are layered, later layers overriding earlier ones:
//!
//! 1. **Defaults**: cache in `~/.aman/cache`, plain JSON caches, `.doc` sources
//! 2. **Config file**: TOML, either given explicitly or found in the platform
//!    config directory (see [`Config::default_path`])
//! 3. **Environment**: `AMANPATH`, `AMANCACHE`, `PAGER` and `MANPAGER`
//! 4. **Command line**: applied by the binary on the returned value
//!
//! ## Example Configuration File
//!
//! ```toml
//! man_paths = ["/opt/amiga/autodocs"]
//! cache_dir = "/home/user/.aman/cache"
//! pager = "less -R"
//! compress = true
//! suffix = ".doc"
//! ```
//!
//! ```rust
//! use aman_core::Config;
//!
//! let mut config = Config::default();
//! config.apply_env(|key| (key == "AMANPATH").then(|| "/opt/autodocs".to_string()));
//! assert_eq!(config.man_paths.len(), 1);
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::docset::DEFAULT_SUFFIX;
use crate::storage::Compression;
use crate::{Error, Result};

/// Directories holding autodoc sources, separated like `PATH`.
pub const ENV_MAN_PATH: &str = "AMANPATH";
/// Cache directory.
pub const ENV_CACHE_DIR: &str = "AMANCACHE";
/// Display program.
pub const ENV_PAGER: &str = "PAGER";
/// Display program, preferred over `PAGER`.
pub const ENV_MAN_PAGER: &str = "MANPAGER";

/// Effective settings of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directories scanned for autodoc files, in order.
    pub man_paths: Vec<PathBuf>,
    /// Directory holding cache and index files.
    pub cache_dir: PathBuf,
    /// Program used to display pages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pager: Option<String>,
    /// Gzip cache and index files.
    pub compress: bool,
    /// File suffix of autodoc sources.
    pub suffix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            man_paths: Vec::new(),
            cache_dir: Self::default_cache_dir(),
            pager: None,
            compress: false,
            suffix: DEFAULT_SUFFIX.to_string(),
        }
    }
}

impl Config {
    /// `~/.aman/cache`, or a relative `.aman/cache` when no home directory
    /// can be determined.
    pub fn default_cache_dir() -> PathBuf {
        directories::BaseDirs::new().map_or_else(
            || PathBuf::from(".aman").join("cache"),
            |base| base.home_dir().join(".aman").join("cache"),
        )
    }

    /// Location of the config file in the platform config directory:
    /// - Linux: `~/.config/aman/config.toml`
    /// - macOS: `~/Library/Application Support/aman/config.toml`
    /// - Windows: `%APPDATA%\aman\config\config.toml`
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "aman")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Read a TOML config file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config '{}': {e}", path.display()))
        })?;
        toml::from_str(&content).map_err(|e| {
            Error::Config(format!("Failed to parse config '{}': {e}", path.display()))
        })
    }

    /// Load `path` if given, else the default config file if it exists,
    /// else the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => {
                debug!("config: no config file, using defaults");
                Ok(Self::default())
            },
        }
    }

    /// Override settings from environment variables returned by `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(paths) = lookup(ENV_MAN_PATH) {
            self.man_paths = env::split_paths(&paths)
                .filter(|path| !path.as_os_str().is_empty())
                .collect();
            debug!("config: man paths from {ENV_MAN_PATH}: {:?}", self.man_paths);
        }
        if let Some(dir) = lookup(ENV_CACHE_DIR) {
            self.cache_dir = PathBuf::from(dir);
        }
        if let Some(pager) = lookup(ENV_MAN_PAGER).or_else(|| lookup(ENV_PAGER)) {
            self.pager = Some(pager);
        }
    }

    /// Compression used for cache and index files.
    pub const fn compression(&self) -> Compression {
        Compression::from_flag(self.compress)
    }

    /// Check that the config is usable and create the cache directory.
    pub fn finalize(&self) -> Result<()> {
        if self.man_paths.is_empty() {
            return Err(Error::Config(format!(
                "No path for autodocs given (use --man-path or {ENV_MAN_PATH})"
            )));
        }
        if !self.cache_dir.is_dir() {
            debug!("config: creating cache dir '{}'", self.cache_dir.display());
            fs::create_dir_all(&self.cache_dir).map_err(|e| {
                Error::Config(format!(
                    "Failed to create cache directory '{}': {e}",
                    self.cache_dir.display()
                ))
            })?;
        }
        Ok(())
    }

    /// Write the config as TOML, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create config directory: {e}")))?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {e}")))?;
        fs::write(path, content)
            .map_err(|e| Error::Config(format!("Failed to write config: {e}")))?;
        Ok(())
    }
}
