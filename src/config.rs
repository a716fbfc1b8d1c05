use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Environment override for the catalog (source) root
pub const SOURCE_ENV: &str = "IMAGE_SELECTOR_SOURCE_FOLDER";
/// Environment override for the output root
pub const OUTPUT_ENV: &str = "IMAGE_SELECTOR_OUTPUT_FOLDER";

const DEFAULT_SOURCE_DIR: &str = "output";
const DEFAULT_OUTPUT_DIR: &str = "selected_reference_images";

/// Optional on-disk settings (config.toml)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub source_root: Option<PathBuf>,
    #[serde(default)]
    pub output_root: Option<PathBuf>,
}

impl FileConfig {
    /// Load settings from a specific path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Load {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Load {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// Resolved locations of the two trees the tool works on
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Read-only catalog: `<source_root>/<product>/<image>`
    pub source_root: PathBuf,
    /// Write-only selections: `<output_root>/<product>/...`
    pub output_root: PathBuf,
}

impl Config {
    /// Defaults, then the config file, then the environment.
    ///
    /// `config_path` is an explicit file that must exist; without it the
    /// per-user default location is read when present.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match config_path {
            Some(path) => Some(FileConfig::load_from(path)?),
            None => match Self::default_path() {
                Some(path) if path.is_file() => Some(FileConfig::load_from(&path)?),
                _ => None,
            },
        };

        let config = Self::resolve(&Self::app_dir(), file, |key| std::env::var_os(key));
        log::debug!("Using config {:?}", config);
        Ok(config)
    }

    /// Layer file settings and environment lookups over the defaults for `app_dir`
    pub fn resolve(
        app_dir: &Path,
        file: Option<FileConfig>,
        env: impl Fn(&str) -> Option<OsString>,
    ) -> Self {
        let file = file.unwrap_or_default();
        let from_env = |key: &str| env(key).filter(|value| !value.is_empty()).map(PathBuf::from);

        Self {
            source_root: from_env(SOURCE_ENV)
                .or(file.source_root)
                .unwrap_or_else(|| app_dir.join(DEFAULT_SOURCE_DIR)),
            output_root: from_env(OUTPUT_ENV)
                .or(file.output_root)
                .unwrap_or_else(|| app_dir.join(DEFAULT_OUTPUT_DIR)),
        }
    }

    /// Apply command-line overrides
    pub fn with_overrides(mut self, source: Option<PathBuf>, output: Option<PathBuf>) -> Self {
        if let Some(source) = source {
            self.source_root = source;
        }
        if let Some(output) = output {
            self.output_root = output;
        }
        self
    }

    /// Nothing can be reviewed without the catalog
    pub fn require_source(&self) -> Result<(), ConfigError> {
        if self.source_root.is_dir() {
            Ok(())
        } else {
            Err(ConfigError::SourceMissing(self.source_root.clone()))
        }
    }

    /// Directory containing the running executable
    pub fn app_dir() -> PathBuf {
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Per-user config file location:
    /// - Linux: ~/.config/reference-selector/config.toml
    /// - macOS: ~/Library/Application Support/reference-selector/config.toml
    /// - Windows: %APPDATA%\reference-selector\config.toml
    pub fn default_path() -> Option<PathBuf> {
        let mut path = dirs::config_dir()?;
        path.push("reference-selector");
        path.push("config.toml");
        Some(path)
    }
}
