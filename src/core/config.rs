/*
 * Manages the packager's persistent settings: custom exclusion rules, the output
 * format, and the tuning knobs for reading and layout. Settings are stored as a
 * JSON document (`config.json`) in the application's local configuration
 * directory, resolved through `path_utils`. Every field has a default, so a
 * missing file or a partial document both load cleanly.
 *
 * It uses a trait-based approach (`ConfigManagerOperations`) so the command line
 * front end can be exercised against a temporary directory in tests. The
 * concrete `CoreConfigManager` normally resolves the platform directory per
 * call, but can be pinned to an explicit directory.
 */
use crate::core::acquisition::{AcquisitionOptions, DEFAULT_READ_WORKERS};
use crate::core::document_packager::{DEFAULT_MAX_PAGES_PER_FILE, LayoutLimits};
use crate::core::exclusion::ExclusionRuleSet;
use crate::core::models::OutputFormat;
use crate::core::path_utils;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "config.json";

#[derive(Debug)]
pub enum ConfigError {
    Io(io::Error),
    Serde(serde_json::Error),
    NoProjectDirectory,
}

impl From<io::Error> for ConfigError {
    fn from(err: io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Serde(err)
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Configuration I/O error: {e}"),
            ConfigError::Serde(e) => write!(f, "Configuration file format error: {e}"),
            ConfigError::NoProjectDirectory => {
                write!(f, "Could not determine the configuration directory")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Serde(e) => Some(e),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackagerConfig {
    pub custom_exclusions: Vec<String>,
    pub use_default_exclusions: bool,
    pub format: OutputFormat,
    pub read_workers: usize,
    pub read_timeout_secs: Option<u64>,
    pub max_pages_per_file: u32,
}

impl Default for PackagerConfig {
    fn default() -> Self {
        PackagerConfig {
            custom_exclusions: Vec::new(),
            use_default_exclusions: true,
            format: OutputFormat::default(),
            read_workers: DEFAULT_READ_WORKERS,
            read_timeout_secs: None,
            max_pages_per_file: DEFAULT_MAX_PAGES_PER_FILE,
        }
    }
}

impl PackagerConfig {
    pub fn rule_set(&self) -> ExclusionRuleSet {
        if self.use_default_exclusions {
            ExclusionRuleSet::with_defaults(&self.custom_exclusions)
        } else {
            ExclusionRuleSet::custom_only(&self.custom_exclusions)
        }
    }

    pub fn acquisition_options(&self) -> AcquisitionOptions {
        AcquisitionOptions {
            workers: self.read_workers.max(1),
            timeout: self.read_timeout_secs.map(Duration::from_secs),
        }
    }

    pub fn layout_limits(&self) -> LayoutLimits {
        LayoutLimits {
            max_pages_per_file: self.max_pages_per_file.max(1),
        }
    }
}

pub trait ConfigManagerOperations: Send + Sync {
    fn load_config(&self, app_name: &str) -> Result<PackagerConfig>;
    fn save_config(&self, app_name: &str, config: &PackagerConfig) -> Result<PathBuf>;
}

pub struct CoreConfigManager {
    config_dir_override: Option<PathBuf>,
}

impl CoreConfigManager {
    pub fn new() -> Self {
        CoreConfigManager {
            config_dir_override: None,
        }
    }

    /*
     * Creates a manager that reads and writes `config.json` inside `dir` instead
     * of the platform configuration directory.
     */
    pub fn with_config_dir(dir: PathBuf) -> Self {
        CoreConfigManager {
            config_dir_override: Some(dir),
        }
    }

    fn config_dir(&self, app_name: &str) -> Result<PathBuf> {
        match &self.config_dir_override {
            Some(dir) => {
                if !dir.exists() {
                    fs::create_dir_all(dir)?;
                }
                Ok(dir.clone())
            }
            None => path_utils::get_base_app_config_local_dir(app_name)
                .ok_or(ConfigError::NoProjectDirectory),
        }
    }

    pub fn config_file_path(&self, app_name: &str) -> Result<PathBuf> {
        Ok(self.config_dir(app_name)?.join(CONFIG_FILENAME))
    }
}

impl Default for CoreConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManagerOperations for CoreConfigManager {
    /*
     * Loads the configuration for `app_name`. A missing or empty file yields the
     * defaults; a malformed file is an error rather than being silently replaced.
     */
    fn load_config(&self, app_name: &str) -> Result<PackagerConfig> {
        log::trace!("ConfigManager: Loading configuration for app '{app_name}'");
        let file_path = self.config_file_path(app_name)?;

        if !file_path.exists() {
            log::debug!("ConfigManager: Config file {file_path:?} does not exist, using defaults.");
            return Ok(PackagerConfig::default());
        }
        if fs::metadata(&file_path)?.len() == 0 {
            log::debug!("ConfigManager: Config file {file_path:?} is empty, using defaults.");
            return Ok(PackagerConfig::default());
        }

        let reader = BufReader::new(File::open(&file_path)?);
        let config: PackagerConfig = serde_json::from_reader(reader)?;
        log::debug!(
            "ConfigManager: Loaded configuration from {file_path:?} ({} custom exclusion(s)).",
            config.custom_exclusions.len()
        );
        Ok(config)
    }

    fn save_config(&self, app_name: &str, config: &PackagerConfig) -> Result<PathBuf> {
        log::trace!("ConfigManager: Saving configuration for app '{app_name}'");
        let file_path = self.config_file_path(app_name)?;
        let mut writer = BufWriter::new(File::create(&file_path)?);
        serde_json::to_writer_pretty(&mut writer, config)?;
        writer.flush()?;
        log::debug!("ConfigManager: Saved configuration to {file_path:?}.");
        Ok(file_path)
    }
}
