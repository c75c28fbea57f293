use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::backend::{Backend, BackendChoice};
use crate::date::DateZone;
use crate::label::{DEFAULT_TAG_MARKER, LabelStyle};
use crate::macros::{MacroNames, OutputFormat};
use crate::stamp::Generator;

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendChoice,
    pub format: OutputFormat,
    pub timezone: DateZone,
    /// Output file; the backend's default name in the current directory when unset.
    pub output: Option<PathBuf>,
    pub tag_marker: String,
    /// Revision id characters kept for untagged heads; backend default when unset.
    pub revision_length: Option<usize>,
    pub revision_prefix: String,
    pub macros: MacroConfig,
}

/// Output names; backend defaults when unset.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct MacroConfig {
    pub version: Option<String>,
    pub date: Option<String>,
    pub property_prefix: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendChoice::Auto,
            format: OutputFormat::Tex,
            timezone: DateZone::Local,
            output: None,
            tag_marker: DEFAULT_TAG_MARKER.to_string(),
            revision_length: None,
            revision_prefix: String::new(),
            macros: MacroConfig::default(),
        }
    }
}

impl Config {
    /// Config files tried in order when none is given explicitly.
    pub fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("vcs-stamp").join("vcs-stamp.yml"));
        }
        paths.push(PathBuf::from("vcs-stamp.yml"));
        paths
    }

    /// An explicit path must load; otherwise the first readable candidate wins.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        for path in Self::candidate_paths().into_iter().filter(|path| path.exists()) {
            match Self::load_from_file(&path) {
                Ok(config) => return Ok(config),
                Err(e) => log::warn!("Skipping config {}: {:#}", path.display(), e),
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Builds the generator for `backend`, filling unset fields with its defaults.
    pub fn generator(&self, backend: Backend) -> Generator {
        let mut style = LabelStyle::for_backend(backend);
        style.tag_marker = self.tag_marker.clone();
        style.revision_prefix = self.revision_prefix.clone();
        if self.revision_length.is_some() {
            style.revision_length = self.revision_length;
        }

        Generator {
            backend,
            style,
            zone: self.timezone,
            format: self.format,
            names: MacroNames {
                version: self
                    .macros
                    .version
                    .clone()
                    .unwrap_or_else(|| backend.default_version_macro().to_string()),
                date: self
                    .macros
                    .date
                    .clone()
                    .unwrap_or_else(|| backend.default_date_macro().to_string()),
                property_prefix: self
                    .macros
                    .property_prefix
                    .clone()
                    .unwrap_or_else(|| backend.default_property_prefix()),
            },
        }
    }

    pub fn output_path(&self, backend: Backend) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(backend.default_output()))
    }
}
