use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_LOCATION_RADIUS_METERS: f64 = 50.0;
pub const DEFAULT_HAMMING_THRESHOLD: u32 = 8;

const APP_DIR: &str = ".civic-triage";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Toml {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Could not find home directory")]
    NoHomeDir,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DuplicateConfig {
    pub location_radius_meters: f64,
    pub hamming_threshold: u32,
}

impl Default for DuplicateConfig {
    fn default() -> Self {
        Self {
            location_radius_meters: DEFAULT_LOCATION_RADIUS_METERS,
            hamming_threshold: DEFAULT_HAMMING_THRESHOLD,
        }
    }
}

/// Lower-case keyword lists the category classifier scores labels against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryKeywords {
    pub pothole: Vec<String>,
    pub garbage: Vec<String>,
    pub water: Vec<String>,
    pub property_damage: Vec<String>,
    pub environment: Vec<String>,
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

impl Default for CategoryKeywords {
    fn default() -> Self {
        Self {
            pothole: words(&[
                "pothole",
                "sinkhole",
                "crack",
                "hole",
                "road surface",
                "asphalt",
                "tar",
                "puddle",
                "damaged road",
            ]),
            garbage: words(&[
                "garbage",
                "waste",
                "trash",
                "litter",
                "pollution",
                "dumpster",
                "bin",
                "plastic bag",
                "waste container",
            ]),
            water: words(&[
                "flood",
                "flooding",
                "water leak",
                "leak",
                "seepage",
                "sewage",
                "pipe leak",
                "burst pipe",
                "puddle",
                "rain water",
            ]),
            property_damage: words(&[
                "crack",
                "broken wall",
                "broken house",
                "damaged wall",
                "construction damage",
                "building damage",
                "roof damage",
                "structural damage",
            ]),
            environment: words(&[
                "forest",
                "tree",
                "wildfire",
                "smoke",
                "pollution",
                "fire",
                "jungle",
                "deforestation",
            ]),
        }
    }
}

/// What a submission does when the candidate store cannot be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreFailurePolicy {
    /// Fail the submission.
    #[default]
    Block,
    /// Accept as not-duplicate and record a warning.
    Proceed,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmissionConfig {
    pub on_store_failure: StoreFailurePolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub duplicate: DuplicateConfig,
    pub categories: CategoryKeywords,
    pub submission: SubmissionConfig,
}

impl EngineConfig {
    pub fn from_toml_str(contents: &str, origin: &Path) -> Result<Self, ConfigError> {
        let mut config: EngineConfig =
            toml::from_str(contents).map_err(|source| ConfigError::Toml {
                path: origin.display().to_string(),
                source,
            })?;
        config.categories.normalize();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&contents, path)
    }

    /// Load an explicit file, else `~/.civic-triage/config.toml` when it
    /// exists, else the built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        match default_config_path() {
            Ok(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }
}

impl CategoryKeywords {
    /// Keywords are matched against lower-cased labels.
    fn normalize(&mut self) {
        for list in [
            &mut self.pothole,
            &mut self.garbage,
            &mut self.water,
            &mut self.property_damage,
            &mut self.environment,
        ] {
            list.retain(|keyword| !keyword.is_empty());
            for keyword in list.iter_mut() {
                *keyword = keyword.to_lowercase();
            }
        }
    }
}

pub fn app_dir() -> Result<PathBuf, ConfigError> {
    let home_dir = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
    Ok(home_dir.join(APP_DIR))
}

pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    Ok(app_dir()?.join("config.toml"))
}

pub fn default_store_path() -> Result<PathBuf, ConfigError> {
    Ok(app_dir()?.join("reports.jsonl"))
}
