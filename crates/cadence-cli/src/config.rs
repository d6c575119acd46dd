use cadence_core::materialization::GenerationConfig;
use cadence_core::recurrence::DEFAULT_HORIZON_DAYS;
use figment::{providers::{Env, Format, Toml}, Figment};
use serde::Deserialize;

#[derive(Deserialize, Debug)]
pub struct Config {
    /// SQLite file holding tasks and recurring items
    #[serde(default = "default_database_path")]
    pub database_path: String,
    /// Owner of every record this CLI reads or writes
    #[serde(default = "default_user_id")]
    pub user_id: String,
    /// Days shown by `list` when `--days` is not given
    #[serde(default = "default_days")]
    pub default_days: u32,
    #[serde(default)]
    pub generation: GenerationSettings,
}

/// Configuration for lazy generation of recurring tasks
#[derive(Deserialize, Debug)]
pub struct GenerationSettings {
    /// How far past the watermark occurrences are searched, in days
    #[serde(default = "default_horizon_days")]
    pub horizon_days: i64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            horizon_days: default_horizon_days(),
        }
    }
}

impl From<&GenerationSettings> for GenerationConfig {
    fn from(settings: &GenerationSettings) -> Self {
        GenerationConfig {
            horizon_days: settings.horizon_days,
        }
    }
}

fn default_database_path() -> String {
    "cadence.db".to_string()
}

fn default_user_id() -> String {
    "local".to_string()
}

fn default_days() -> u32 {
    7
}

fn default_horizon_days() -> i64 {
    DEFAULT_HORIZON_DAYS
}

impl Config {
    pub fn new() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    fn figment() -> Figment {
        Figment::new()
            .merge(Toml::file("cadence.toml"))
            .merge(Env::prefixed("CADENCE_").split("__"))
    }

    pub fn generation_config(&self) -> GenerationConfig {
        GenerationConfig::from(&self.generation)
    }
}
