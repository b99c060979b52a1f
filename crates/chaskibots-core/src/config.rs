//! Application configuration management.
//!
//! Configuration is read from an optional JSON file (`$CHASKI_CONFIG`, or
//! `~/.config/chaskibots-edu/config.json`), then individual values are
//! overridden from the environment. The Airtable API key and base id are
//! required; everything else has a default.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Application name used for config directory paths
const APP_NAME: &str = "chaskibots-edu";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable pointing at an explicit config file
const CONFIG_PATH_VAR: &str = "CHASKI_CONFIG";

const DEFAULT_API_URL: &str = "https://api.airtable.com/v0";

/// HTTP request timeout in seconds.
/// Airtable list calls on large tables can take several seconds per page.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

const DEFAULT_PORT: u16 = 3000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: String, value: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AirtableConfig {
    pub api_key: String,
    pub base_id: String,
    pub api_url: String,
    pub timeout_secs: u64,
}

impl Default for AirtableConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_id: String::new(),
            api_url: DEFAULT_API_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Airtable table names, overridable per deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TableNames {
    pub levels: String,
    pub programs: String,
    pub courses: String,
    pub schools: String,
    pub kits: String,
    pub lessons: String,
    pub users: String,
    pub teacher_courses: String,
    pub tasks: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            levels: "levels".to_string(),
            programs: "programs".to_string(),
            courses: "courses".to_string(),
            schools: "schools".to_string(),
            kits: "kits".to_string(),
            lessons: "lessons".to_string(),
            users: "users".to_string(),
            teacher_courses: "teacher_courses".to_string(),
            tasks: "tasks".to_string(),
        }
    }
}

/// Cache lifetimes per resource, in seconds.
///
/// Slowly-changing catalog data (levels, kits, lessons) is kept longer;
/// people and assignments change during a school day and expire quickly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheTtls {
    pub levels_secs: u64,
    pub programs_secs: u64,
    pub courses_secs: u64,
    pub schools_secs: u64,
    pub kits_secs: u64,
    pub lessons_secs: u64,
    pub users_secs: u64,
    pub teacher_courses_secs: u64,
    pub tasks_secs: u64,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            levels_secs: 30 * 60,
            programs_secs: 30 * 60,
            courses_secs: 10 * 60,
            schools_secs: 30 * 60,
            kits_secs: 60 * 60,
            lessons_secs: 60 * 60,
            users_secs: 5 * 60,
            teacher_courses_secs: 5 * 60,
            tasks_secs: 2 * 60,
        }
    }
}

impl CacheTtls {
    pub fn levels(&self) -> Duration {
        Duration::from_secs(self.levels_secs)
    }

    pub fn programs(&self) -> Duration {
        Duration::from_secs(self.programs_secs)
    }

    pub fn courses(&self) -> Duration {
        Duration::from_secs(self.courses_secs)
    }

    pub fn schools(&self) -> Duration {
        Duration::from_secs(self.schools_secs)
    }

    pub fn kits(&self) -> Duration {
        Duration::from_secs(self.kits_secs)
    }

    pub fn lessons(&self) -> Duration {
        Duration::from_secs(self.lessons_secs)
    }

    pub fn users(&self) -> Duration {
        Duration::from_secs(self.users_secs)
    }

    pub fn teacher_courses(&self) -> Duration {
        Duration::from_secs(self.teacher_courses_secs)
    }

    pub fn tasks(&self) -> Duration {
        Duration::from_secs(self.tasks_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub port: u16,
    pub airtable: AirtableConfig,
    pub tables: TableNames,
    pub cache_ttls: CacheTtls,
    /// Directory for rolling log files; stderr only when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            airtable: AirtableConfig::default(),
            tables: TableNames::default(),
            cache_ttls: CacheTtls::default(),
            log_dir: None,
        }
    }
}

impl Config {
    /// Load the config file (if any), apply environment overrides and validate.
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => {
                debug!(path = %path.display(), "Loading config file");
                let contents = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))?;
                serde_json::from_str(&contents)
                    .with_context(|| format!("Failed to parse config file: {}", path.display()))?
            }
            _ => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_VAR) {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|dir| dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Override settings from environment-style lookups.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("AIRTABLE_API_KEY") {
            self.airtable.api_key = v;
        }
        if let Some(v) = get("AIRTABLE_BASE_ID") {
            self.airtable.base_id = v;
        }
        if let Some(v) = get("AIRTABLE_API_URL") {
            self.airtable.api_url = v;
        }
        if let Some(v) = get("AIRTABLE_TIMEOUT_SECS") {
            self.airtable.timeout_secs = parse("AIRTABLE_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("PORT") {
            self.port = parse("PORT", &v)?;
        }
        if let Some(v) = get("LOG_DIR") {
            self.log_dir = Some(PathBuf::from(v));
        }

        let tables = &mut self.tables;
        for (key, slot) in [
            ("AIRTABLE_TABLE_LEVELS", &mut tables.levels),
            ("AIRTABLE_TABLE_PROGRAMS", &mut tables.programs),
            ("AIRTABLE_TABLE_COURSES", &mut tables.courses),
            ("AIRTABLE_TABLE_SCHOOLS", &mut tables.schools),
            ("AIRTABLE_TABLE_KITS", &mut tables.kits),
            ("AIRTABLE_TABLE_LESSONS", &mut tables.lessons),
            ("AIRTABLE_TABLE_USERS", &mut tables.users),
            ("AIRTABLE_TABLE_TEACHER_COURSES", &mut tables.teacher_courses),
            ("AIRTABLE_TABLE_TASKS", &mut tables.tasks),
        ] {
            if let Some(v) = get(key) {
                *slot = v;
            }
        }

        let ttls = &mut self.cache_ttls;
        for (key, slot) in [
            ("CACHE_TTL_LEVELS_SECS", &mut ttls.levels_secs),
            ("CACHE_TTL_PROGRAMS_SECS", &mut ttls.programs_secs),
            ("CACHE_TTL_COURSES_SECS", &mut ttls.courses_secs),
            ("CACHE_TTL_SCHOOLS_SECS", &mut ttls.schools_secs),
            ("CACHE_TTL_KITS_SECS", &mut ttls.kits_secs),
            ("CACHE_TTL_LESSONS_SECS", &mut ttls.lessons_secs),
            ("CACHE_TTL_USERS_SECS", &mut ttls.users_secs),
            ("CACHE_TTL_TEACHER_COURSES_SECS", &mut ttls.teacher_courses_secs),
            ("CACHE_TTL_TASKS_SECS", &mut ttls.tasks_secs),
        ] {
            if let Some(v) = get(key) {
                *slot = parse(key, &v)?;
            }
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.airtable.api_key.trim().is_empty() {
            return Err(ConfigError::Missing("AIRTABLE_API_KEY"));
        }
        if self.airtable.base_id.trim().is_empty() {
            return Err(ConfigError::Missing("AIRTABLE_BASE_ID"));
        }
        if !self.airtable.base_id.starts_with("app") {
            warn!(base_id = %self.airtable.base_id, "Airtable base ids normally start with 'app'");
        }
        Ok(())
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key: key.to_string(),
        value: value.to_string(),
    })
}
