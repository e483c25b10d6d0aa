use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::report::Level;

pub const SETTINGS_FILE: &str = "bulletin.toml";
pub const TARGET_ENV: &str = "BULLETIN_TARGET";
pub const LOG_ENV: &str = "BULLETIN_LOG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub target: PathBuf,
    pub log_level: Level,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            target: PathBuf::from("."),
            log_level: Level::Warn,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsFile {
    target: Option<PathBuf>,
    log_level: Option<String>,
}

/// Values given on the command line; `None` defers to lower layers.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub target: Option<PathBuf>,
    pub log_level: Option<String>,
}

impl Settings {
    // bulletin.toml is read from the directory named by the command line or the environment
    pub fn resolve<F>(overrides: &Overrides, env: F) -> Result<Settings>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Settings::default();
        let env_target = env(TARGET_ENV).filter(|value| !value.is_empty()).map(PathBuf::from);
        let base = overrides
            .target
            .clone()
            .or_else(|| env_target.clone())
            .unwrap_or_else(|| settings.target.clone());

        if let Some(file) = read_settings_file(&base)? {
            if let Some(target) = file.target {
                settings.target = base.join(target);
            }
            if let Some(level) = file.log_level {
                settings.log_level = parse_level(&level, SETTINGS_FILE)?;
            }
        }

        if let Some(target) = env_target {
            settings.target = target;
        }
        if let Some(level) = env(LOG_ENV).filter(|value| !value.is_empty()) {
            settings.log_level = parse_level(&level, LOG_ENV)?;
        }

        if let Some(target) = &overrides.target {
            settings.target = target.clone();
        }
        if let Some(level) = &overrides.log_level {
            settings.log_level = parse_level(level, "--log-level")?;
        }
        Ok(settings)
    }

    pub fn from_env(overrides: &Overrides) -> Result<Settings> {
        Self::resolve(overrides, |key| std::env::var(key).ok())
    }
}

fn read_settings_file(dir: &Path) -> Result<Option<SettingsFile>> {
    let path = dir.join(SETTINGS_FILE);
    if !path.is_file() {
        return Ok(None);
    }
    let content = fs::read_to_string(&path)
        .with_context(|| format!("unable to read settings: {}", path.display()))?;
    let parsed = toml::from_str::<SettingsFile>(&content)
        .with_context(|| format!("invalid settings: {}", path.display()))?;
    Ok(Some(parsed))
}

fn parse_level(text: &str, origin: &str) -> Result<Level> {
    text.parse::<Level>()
        .with_context(|| format!("invalid log level from {origin}"))
}
