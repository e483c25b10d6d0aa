use std::fmt;
use std::io::{stderr, Write};
use std::str::FromStr;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use humantime::format_rfc3339;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Level::Trace),
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" | "warning" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            other => Err(anyhow!("unsupported log level: {other}")),
        }
    }
}

/// Sink for non-fatal conditions. Passed explicitly to whatever needs to report.
pub trait Reporter {
    fn emit(&self, level: Level, message: &str, data: Option<Value>);

    fn debug(&self, message: &str, data: Option<Value>) {
        self.emit(Level::Debug, message, data);
    }

    fn info(&self, message: &str, data: Option<Value>) {
        self.emit(Level::Info, message, data);
    }

    fn warn(&self, message: &str, data: Option<Value>) {
        self.emit(Level::Warn, message, data);
    }

    fn error(&self, message: &str, data: Option<Value>) {
        self.emit(Level::Error, message, data);
    }
}

fn current_timestamp() -> String {
    format_rfc3339(std::time::SystemTime::now()).to_string()
}

fn build_entry(
    level: Level,
    message: &str,
    data: Option<Value>,
    tags: &Map<String, Value>,
) -> Map<String, Value> {
    let mut entry = Map::new();
    entry.insert("level".to_string(), Value::String(level.to_string()));
    entry.insert("message".to_string(), Value::String(message.to_string()));
    if let Some(data) = data {
        entry.insert("data".to_string(), data);
    }
    if !tags.is_empty() {
        entry.insert("tags".to_string(), Value::Object(tags.clone()));
    }
    entry.insert("timestamp".to_string(), Value::String(current_timestamp()));
    entry
}

/// Writes JSON log lines to stderr; stdout is reserved for rendered pipelines.
pub struct StderrReporter {
    min_level: Level,
    tags: Map<String, Value>,
}

impl StderrReporter {
    pub fn new(min_level: Level) -> Self {
        let mut tags = Map::new();
        tags.insert(
            "component".to_string(),
            Value::String("bulletin".to_string()),
        );
        Self { min_level, tags }
    }

    pub fn with_tag(mut self, key: &str, value: impl Into<String>) -> Self {
        self.tags
            .insert(key.to_string(), Value::String(value.into()));
        self
    }
}

impl Reporter for StderrReporter {
    fn emit(&self, level: Level, message: &str, data: Option<Value>) {
        if level < self.min_level {
            return;
        }
        let entry = build_entry(level, message, data, &self.tags);
        if let Ok(serialized) = serde_json::to_string(&entry) {
            let _ = writeln!(stderr(), "{}", serialized);
        }
    }
}

#[derive(Default)]
pub struct MemoryReporter {
    entries: Mutex<Vec<Map<String, Value>>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<Map<String, Value>> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    pub fn messages_at(&self, level: Level) -> Vec<String> {
        self.entries()
            .iter()
            .filter(|entry| entry.get("level").and_then(Value::as_str) == Some(level.as_str()))
            .filter_map(|entry| entry.get("message").and_then(Value::as_str))
            .map(str::to_string)
            .collect()
    }
}

impl Reporter for MemoryReporter {
    fn emit(&self, level: Level, message: &str, data: Option<Value>) {
        let entry = build_entry(level, message, data, &Map::new());
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry);
        }
    }
}

pub struct SilentReporter;

impl Reporter for SilentReporter {
    fn emit(&self, _level: Level, _message: &str, _data: Option<Value>) {}
}
