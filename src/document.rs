use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Parses YAML (or JSON) text into a document. Empty text yields `null`.
pub fn parse_yaml(text: &str) -> Result<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_yaml::from_str(text).context("invalid YAML document")
}

/// Decodes the sections a wrapper struct cares about, ignoring the rest of the document.
pub fn decode<T>(doc: &Value, what: &str) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    if doc.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(doc.clone()).with_context(|| format!("invalid {what} document"))
}

pub fn to_yaml<T: Serialize>(value: &T) -> Result<String> {
    serde_yaml::to_string(value).context("unable to render YAML")
}
