use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::BulletinError;
use crate::util::scalar_to_string;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateDef {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub inputs: Map<String, Value>,
}

impl TemplateRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inputs: Map::new(),
        }
    }

    pub fn with_input(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.inputs.insert(name.into(), Value::String(value.into()));
        self
    }
}

pub fn placeholder(name: &str) -> String {
    format!("(({name}))")
}

/// Declared input names paired with their bound values, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    pairs: Vec<(String, String)>,
}

impl Bindings {
    /// Fails on the first declared input without a binding, before anything is substituted.
    pub fn resolve(def: &TemplateDef, reference: &TemplateRef) -> Result<Self> {
        let mut pairs = Vec::with_capacity(def.inputs.len());
        for input in &def.inputs {
            let bound = reference.inputs.get(input).ok_or_else(|| {
                BulletinError::MissingInput {
                    template: def.name.clone(),
                    input: input.clone(),
                }
            })?;
            let value = scalar_to_string(bound).ok_or_else(|| {
                BulletinError::invalid(format!(
                    "input '{input}' of '{}' must be a scalar",
                    reference.name
                ))
            })?;
            pairs.push((input.clone(), value));
        }
        Ok(Self { pairs })
    }

    /// Textual substitution over the serialized document, one declared name at a time.
    pub fn apply(&self, doc: &Value) -> Result<Value> {
        if doc.is_null() || self.pairs.is_empty() {
            return Ok(doc.clone());
        }
        let mut current = doc.clone();
        for (name, value) in &self.pairs {
            let text = serde_json::to_string(&current)?;
            let token = placeholder(name);
            if !text.contains(&token) {
                continue;
            }
            // Placeholders can only sit inside strings, so the value is escaped as string content.
            let replaced = text.replace(&token, &escape_str(value));
            current = serde_json::from_str(&replaced)
                .with_context(|| format!("substituting '{token}' produced an invalid document"))?;
        }
        Ok(current)
    }

    pub fn apply_opt(&self, doc: &Option<Value>) -> Result<Option<Value>> {
        doc.as_ref().map(|value| self.apply(value)).transpose()
    }

    pub fn apply_all(&self, docs: &[Value]) -> Result<Vec<Value>> {
        docs.iter().map(|doc| self.apply(doc)).collect()
    }

    pub fn apply_str(&self, text: &str) -> String {
        self.pairs
            .iter()
            .fold(text.to_string(), |acc, (name, value)| {
                acc.replace(&placeholder(name), value)
            })
    }
}

fn escape_str(value: &str) -> String {
    let quoted = Value::String(value.to_string()).to_string();
    quoted[1..quoted.len() - 1].to_string()
}
