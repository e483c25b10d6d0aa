use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::decode;
use crate::error::BulletinError;
use crate::job::Jobs;
use crate::step::GetStep;
use crate::util::{is_false, lenient_string};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Deps {
    #[serde(default)]
    pub deps: Vec<Dep>,
}

impl Deps {
    pub fn from_document(doc: &Value) -> Result<Self> {
        decode(doc, "deps")
    }

    pub fn inject(&self, jobs: &mut Jobs) -> Result<()> {
        for dep in &self.deps {
            dep.inject(jobs)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dep {
    pub name: String,
    #[serde(default)]
    pub required_by: Vec<Requirements>,
}

impl Dep {
    pub fn inject(&self, jobs: &mut Jobs) -> Result<()> {
        for chain in &self.required_by {
            chain
                .inject(&self.name, jobs)
                .with_context(|| format!("unable to wire resource '{}'", self.name))?;
        }
        Ok(())
    }
}

/// Ordered promotion chain: link `i` only takes versions that passed link `i - 1`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Requirements(pub Vec<DepJobRef>);

impl Requirements {
    pub fn inject(&self, resource: &str, jobs: &mut Jobs) -> Result<()> {
        for (i, link) in self.0.iter().enumerate() {
            let upstream = i.checked_sub(1).map(|prev| self.0[prev].name.as_str());
            let mut job = jobs.get(&link.name)?.clone();

            if !job.add_passed(resource, upstream)? {
                let get = link.get_step(resource, upstream)?;
                if link.is_aggregatable()? {
                    job.add_to_aggregate(get)?;
                } else {
                    job.push_step(get);
                }
            }

            jobs.update(job)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DepJobRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub trigger: bool,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub aggregatable: Option<String>,
}

impl DepJobRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Unset or empty means aggregatable.
    pub fn is_aggregatable(&self) -> Result<bool> {
        match self.aggregatable.as_deref().map(str::trim) {
            None | Some("") => Ok(true),
            Some(text) => parse_bool(text).ok_or_else(|| {
                BulletinError::invalid(format!(
                    "aggregatable of job '{}' must be a boolean, got '{text}'",
                    self.name
                ))
                .into()
            }),
        }
    }

    fn get_step(&self, resource: &str, upstream: Option<&str>) -> Result<Value> {
        GetStep {
            get: resource.to_string(),
            version: self.version.clone(),
            params: self.params.clone(),
            trigger: self.trigger,
            passed: upstream.map(str::to_string).into_iter().collect(),
        }
        .to_document()
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    match text {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregatable_defaults_to_true() {
        let mut link = DepJobRef::new("unit");
        assert!(link.is_aggregatable().unwrap());
        link.aggregatable = Some(String::new());
        assert!(link.is_aggregatable().unwrap());
        link.aggregatable = Some("false".into());
        assert!(!link.is_aggregatable().unwrap());
        link.aggregatable = Some("maybe".into());
        assert!(link.is_aggregatable().is_err());
    }
}
