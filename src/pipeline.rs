use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::document::{decode, parse_yaml, to_yaml};
use crate::report::Reporter;
use crate::resource::{update_resource_types, update_resources, Resource, ResourceType};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    #[serde(default)]
    pub jobs: Vec<String>,
    #[serde(default)]
    pub resources: Vec<String>,
}

/// A rendered Concourse pipeline. Jobs and unmodelled top-level keys are kept
/// as documents so that they survive an update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_types: Vec<ResourceType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<Resource>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<Group>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub jobs: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Pipeline {
    pub fn from_document(doc: &Value) -> Result<Self> {
        decode(doc, "pipeline")
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        Self::from_document(&parse_yaml(text)?)
    }

    pub fn to_yaml(&self) -> Result<String> {
        to_yaml(self)
    }

    pub fn job(&self, name: &str) -> Option<&Value> {
        self.jobs.iter().find(|job| job_name(job) == Some(name))
    }

    pub fn job_names(&self) -> Vec<&str> {
        self.jobs.iter().filter_map(job_name).collect()
    }

    /// Update-merges resources and resource types of `new` into this pipeline.
    /// Groups, jobs and other top-level keys are left as they are.
    pub fn update_with(&mut self, new: &Pipeline, reporter: &dyn Reporter) -> Result<()> {
        self.resources = update_resources(&self.resources, &new.resources, reporter)?;
        self.resource_types =
            update_resource_types(&self.resource_types, &new.resource_types, reporter)?;
        reporter.debug(
            "pipeline updated",
            Some(serde_json::json!({
                "resources": self.resources.len(),
                "resource_types": self.resource_types.len(),
            })),
        );
        Ok(())
    }
}

fn job_name(job: &Value) -> Option<&str> {
    job.get("name").and_then(Value::as_str)
}
