use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::template::Bindings;
use crate::util::{is_false, lenient_string, lenient_strings};

pub const ON_SUCCESS: &str = "on_success";
pub const ON_FAILURE: &str = "on_failure";
pub const ON_ABORT: &str = "on_abort";
pub const ENSURE: &str = "ensure";

/// Follow-up steps attached to a step or a job. `None` means "leave alone".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepHooks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_success: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_failure: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_abort: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ensure: Option<Value>,
}

impl StepHooks {
    pub fn is_empty(&self) -> bool {
        self.entries().iter().all(|(_, hook)| hook.is_none())
    }

    fn entries(&self) -> [(&'static str, &Option<Value>); 4] {
        [
            (ON_SUCCESS, &self.on_success),
            (ON_FAILURE, &self.on_failure),
            (ON_ABORT, &self.on_abort),
            (ENSURE, &self.ensure),
        ]
    }

    pub fn overlay(&mut self, other: &StepHooks) {
        if other.on_success.is_some() {
            self.on_success = other.on_success.clone();
        }
        if other.on_failure.is_some() {
            self.on_failure = other.on_failure.clone();
        }
        if other.on_abort.is_some() {
            self.on_abort = other.on_abort.clone();
        }
        if other.ensure.is_some() {
            self.ensure = other.ensure.clone();
        }
    }

    pub fn write_onto(&self, step: &mut Map<String, Value>) {
        for (key, hook) in self.entries() {
            if let Some(hook) = hook {
                step.insert(key.to_string(), hook.clone());
            }
        }
    }

    pub fn substituted(&self, bindings: &Bindings) -> Result<StepHooks> {
        Ok(StepHooks {
            on_success: bindings.apply_opt(&self.on_success)?,
            on_failure: bindings.apply_opt(&self.on_failure)?,
            on_abort: bindings.apply_opt(&self.on_abort)?,
            ensure: bindings.apply_opt(&self.ensure)?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepModifiers {
    #[serde(
        default,
        deserialize_with = "lenient_strings",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub tags: Vec<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub timeout: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub attempts: Option<String>,
}

impl StepModifiers {
    pub fn substituted(&self, bindings: &Bindings) -> StepModifiers {
        StepModifiers {
            tags: self
                .tags
                .iter()
                .map(|tag| bindings.apply_str(tag))
                .collect(),
            timeout: self.timeout.as_deref().map(|t| bindings.apply_str(t)),
            attempts: self.attempts.as_deref().map(|a| bindings.apply_str(a)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetStep {
    pub get: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub passed: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub trigger: bool,
}

impl GetStep {
    pub fn to_document(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}
