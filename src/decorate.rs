use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::DecoratorTemplate;
use crate::error::BulletinError;
use crate::shape::StepShape;
use crate::template::TemplateRef;

impl DecoratorTemplate {
    pub fn apply(&self, step: &Value) -> Result<Value> {
        let shape = StepShape::of(step);
        match (shape, step) {
            (StepShape::Put | StepShape::Task, Value::Object(map)) => {
                let mut decorated = map.clone();
                self.hooks.write_onto(&mut decorated);
                Ok(Value::Object(decorated))
            }
            _ => Err(BulletinError::UnsupportedDecoratorTarget {
                decorator: self.def.name.clone(),
                shape: shape.to_string(),
            }
            .into()),
        }
    }
}

/// Wraps `step` with `decorators`: every `before` list in order, the decorated
/// step once per decorator, then every `after` list with the decorators reversed.
pub fn decorate(step: &Value, decorators: &[DecoratorTemplate]) -> Result<Vec<Value>> {
    if decorators.is_empty() {
        return Ok(vec![step.clone()]);
    }
    let mut out = Vec::new();
    for decorator in decorators {
        out.extend(decorator.before.iter().cloned());
    }
    for decorator in decorators {
        out.push(decorator.apply(step)?);
    }
    for decorator in decorators.iter().rev() {
        out.extend(decorator.after.iter().cloned());
    }
    Ok(out)
}

/// A top-level `decorators` entry attaching a decorator to jobs or plan positions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecoratorAttachment {
    #[serde(flatten)]
    pub template: TemplateRef,
    #[serde(default)]
    pub decorate: Vec<String>,
}

/// Where an attachment lands: a whole job, or one step of its plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachTarget {
    pub job: String,
    pub step: Option<String>,
}

impl AttachTarget {
    pub fn parse(target: &str) -> Result<Self> {
        let parts: Vec<&str> = target.split('/').collect();
        match parts.as_slice() {
            [job] => Ok(Self {
                job: job.to_string(),
                step: None,
            }),
            [job, step] => Ok(Self {
                job: job.to_string(),
                step: Some(step.to_string()),
            }),
            _ => Err(BulletinError::invalid(format!("invalid decorate target {target}")).into()),
        }
    }
}

impl DecoratorAttachment {
    pub fn targets(&self) -> Result<Vec<AttachTarget>> {
        self.decorate
            .iter()
            .map(|target| AttachTarget::parse(target))
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attachments {
    #[serde(default)]
    pub decorators: Vec<DecoratorAttachment>,
}
