//! Concourse resources and resource types with structural equality and
//! non-destructive update-merge.

mod resource_type;
pub mod source;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::document::decode;
use crate::error::BulletinError;
use crate::report::Reporter;
use crate::util::merge_extra;

pub use resource_type::{update_resource_types, ResourceType, ResourceTypeSet, ResourceTypes};
pub use source::SourceKind;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub check_every: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Value>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub webhook_token: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            ..Self::default()
        }
    }

    pub fn with_source(mut self, source: Value) -> Self {
        self.source = Some(source);
        self
    }

    pub fn same_as(&self, other: &Resource, reporter: &dyn Reporter) -> Result<bool> {
        if self.name != other.name
            || self.kind != other.kind
            || self.tags != other.tags
            || self.check_every != other.check_every
            || self.webhook_token != other.webhook_token
            || self.extra != other.extra
        {
            return Ok(false);
        }
        match SourceKind::of(&self.kind) {
            Some(kind) => kind
                .same(self.source.as_ref(), other.source.as_ref())
                .with_context(|| format!("unable to compare resource '{}'", self.name)),
            None => {
                reporter.debug(
                    "unrecognized resource type, comparing raw source",
                    Some(json!({ "resource": self.name, "type": self.kind })),
                );
                Ok(self.source == other.source)
            }
        }
    }

    /// Returns `self` updated with the non-empty parts of `new`.
    pub fn update_with(&self, new: &Resource, reporter: &dyn Reporter) -> Result<Resource> {
        if self.same_as(new, reporter)? {
            return Ok(self.clone());
        }
        if !new.kind.is_empty() && new.kind != self.kind {
            return Err(BulletinError::TypeMismatchOnUpdate {
                name: self.name.clone(),
                old: self.kind.clone(),
                new: new.kind.clone(),
            }
            .into());
        }

        let mut merged = self.clone();
        if !new.check_every.is_empty() {
            merged.check_every = new.check_every.clone();
        }
        if !new.webhook_token.is_empty() {
            merged.webhook_token = new.webhook_token.clone();
        }
        if !new.tags.is_empty() {
            merged.tags = new.tags.clone();
        }
        merge_extra(&mut merged.extra, &new.extra);
        match SourceKind::of(&self.kind) {
            Some(kind) => {
                let source = kind
                    .merge(self.source.as_ref(), new.source.as_ref())
                    .with_context(|| format!("unable to update resource '{}'", self.name))?;
                merged.source = non_empty(source);
            }
            None => reporter.warn(
                "unrecognized resource type, source left untouched",
                Some(json!({ "resource": self.name, "type": self.kind })),
            ),
        }
        Ok(merged)
    }
}

pub(crate) fn non_empty(source: Value) -> Option<Value> {
    match &source {
        Value::Null => None,
        Value::Object(map) if map.is_empty() => None,
        _ => Some(source),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resources {
    #[serde(default)]
    pub resources: Vec<Resource>,
}

impl Resources {
    pub fn from_document(doc: &Value) -> Result<Self> {
        decode(doc, "resources")
    }
}

/// Ordered collection in which structurally equal resources appear once.
#[derive(Debug, Clone, Default)]
pub struct ResourceSet {
    items: Vec<Resource>,
}

impl ResourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `resource` unless an equal one is already present.
    pub fn add(&mut self, resource: Resource, reporter: &dyn Reporter) -> Result<bool> {
        for existing in &self.items {
            if existing.same_as(&resource, reporter)? {
                return Ok(false);
            }
        }
        self.items.push(resource);
        Ok(true)
    }

    pub fn items(&self) -> &[Resource] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_vec(self) -> Vec<Resource> {
        self.items
    }
}

/// Merges `new` into `base` by name. Resources missing from `base` are not added.
pub fn update_resources(
    base: &[Resource],
    new: &[Resource],
    reporter: &dyn Reporter,
) -> Result<Vec<Resource>> {
    base.iter()
        .map(|old| match new.iter().rev().find(|candidate| candidate.name == old.name) {
            Some(update) => old.update_with(update, reporter),
            None => Ok(old.clone()),
        })
        .collect()
}
