use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::non_empty;
use super::source::{SourceKind, DOCKER_IMAGE_RESOURCE_TYPE};
use crate::document::decode;
use crate::error::BulletinError;
use crate::report::Reporter;
use crate::util::{is_false, merge_extra, scalar_to_string};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceType {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub privileged: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ResourceType {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            ..Self::default()
        }
    }

    pub fn same_as(&self, other: &ResourceType, reporter: &dyn Reporter) -> Result<bool> {
        if self.name != other.name
            || self.kind != other.kind
            || self.privileged != other.privileged
            || self.tags != other.tags
            || self.extra != other.extra
        {
            return Ok(false);
        }
        if string_map(self.params.as_ref(), &self.name)?
            != string_map(other.params.as_ref(), &other.name)?
        {
            return Ok(false);
        }
        match self.source_kind(reporter) {
            Some(kind) => kind
                .same(self.source.as_ref(), other.source.as_ref())
                .with_context(|| format!("unable to compare resource type '{}'", self.name)),
            None => Ok(self.source == other.source),
        }
    }

    pub fn update_with(&self, new: &ResourceType, reporter: &dyn Reporter) -> Result<ResourceType> {
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
        merged.privileged = new.privileged;
        if !new.tags.is_empty() {
            merged.tags = new.tags.clone();
        }
        if new.params.as_ref().and_then(|params| non_empty(params.clone())).is_some() {
            merged.params = new.params.clone();
        }
        merge_extra(&mut merged.extra, &new.extra);
        if let Some(kind) = self.source_kind(reporter) {
            let source = kind
                .merge(self.source.as_ref(), new.source.as_ref())
                .with_context(|| format!("unable to update resource type '{}'", self.name))?;
            merged.source = non_empty(source);
        }
        Ok(merged)
    }

    fn source_kind(&self, reporter: &dyn Reporter) -> Option<SourceKind> {
        if self.kind == DOCKER_IMAGE_RESOURCE_TYPE {
            return SourceKind::of(&self.kind);
        }
        reporter.debug(
            "resource type source compared as raw document",
            Some(json!({ "resource_type": self.name, "type": self.kind })),
        );
        None
    }
}

/// `params` compared as a flat map of strings, the way they reach the container env.
fn string_map(params: Option<&Value>, owner: &str) -> Result<BTreeMap<String, String>> {
    let Some(params) = params.filter(|params| !params.is_null()) else {
        return Ok(BTreeMap::new());
    };
    let object = params.as_object().ok_or_else(|| {
        BulletinError::invalid(format!("params of resource type '{owner}' must be a mapping"))
    })?;
    object
        .iter()
        .map(|(key, value)| {
            let text = scalar_to_string(value).unwrap_or_else(|| value.to_string());
            Ok((key.clone(), text))
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceTypes {
    #[serde(default)]
    pub resource_types: Vec<ResourceType>,
}

impl ResourceTypes {
    pub fn from_document(doc: &Value) -> Result<Self> {
        decode(doc, "resource types")
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResourceTypeSet {
    items: Vec<ResourceType>,
}

impl ResourceTypeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, resource_type: ResourceType, reporter: &dyn Reporter) -> Result<bool> {
        for existing in &self.items {
            if existing.same_as(&resource_type, reporter)? {
                return Ok(false);
            }
        }
        self.items.push(resource_type);
        Ok(true)
    }

    pub fn items(&self) -> &[ResourceType] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_vec(self) -> Vec<ResourceType> {
        self.items
    }
}

pub fn update_resource_types(
    base: &[ResourceType],
    new: &[ResourceType],
    reporter: &dyn Reporter,
) -> Result<Vec<ResourceType>> {
    base.iter()
        .map(|old| match new.iter().rev().find(|candidate| candidate.name == old.name) {
            Some(update) => old.update_with(update, reporter),
            None => Ok(old.clone()),
        })
        .collect()
}
