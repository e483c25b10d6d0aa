use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::BulletinError;
use crate::shape::EntryKind;
use crate::step::{StepHooks, StepModifiers};
use crate::template::{Bindings, TemplateDef, TemplateRef};

pub trait Template: Clone + PartialEq + Serialize + DeserializeOwned {
    const KIND: EntryKind;
    const COLLECTION: &'static str;

    fn def(&self) -> &TemplateDef;

    fn populate_with(&self, bindings: &Bindings) -> Result<Self>;

    fn name(&self) -> &str {
        &self.def().name
    }

    fn populate(&self, reference: &TemplateRef) -> Result<Self> {
        let bindings = Bindings::resolve(self.def(), reference)?;
        self.populate_with(&bindings)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepTemplate {
    #[serde(flatten)]
    pub def: TemplateDef,
    #[serde(default)]
    pub step: Value,
}

impl Template for StepTemplate {
    const KIND: EntryKind = EntryKind::Step;
    const COLLECTION: &'static str = "steps";

    fn def(&self) -> &TemplateDef {
        &self.def
    }

    fn populate_with(&self, bindings: &Bindings) -> Result<Self> {
        Ok(StepTemplate {
            def: self.def.clone(),
            step: bindings.apply(&self.step)?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecoratorTemplate {
    #[serde(flatten)]
    pub def: TemplateDef,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub before: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub after: Vec<Value>,
    #[serde(flatten)]
    pub hooks: StepHooks,
    #[serde(flatten)]
    pub modifiers: StepModifiers,
}

impl Template for DecoratorTemplate {
    const KIND: EntryKind = EntryKind::Decorator;
    const COLLECTION: &'static str = "decorators";

    fn def(&self) -> &TemplateDef {
        &self.def
    }

    fn populate_with(&self, bindings: &Bindings) -> Result<Self> {
        Ok(DecoratorTemplate {
            def: self.def.clone(),
            before: bindings.apply_all(&self.before)?,
            after: bindings.apply_all(&self.after)?,
            hooks: self.hooks.substituted(bindings)?,
            modifiers: self.modifiers.substituted(bindings),
        })
    }
}

/// Templates indexed by name. The index is rebuilt whenever the entry list changes.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog<T> {
    entries: Vec<T>,
    index: HashMap<String, usize>,
}

pub type StepCatalog = Catalog<StepTemplate>;
pub type DecoratorCatalog = Catalog<DecoratorTemplate>;

impl<T: Template> Default for Catalog<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<T: Template> Catalog<T> {
    pub fn new(entries: Vec<T>) -> Self {
        let mut catalog = Self {
            entries,
            index: HashMap::new(),
        };
        catalog.reindex();
        catalog
    }

    pub fn from_document(doc: &Value) -> Result<Self> {
        let Some(raw) = doc.get(T::COLLECTION) else {
            return Ok(Self::default());
        };
        if raw.is_null() {
            return Ok(Self::default());
        }
        let items = raw.as_array().ok_or_else(|| {
            BulletinError::invalid(format!("'{}' must be a list", T::COLLECTION))
        })?;
        let mut entries = Vec::with_capacity(items.len());
        for item in items {
            match EntryKind::declared(item) {
                None => {}
                Some(kind) if kind == T::KIND => {}
                Some(kind) => {
                    return Err(BulletinError::invalid(format!(
                        "expected a '{}' entry in '{}', found '{}'",
                        T::KIND.as_str(),
                        T::COLLECTION,
                        item.get("type").and_then(Value::as_str).unwrap_or(kind.as_str())
                    ))
                    .into())
                }
            }
            let entry: T = serde_json::from_value(item.clone())
                .with_context(|| format!("invalid entry in '{}'", T::COLLECTION))?;
            entries.push(entry);
        }
        Ok(Self::new(entries))
    }

    fn reindex(&mut self) {
        self.index = self
            .entries
            .iter()
            .enumerate()
            .map(|(position, entry)| (entry.name().to_string(), position))
            .collect();
    }

    pub fn entries(&self) -> &[T] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<T> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.index.get(name).map(|position| &self.entries[*position])
    }

    pub fn populate(&self, reference: &TemplateRef) -> Result<T> {
        let entry = self
            .get(&reference.name)
            .ok_or_else(|| BulletinError::ReferenceNotFound {
                kind: T::COLLECTION,
                name: reference.name.clone(),
            })?;
        entry
            .populate(reference)
            .with_context(|| format!("while populating '{}'", reference.name))
    }

    pub fn insert(&mut self, entry: T) -> bool {
        if self.entries.iter().any(|existing| *existing == entry) {
            return false;
        }
        self.entries.push(entry);
        self.reindex();
        true
    }
}
