use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{json, Map, Value};
use tempfile::NamedTempFile;

use crate::catalog::{
    Catalog, DecoratorCatalog, DecoratorTemplate, StepCatalog, StepTemplate, Template,
};
use crate::document::{parse_yaml, to_yaml};
use crate::pipeline::Pipeline;
use crate::report::Reporter;
use crate::resource::{
    Resource, ResourceSet, ResourceType, ResourceTypeSet, ResourceTypes, Resources,
};

const RESOURCES: &str = "resources";
const RESOURCE_TYPES: &str = "resource_types";

/// Catalogs persisted under a target directory, one `<kind>/<kind>.yml` file each.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_of(&self, collection: &str) -> PathBuf {
        self.root
            .join(collection)
            .join(format!("{collection}.yml"))
    }

    /// Reads a catalog file, creating its directory and an empty file on first use.
    fn read(&self, collection: &str) -> Result<Value> {
        let path = self.path_of(collection);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("unable to create directory: {}", parent.display()))?;
        }
        if !path.exists() {
            fs::write(&path, "")
                .with_context(|| format!("unable to create file: {}", path.display()))?;
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("unable to read file: {}", path.display()))?;
        parse_yaml(&content).with_context(|| format!("invalid catalog: {}", path.display()))
    }

    fn write<T: Serialize>(&self, collection: &str, items: &T) -> Result<()> {
        let path = self.path_of(collection);
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());
        fs::create_dir_all(&dir)
            .with_context(|| format!("unable to create directory: {}", dir.display()))?;

        let mut doc = Map::new();
        doc.insert(collection.to_string(), serde_json::to_value(items)?);
        let rendered = to_yaml(&Value::Object(doc))?;

        let mut file = NamedTempFile::new_in(&dir)
            .with_context(|| format!("unable to stage file in {}", dir.display()))?;
        file.write_all(rendered.as_bytes())
            .with_context(|| format!("unable to write file: {}", path.display()))?;
        file.persist(&path)
            .with_context(|| format!("unable to replace file: {}", path.display()))?;
        Ok(())
    }

    fn load_catalog<T: Template>(&self) -> Result<Catalog<T>> {
        let parsed = Catalog::<T>::from_document(&self.read(T::COLLECTION)?)?;
        let mut catalog = Catalog::default();
        for entry in parsed.into_entries() {
            catalog.insert(entry);
        }
        Ok(catalog)
    }

    pub fn load_steps(&self) -> Result<StepCatalog> {
        self.load_catalog()
    }

    pub fn load_decorators(&self) -> Result<DecoratorCatalog> {
        self.load_catalog()
    }

    pub fn save_steps(&self, steps: &StepCatalog) -> Result<()> {
        self.write(StepTemplate::COLLECTION, &steps.entries())
    }

    pub fn save_decorators(&self, decorators: &DecoratorCatalog) -> Result<()> {
        self.write(DecoratorTemplate::COLLECTION, &decorators.entries())
    }

    pub fn load_resources(&self, reporter: &dyn Reporter) -> Result<ResourceSet> {
        let resources = Resources::from_document(&self.read(RESOURCES)?)?;
        let mut set = ResourceSet::new();
        for resource in resources.resources {
            set.add(resource, reporter)?;
        }
        Ok(set)
    }

    pub fn load_resource_types(&self, reporter: &dyn Reporter) -> Result<ResourceTypeSet> {
        let resource_types = ResourceTypes::from_document(&self.read(RESOURCE_TYPES)?)?;
        let mut set = ResourceTypeSet::new();
        for resource_type in resource_types.resource_types {
            set.add(resource_type, reporter)?;
        }
        Ok(set)
    }

    pub fn save_resources(&self, resources: &[Resource]) -> Result<()> {
        self.write(RESOURCES, &resources)
    }

    pub fn save_resource_types(&self, resource_types: &[ResourceType]) -> Result<()> {
        self.write(RESOURCE_TYPES, &resource_types)
    }

    pub fn absorb(&self, pipeline: &Pipeline, reporter: &dyn Reporter) -> Result<usize> {
        let mut added = 0;

        let mut resource_types = self.load_resource_types(reporter)?;
        let mut resources = self.load_resources(reporter)?;

        for resource_type in &pipeline.resource_types {
            if resource_types.add(resource_type.clone(), reporter)? {
                added += 1;
            }
        }
        for resource in &pipeline.resources {
            if resources.add(resource.clone(), reporter)? {
                added += 1;
            }
        }

        self.save_resource_types(resource_types.items())?;
        self.save_resources(resources.items())?;

        reporter.info(
            "catalogs updated",
            Some(json!({
                "target": self.root.display().to_string(),
                "added": added,
                "resources": resources.len(),
                "resource_types": resource_types.len(),
            })),
        );
        Ok(added)
    }
}

pub fn convert(pipeline_text: &str, store: &LocalStore, reporter: &dyn Reporter) -> Result<usize> {
    let pipeline = Pipeline::from_yaml(pipeline_text)?;
    store.absorb(&pipeline, reporter)
}
