pub mod catalog;
pub mod config;
pub mod decorate;
pub mod deps;
pub mod document;
pub mod error;
pub mod expand;
pub mod job;
pub mod pipeline;
pub mod report;
pub mod resource;
pub mod shape;
pub mod step;
pub mod store;
pub mod template;
mod util;

pub use catalog::{Catalog, DecoratorCatalog, DecoratorTemplate, StepCatalog, StepTemplate, Template};
pub use config::{Overrides, Settings};
pub use decorate::{decorate, AttachTarget, Attachments, DecoratorAttachment};
pub use deps::{Dep, DepJobRef, Deps, Requirements};
pub use error::BulletinError;
pub use expand::expand;
pub use job::{Job, JobBase, JobRef, JobRefs, Jobs, StepLocation, StepRef};
pub use pipeline::{Group, Pipeline};
pub use report::{Level, MemoryReporter, Reporter, SilentReporter, StderrReporter};
pub use resource::{Resource, ResourceSet, ResourceType, ResourceTypeSet};
pub use shape::{EntryKind, StepShape};
pub use step::{GetStep, StepHooks, StepModifiers};
pub use store::{convert, LocalStore};
pub use template::{Bindings, TemplateDef, TemplateRef};
pub use util::scalar_to_string;
