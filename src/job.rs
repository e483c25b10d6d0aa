use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::catalog::{DecoratorCatalog, StepCatalog};
use crate::decorate::{decorate, DecoratorAttachment};
use crate::document::decode;
use crate::error::BulletinError;
use crate::shape::{nested_steps, nested_steps_mut, step_name, StepShape};
use crate::step::StepHooks;
use crate::template::TemplateRef;
use crate::util::{is_false, is_zero};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobBase {
    pub name: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub serial: bool,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub build_logs_to_retain: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub serial_groups: Vec<String>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub max_in_flight: u32,
    #[serde(default, skip_serializing_if = "is_false")]
    pub public: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub disable_manual_trigger: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub interruptible: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepRef {
    #[serde(flatten)]
    pub template: TemplateRef,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub decorators: Vec<TemplateRef>,
}

impl StepRef {
    pub fn resolve(&self, decorators: &DecoratorCatalog, steps: &StepCatalog) -> Result<Vec<Value>> {
        let step = steps.populate(&self.template)?;
        StepShape::require(&step.step)?;
        let wrappers = self
            .decorators
            .iter()
            .map(|reference| decorators.populate(reference))
            .collect::<Result<Vec<_>>>()?;
        decorate(&step.step, &wrappers)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobRef {
    #[serde(flatten)]
    pub base: JobBase,
    #[serde(default)]
    pub plan: Vec<StepRef>,
    #[serde(flatten)]
    pub hooks: StepHooks,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub decorators: Vec<TemplateRef>,
}

impl JobRef {
    /// `None` attaches to the job itself; a step name attaches to that plan position.
    pub fn add_decorator(&mut self, step: Option<&str>, decorator: TemplateRef) {
        match step {
            None => self.decorators.push(decorator),
            Some(step) => {
                if let Some(position) = self
                    .plan
                    .iter()
                    .rposition(|candidate| candidate.template.name == step)
                {
                    self.plan[position].decorators.push(decorator);
                }
            }
        }
    }

    pub fn convert(&self, decorators: &DecoratorCatalog, steps: &StepCatalog) -> Result<Job> {
        let mut plan: Vec<Value> = Vec::new();
        for step_ref in &self.plan {
            let produced = step_ref.resolve(decorators, steps).with_context(|| {
                format!(
                    "job '{}': unable to resolve step '{}'",
                    self.base.name, step_ref.template.name
                )
            })?;
            for step in produced {
                // parallel gets run before anything else in the plan
                if StepShape::of(&step) == StepShape::Aggregate {
                    plan.insert(0, step);
                } else {
                    plan.push(step);
                }
            }
        }

        let mut hooks = self.hooks.clone();
        for reference in &self.decorators {
            let decorator = decorators.populate(reference).with_context(|| {
                format!(
                    "job '{}': unable to resolve decorator '{}'",
                    self.base.name, reference.name
                )
            })?;
            hooks.overlay(&decorator.hooks);
        }

        Ok(Job::new(self.base.clone(), plan, hooks))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobRefs {
    #[serde(default)]
    pub jobs: Vec<JobRef>,
}

impl JobRefs {
    pub fn from_document(doc: &Value) -> Result<Self> {
        decode(doc, "job skeleton")
    }

    /// Unknown jobs and steps are skipped.
    pub fn attach(&mut self, attachment: &DecoratorAttachment) -> Result<()> {
        for target in attachment.targets()? {
            if let Some(job) = self
                .jobs
                .iter_mut()
                .rfind(|job| job.base.name == target.job)
            {
                job.add_decorator(target.step.as_deref(), attachment.template.clone());
            }
        }
        Ok(())
    }

    pub fn convert(&self, decorators: &DecoratorCatalog, steps: &StepCatalog) -> Result<Jobs> {
        let jobs = self
            .jobs
            .iter()
            .map(|job| job.convert(decorators, steps))
            .collect::<Result<Vec<_>>>()?;
        Ok(Jobs::new(jobs))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepLocation {
    pub position: usize,
    pub nested: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct PlanIndex {
    named: HashMap<(StepShape, String), StepLocation>,
    groups: HashMap<StepShape, Vec<usize>>,
}

impl PlanIndex {
    fn build(plan: &[Value]) -> Self {
        let mut index = PlanIndex::default();
        for (position, step) in plan.iter().enumerate() {
            let shape = StepShape::of(step);
            if shape.is_named() {
                index.record(step, position, None);
            } else if shape.is_group() {
                index.groups.entry(shape).or_default().push(position);
                for (nested, child) in nested_steps(step).into_iter().flatten().enumerate() {
                    index.record(child, position, Some(nested));
                }
            }
        }
        index
    }

    fn record(&mut self, step: &Value, position: usize, nested: Option<usize>) {
        let shape = StepShape::of(step);
        if let Some(name) = step_name(step) {
            self.named
                .entry((shape, name.to_string()))
                .or_insert(StepLocation { position, nested });
        }
    }
}

/// A resolved job. The plan is only mutated through methods that keep the index current.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "JobDocument")]
pub struct Job {
    #[serde(flatten)]
    pub base: JobBase,
    plan: Vec<Value>,
    #[serde(flatten)]
    pub hooks: StepHooks,
    #[serde(skip)]
    index: PlanIndex,
}

#[derive(Deserialize)]
struct JobDocument {
    #[serde(flatten)]
    base: JobBase,
    #[serde(default)]
    plan: Vec<Value>,
    #[serde(flatten)]
    hooks: StepHooks,
}

impl From<JobDocument> for Job {
    fn from(doc: JobDocument) -> Self {
        Job::new(doc.base, doc.plan, doc.hooks)
    }
}

impl Job {
    pub fn new(base: JobBase, plan: Vec<Value>, hooks: StepHooks) -> Self {
        let index = PlanIndex::build(&plan);
        Self {
            base,
            plan,
            hooks,
            index,
        }
    }

    pub fn name(&self) -> &str {
        &self.base.name
    }

    pub fn plan(&self) -> &[Value] {
        &self.plan
    }

    fn reindex(&mut self) {
        self.index = PlanIndex::build(&self.plan);
    }

    pub fn locate(&self, shape: StepShape, name: &str) -> Option<StepLocation> {
        self.index.named.get(&(shape, name.to_string())).copied()
    }

    pub fn step(&self, shape: StepShape, name: &str) -> Option<&Value> {
        let location = self.locate(shape, name)?;
        let top = self.plan.get(location.position)?;
        match location.nested {
            None => Some(top),
            Some(nested) => nested_steps(top)?.get(nested),
        }
    }

    fn step_mut(&mut self, shape: StepShape, name: &str) -> Option<&mut Value> {
        let location = self.locate(shape, name)?;
        let top = self.plan.get_mut(location.position)?;
        match location.nested {
            None => Some(top),
            Some(nested) => nested_steps_mut(top)?.get_mut(nested),
        }
    }

    pub fn groups(&self, shape: StepShape) -> Vec<&Value> {
        self.index
            .groups
            .get(&shape)
            .into_iter()
            .flatten()
            .filter_map(|position| self.plan.get(*position))
            .collect()
    }

    pub fn push_step(&mut self, step: Value) {
        self.plan.push(step);
        self.reindex();
    }

    /// Appends into the first top-level aggregate, creating one at the front if needed.
    pub fn add_to_aggregate(&mut self, step: Value) -> Result<()> {
        let first = self
            .index
            .groups
            .get(&StepShape::Aggregate)
            .and_then(|positions| positions.first().copied());
        match first {
            Some(position) => {
                let job = self.base.name.clone();
                let children = self
                    .plan
                    .get_mut(position)
                    .and_then(nested_steps_mut)
                    .ok_or_else(|| {
                        BulletinError::invalid(format!("aggregate in job '{job}' is not a list"))
                    })?;
                children.push(step);
            }
            None => self.plan.insert(0, json!({ "aggregate": [step] })),
        }
        self.reindex();
        Ok(())
    }

    /// Extends `passed` of the named get step. Returns `false` when the job has no such step.
    pub fn add_passed(&mut self, resource: &str, upstream: Option<&str>) -> Result<bool> {
        let job = self.base.name.clone();
        let Some(step) = self.step_mut(StepShape::Get, resource) else {
            return Ok(false);
        };
        let Some(upstream) = upstream else {
            return Ok(true);
        };
        let map = step.as_object_mut().ok_or_else(|| {
            BulletinError::invalid(format!("get step '{resource}' in job '{job}' is not a map"))
        })?;
        let passed = map
            .entry("passed")
            .or_insert_with(|| Value::Array(Vec::new()));
        let list = passed.as_array_mut().ok_or_else(|| {
            BulletinError::invalid(format!("'passed' of '{resource}' in job '{job}' is not a list"))
        })?;
        if !list.iter().any(|existing| existing.as_str() == Some(upstream)) {
            list.push(Value::String(upstream.to_string()));
        }
        Ok(true)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "JobsDocument")]
pub struct Jobs {
    jobs: Vec<Job>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

#[derive(Deserialize)]
struct JobsDocument {
    #[serde(default)]
    jobs: Vec<Job>,
}

impl From<JobsDocument> for Jobs {
    fn from(doc: JobsDocument) -> Self {
        Jobs::new(doc.jobs)
    }
}

impl Jobs {
    pub fn new(jobs: Vec<Job>) -> Self {
        let index = jobs
            .iter()
            .enumerate()
            .map(|(position, job)| (job.name().to_string(), position))
            .collect();
        Self { jobs, index }
    }

    pub fn from_document(doc: &Value) -> Result<Self> {
        decode(doc, "jobs")
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn into_vec(self) -> Vec<Job> {
        self.jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn get(&self, name: &str) -> Result<&Job> {
        self.index
            .get(name)
            .map(|position| &self.jobs[*position])
            .ok_or_else(|| {
                BulletinError::JobOrStepNotFound {
                    kind: "job",
                    name: name.to_string(),
                }
                .into()
            })
    }

    pub fn update(&mut self, job: Job) -> Result<()> {
        let position = *self.index.get(job.name()).ok_or_else(|| {
            BulletinError::JobOrStepNotFound {
                kind: "job",
                name: job.name().to_string(),
            }
        })?;
        self.jobs[position] = job;
        Ok(())
    }
}
