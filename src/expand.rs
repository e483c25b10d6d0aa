use anyhow::{Context, Result};
use serde_json::{json, Value};

use crate::catalog::{DecoratorCatalog, StepCatalog};
use crate::decorate::Attachments;
use crate::deps::Deps;
use crate::document::decode;
use crate::job::{JobRefs, Jobs};
use crate::report::Reporter;

/// Turns a bulletin document (`jobs`, `deps`, `decorators`) into concrete jobs:
/// global decorators are attached, skeletons resolved against the catalogs and
/// resource dependencies injected.
pub fn expand(
    doc: &Value,
    steps: &StepCatalog,
    decorators: &DecoratorCatalog,
    reporter: &dyn Reporter,
) -> Result<Jobs> {
    let mut skeletons = JobRefs::from_document(doc)?;
    let attachments: Attachments = decode(doc, "decorator attachments")?;
    let deps = Deps::from_document(doc)?;

    for attachment in &attachments.decorators {
        skeletons
            .attach(attachment)
            .with_context(|| format!("unable to attach decorator '{}'", attachment.template.name))?;
    }
    reporter.debug(
        "decorators attached",
        Some(json!({ "attachments": attachments.decorators.len() })),
    );

    let mut jobs = skeletons.convert(decorators, steps)?;
    reporter.debug("jobs resolved", Some(json!({ "jobs": jobs.len() })));

    deps.inject(&mut jobs)?;
    reporter.debug(
        "dependencies injected",
        Some(json!({ "resources": deps.deps.len() })),
    );
    Ok(jobs)
}
