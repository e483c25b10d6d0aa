use std::fs;

use anyhow::Result;
use bulletin::{
    convert, DecoratorCatalog, LocalStore, SilentReporter, StepCatalog, StepTemplate,
};
use serde_json::json;
use tempfile::tempdir;

const PIPELINE: &str = r#"
resource_types:
- name: slack
  type: docker-image
  source:
    repository: cfcommunity/slack-notification-resource
resources:
- name: repo
  type: git
  source:
    uri: git@github.com:org/repo.git
- name: notify
  type: slack-notification
  source:
    url: ((slack_hook))
jobs: []
"#;

#[test]
fn loading_creates_empty_catalog_files() -> Result<()> {
    let dir = tempdir()?;
    let store = LocalStore::open(dir.path());

    assert!(store.load_resources(&SilentReporter)?.is_empty());
    assert!(store.load_resource_types(&SilentReporter)?.is_empty());
    assert!(store.load_steps()?.is_empty());
    assert!(store.load_decorators()?.is_empty());

    for collection in ["resources", "resource_types", "steps", "decorators"] {
        assert!(store.path_of(collection).is_file(), "{collection} file missing");
    }
    assert_eq!(
        store.path_of("steps"),
        dir.path().join("steps").join("steps.yml")
    );
    Ok(())
}

#[test]
fn convert_accumulates_without_duplicates() -> Result<()> {
    let dir = tempdir()?;
    let store = LocalStore::open(dir.path());

    assert_eq!(convert(PIPELINE, &store, &SilentReporter)?, 3);
    assert_eq!(convert(PIPELINE, &store, &SilentReporter)?, 0);

    let resources = store.load_resources(&SilentReporter)?;
    let names: Vec<&str> = resources.items().iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["repo", "notify"]);
    assert_eq!(store.load_resource_types(&SilentReporter)?.len(), 1);

    let written = fs::read_to_string(store.path_of("resources"))?;
    assert!(written.starts_with("resources:"));
    Ok(())
}

#[test]
fn steps_survive_a_save_and_load() -> Result<()> {
    let dir = tempdir()?;
    let store = LocalStore::open(dir.path());
    let steps = StepCatalog::from_document(&json!({
        "steps": [{
            "name": "unit",
            "type": "step",
            "inputs": ["dir"],
            "step": { "task": "unit", "file": "((dir))/ci/unit.yml" }
        }]
    }))?;

    store.save_steps(&steps)?;
    let loaded = store.load_steps()?;
    assert_eq!(loaded.entries(), steps.entries());
    let entry: &StepTemplate = loaded.get("unit").expect("entry present");
    assert_eq!(entry.step["file"], json!("((dir))/ci/unit.yml"));
    Ok(())
}

#[test]
fn decorators_keep_hooks_and_modifiers_across_a_save() -> Result<()> {
    let dir = tempdir()?;
    let store = LocalStore::open(dir.path());
    let decorators = DecoratorCatalog::from_document(&json!({
        "decorators": [{
            "name": "notify",
            "type": "task-decorator",
            "inputs": ["repo"],
            "before": [{ "put": "((repo))", "params": { "status": "pending" } }],
            "after": [{ "put": "metrics" }],
            "on_success": { "put": "((repo))", "params": { "status": "success" } },
            "ensure": { "task": "cleanup" },
            "tags": ["workers"],
            "timeout": "1h",
            "attempts": 3
        }]
    }))?;

    store.save_decorators(&decorators)?;
    let loaded = store.load_decorators()?;
    assert_eq!(loaded.entries(), decorators.entries());

    let notify = loaded.get("notify").expect("entry present");
    assert_eq!(notify.hooks.ensure, Some(json!({ "task": "cleanup" })));
    assert_eq!(notify.modifiers.attempts.as_deref(), Some("3"));
    assert_eq!(notify.modifiers.tags, vec!["workers".to_string()]);

    // saving what was loaded adds nothing
    let mut again = loaded.clone();
    assert!(!again.insert(notify.clone()));
    store.save_decorators(&again)?;
    assert_eq!(store.load_decorators()?.len(), 1);
    Ok(())
}

#[test]
fn corrupt_catalog_leaves_the_store_untouched() -> Result<()> {
    let dir = tempdir()?;
    let store = LocalStore::open(dir.path());
    fs::create_dir_all(dir.path().join("resources"))?;
    fs::write(store.path_of("resources"), "resources: {not: a list}\n")?;

    assert!(convert(PIPELINE, &store, &SilentReporter).is_err());
    let resource_types = fs::read_to_string(store.path_of("resource_types"))?;
    assert!(resource_types.trim().is_empty(), "resource types were written: {resource_types}");
    Ok(())
}

#[test]
fn duplicate_entries_on_disk_are_collapsed() -> Result<()> {
    let dir = tempdir()?;
    let store = LocalStore::open(dir.path());
    fs::create_dir_all(dir.path().join("resources"))?;
    fs::write(
        store.path_of("resources"),
        "resources:\n- name: repo\n  type: git\n  source: {uri: u}\n- name: repo\n  type: git\n  source: {uri: u}\n",
    )?;

    assert_eq!(store.load_resources(&SilentReporter)?.len(), 1);
    Ok(())
}
