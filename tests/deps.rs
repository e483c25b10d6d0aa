use anyhow::Result;
use bulletin::{BulletinError, Deps, Jobs, StepShape};
use serde_json::{json, Value};

fn jobs(names: &[&str]) -> Jobs {
    let jobs: Vec<Value> = names
        .iter()
        .map(|name| json!({ "name": name, "plan": [{ "task": format!("{name}-task") }] }))
        .collect();
    Jobs::from_document(&json!({ "jobs": jobs })).expect("valid jobs")
}

fn plan(jobs: &Jobs, name: &str) -> Vec<Value> {
    jobs.get(name).expect("job present").plan().to_vec()
}

#[test]
fn chains_link_each_job_to_its_predecessor() -> Result<()> {
    let mut jobs = jobs(&["unit", "integration", "release"]);
    let deps = Deps::from_document(&json!({
        "deps": [{
            "name": "repo",
            "required_by": [[
                { "name": "unit", "trigger": true },
                { "name": "integration" },
                { "name": "release" }
            ]]
        }]
    }))?;

    deps.inject(&mut jobs)?;

    assert_eq!(
        plan(&jobs, "unit"),
        vec![
            json!({ "aggregate": [{ "get": "repo", "trigger": true }] }),
            json!({ "task": "unit-task" }),
        ]
    );
    assert_eq!(
        plan(&jobs, "integration")[0],
        json!({ "aggregate": [{ "get": "repo", "passed": ["unit"] }] })
    );
    assert_eq!(
        plan(&jobs, "release")[0],
        json!({ "aggregate": [{ "get": "repo", "passed": ["integration"] }] })
    );
    Ok(())
}

#[test]
fn resources_share_one_aggregate_block() -> Result<()> {
    let mut jobs = jobs(&["unit"]);
    let deps = Deps::from_document(&json!({
        "deps": [
            { "name": "repo", "required_by": [[{ "name": "unit" }]] },
            { "name": "tools", "required_by": [[{ "name": "unit", "params": { "depth": 1 } }]] }
        ]
    }))?;

    deps.inject(&mut jobs)?;

    let job = jobs.get("unit")?;
    assert_eq!(job.groups(StepShape::Aggregate).len(), 1);
    assert_eq!(
        job.plan()[0],
        json!({ "aggregate": [
            { "get": "repo" },
            { "get": "tools", "params": { "depth": 1 } }
        ] })
    );
    assert!(job.step(StepShape::Get, "tools").is_some());
    Ok(())
}

#[test]
fn injecting_twice_changes_nothing() -> Result<()> {
    let mut jobs = jobs(&["unit", "integration"]);
    let deps = Deps::from_document(&json!({
        "deps": [
            { "name": "repo", "required_by": [[{ "name": "unit" }, { "name": "integration" }]] },
            { "name": "tools", "required_by": [[{ "name": "unit" }, { "name": "integration" }]] }
        ]
    }))?;

    deps.inject(&mut jobs)?;
    let first = jobs.clone();
    deps.inject(&mut jobs)?;

    assert_eq!(plan(&jobs, "unit"), plan(&first, "unit"));
    assert_eq!(plan(&jobs, "integration"), plan(&first, "integration"));
    Ok(())
}

#[test]
fn existing_gets_are_extended_not_duplicated() -> Result<()> {
    let mut jobs = Jobs::from_document(&json!({
        "jobs": [
            { "name": "unit", "plan": [] },
            { "name": "deploy", "plan": [
                { "get": "repo", "passed": ["smoke"] },
                { "task": "deploy" }
            ] }
        ]
    }))?;
    let deps = Deps::from_document(&json!({
        "deps": [{ "name": "repo", "required_by": [[{ "name": "unit" }, { "name": "deploy" }]] }]
    }))?;

    deps.inject(&mut jobs)?;

    assert_eq!(
        plan(&jobs, "deploy"),
        vec![
            json!({ "get": "repo", "passed": ["smoke", "unit"] }),
            json!({ "task": "deploy" }),
        ]
    );
    Ok(())
}

#[test]
fn non_aggregatable_gets_go_to_the_end() -> Result<()> {
    let mut jobs = jobs(&["unit"]);
    let deps = Deps::from_document(&json!({
        "deps": [{
            "name": "repo",
            "required_by": [[{ "name": "unit", "aggregatable": false, "version": "every" }]]
        }]
    }))?;

    deps.inject(&mut jobs)?;

    assert_eq!(
        plan(&jobs, "unit"),
        vec![
            json!({ "task": "unit-task" }),
            json!({ "get": "repo", "version": "every" }),
        ]
    );
    Ok(())
}

#[test]
fn every_chain_of_a_dep_is_wired() -> Result<()> {
    let mut jobs = jobs(&["a", "b", "c"]);
    let deps = Deps::from_document(&json!({
        "deps": [{
            "name": "repo",
            "required_by": [
                [{ "name": "a" }, { "name": "b" }],
                [{ "name": "a" }, { "name": "c" }]
            ]
        }]
    }))?;

    deps.inject(&mut jobs)?;

    assert_eq!(
        jobs.get("c")?.step(StepShape::Get, "repo"),
        Some(&json!({ "get": "repo", "passed": ["a"] }))
    );
    assert_eq!(plan(&jobs, "a")[0], json!({ "aggregate": [{ "get": "repo" }] }));
    Ok(())
}

#[test]
fn unknown_job_is_fatal() -> Result<()> {
    let mut jobs = jobs(&["unit"]);
    let deps = Deps::from_document(&json!({
        "deps": [{ "name": "repo", "required_by": [[{ "name": "unit" }, { "name": "ghost" }]] }]
    }))?;

    let err = deps.inject(&mut jobs).unwrap_err();
    assert_eq!(
        BulletinError::find(&err),
        Some(&BulletinError::JobOrStepNotFound {
            kind: "job",
            name: "ghost".into()
        })
    );
    Ok(())
}

#[test]
fn invalid_aggregatable_flag_is_rejected() -> Result<()> {
    let mut jobs = jobs(&["unit"]);
    let deps = Deps::from_document(&json!({
        "deps": [{ "name": "repo", "required_by": [[{ "name": "unit", "aggregatable": "sometimes" }]] }]
    }))?;

    let err = deps.inject(&mut jobs).unwrap_err();
    assert!(matches!(
        BulletinError::find(&err),
        Some(BulletinError::InvalidDocument { .. })
    ));
    Ok(())
}

#[test]
fn malformed_aggregate_is_not_duplicated() -> Result<()> {
    let mut jobs = Jobs::from_document(&json!({
        "jobs": [{ "name": "unit", "plan": [{ "aggregate": null }, { "task": "t" }] }]
    }))?;
    let deps = Deps::from_document(&json!({
        "deps": [{ "name": "repo", "required_by": [[{ "name": "unit" }]] }]
    }))?;

    let err = deps.inject(&mut jobs).unwrap_err();
    assert!(matches!(
        BulletinError::find(&err),
        Some(BulletinError::InvalidDocument { .. })
    ));
    let job = jobs.get("unit")?;
    assert_eq!(job.groups(StepShape::Aggregate).len(), 1);
    assert_eq!(job.plan()[0], json!({ "aggregate": null }));
    Ok(())
}
