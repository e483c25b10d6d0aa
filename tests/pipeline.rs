use anyhow::Result;
use bulletin::{Pipeline, SilentReporter};
use serde_json::json;

const BASE: &str = r#"
resource_types:
- name: gcs
  type: docker-image
  source:
    repository: frodenas/gcs-resource
resources:
- name: repo
  type: git
  source:
    uri: git@github.com:org/repo.git
    branch: master
- name: tarball
  type: gcs-resource
  source:
    bucket: builds
    regexp: app-(.*).tgz
groups:
- name: all
  jobs: [unit]
  resources: [repo]
jobs:
- name: unit
  max_in_flight: 2
  plan:
  - get: repo
    trigger: true
  - task: unit
    file: repo/ci/unit.yml
"#;

const UPDATE: &str = r#"
resource_types:
- name: gcs
  type: docker-image
  source:
    tag: v0.4.0
resources:
- name: repo
  type: git
  source:
    branch: release
- name: unrelated
  type: git
  source:
    uri: git@github.com:org/other.git
"#;

#[test]
fn update_merges_known_resources_only() -> Result<()> {
    let mut pipeline = Pipeline::from_yaml(BASE)?;
    pipeline.update_with(&Pipeline::from_yaml(UPDATE)?, &SilentReporter)?;

    let names: Vec<&str> = pipeline.resources.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["repo", "tarball"]);
    assert_eq!(
        pipeline.resources[0].source,
        Some(json!({ "uri": "git@github.com:org/repo.git", "branch": "release" }))
    );
    assert_eq!(
        pipeline.resource_types[0].source,
        Some(json!({ "repository": "frodenas/gcs-resource", "tag": "v0.4.0" }))
    );
    Ok(())
}

#[test]
fn jobs_and_groups_pass_through_untouched() -> Result<()> {
    let mut pipeline = Pipeline::from_yaml(BASE)?;
    let before = pipeline.clone();
    pipeline.update_with(&Pipeline::from_yaml(UPDATE)?, &SilentReporter)?;

    assert_eq!(pipeline.jobs, before.jobs);
    assert_eq!(pipeline.groups, before.groups);
    assert_eq!(pipeline.job_names(), vec!["unit"]);
    assert_eq!(
        pipeline.job("unit").and_then(|job| job.get("max_in_flight")),
        Some(&json!(2))
    );
    Ok(())
}

#[test]
fn rendered_pipeline_reads_back_the_same() -> Result<()> {
    let pipeline = Pipeline::from_yaml(BASE)?;
    let reparsed = Pipeline::from_yaml(&pipeline.to_yaml()?)?;
    assert_eq!(reparsed, pipeline);
    Ok(())
}

#[test]
fn empty_input_is_an_empty_pipeline() -> Result<()> {
    assert_eq!(Pipeline::from_yaml("")?, Pipeline::default());
    Ok(())
}

#[test]
fn unmodelled_fields_survive_an_update() -> Result<()> {
    let base = r#"
display:
  background_image: https://example.com/bg.png
resource_types:
- name: gcs
  type: docker-image
  check_every: 1h
  source: {repository: frodenas/gcs-resource}
resources:
- name: repo
  type: git
  icon: github
  public: true
  source: {uri: u}
jobs: []
"#;
    let update = r#"
resources:
- name: repo
  type: git
  icon: ""
  version: every
  source: {branch: b}
"#;
    let mut pipeline = Pipeline::from_yaml(base)?;
    pipeline.update_with(&Pipeline::from_yaml(update)?, &SilentReporter)?;

    let rendered = serde_json::to_value(&pipeline)?;
    assert_eq!(
        rendered["resources"],
        json!([{
            "name": "repo",
            "type": "git",
            "source": { "uri": "u", "branch": "b" },
            "icon": "github",
            "public": true,
            "version": "every"
        }])
    );
    assert_eq!(rendered["resource_types"][0]["check_every"], json!("1h"));
    assert_eq!(
        rendered["display"],
        json!({ "background_image": "https://example.com/bg.png" })
    );

    let reparsed = Pipeline::from_yaml(&pipeline.to_yaml()?)?;
    assert_eq!(reparsed, pipeline);
    Ok(())
}
