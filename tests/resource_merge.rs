use anyhow::Result;
use bulletin::resource::{update_resources, SourceKind};
use bulletin::{
    BulletinError, Level, MemoryReporter, Resource, ResourceSet, ResourceType, ResourceTypeSet,
    SilentReporter,
};
use serde_json::json;

fn git(name: &str, source: serde_json::Value) -> Resource {
    Resource::new(name, "git").with_source(source)
}

#[test]
fn empty_fields_do_not_erase_existing_values() -> Result<()> {
    let mut old = git(
        "repo",
        json!({ "uri": "git@github.com:org/repo.git", "branch": "master", "private_key": "((key))" }),
    );
    old.check_every = "5m".into();
    old.tags = vec!["internal".into()];
    let new = git("repo", json!({ "branch": "develop" }));

    let merged = old.update_with(&new, &SilentReporter)?;
    assert_eq!(merged.check_every, "5m");
    assert_eq!(merged.tags, vec!["internal".to_string()]);
    assert_eq!(
        merged.source,
        Some(json!({
            "uri": "git@github.com:org/repo.git",
            "branch": "develop",
            "private_key": "((key))"
        }))
    );
    Ok(())
}

#[test]
fn booleans_always_come_from_the_update() -> Result<()> {
    let old = git(
        "repo",
        json!({ "uri": "https://example.com/repo.git", "skip_ssl_verification": true }),
    );
    let new = git("repo", json!({ "uri": "https://example.com/repo.git", "paths": ["ci/*"] }));

    let merged = old.update_with(&new, &SilentReporter)?;
    assert_eq!(
        merged.source,
        Some(json!({ "uri": "https://example.com/repo.git", "paths": ["ci/*"] }))
    );
    Ok(())
}

#[test]
fn equal_resources_come_back_unchanged() -> Result<()> {
    let old = git("repo", json!({ "uri": "u", "branch": "main", "untyped": 1 }));
    let merged = old.update_with(&old.clone(), &SilentReporter)?;
    assert_eq!(merged, old);
    Ok(())
}

#[test]
fn changing_the_type_is_rejected() {
    let old = git("repo", json!({ "uri": "u" }));
    let new = Resource::new("repo", "s3");

    let err = old.update_with(&new, &SilentReporter).unwrap_err();
    assert_eq!(
        BulletinError::find(&err),
        Some(&BulletinError::TypeMismatchOnUpdate {
            name: "repo".into(),
            old: "git".into(),
            new: "s3".into()
        })
    );
}

#[test]
fn updates_without_a_type_keep_the_old_one() -> Result<()> {
    let old = git("repo", json!({ "uri": "u", "branch": "main" }));
    let mut new = Resource::new("repo", "");
    new.webhook_token = "secret".into();

    let merged = old.update_with(&new, &SilentReporter)?;
    assert_eq!(merged.kind, "git");
    assert_eq!(merged.webhook_token, "secret");
    Ok(())
}

#[test]
fn unrecognized_types_keep_their_source_and_are_reported() -> Result<()> {
    let reporter = MemoryReporter::new();
    let old = Resource::new("bucket", "s3").with_source(json!({ "bucket": "a" }));
    let new = Resource::new("bucket", "s3").with_source(json!({ "bucket": "b" }));

    let merged = old.update_with(&new, &reporter)?;
    assert_eq!(merged.source, Some(json!({ "bucket": "a" })));
    assert!(reporter
        .messages_at(Level::Warn)
        .iter()
        .any(|message| message.contains("unrecognized resource type")));
    Ok(())
}

#[test]
fn comparing_unrecognized_types_stays_quiet() -> Result<()> {
    let reporter = MemoryReporter::new();
    let mut set = ResourceSet::new();
    for name in ["a", "b", "c", "a"] {
        set.add(
            Resource::new(name, "s3").with_source(json!({ "bucket": name })),
            &reporter,
        )?;
    }

    assert_eq!(set.len(), 3);
    assert!(reporter.messages_at(Level::Warn).is_empty());
    Ok(())
}

#[test]
fn extra_fields_take_part_in_equality() -> Result<()> {
    let mut with_icon = git("repo", json!({ "uri": "u" }));
    with_icon.extra.insert("icon".into(), json!("github"));
    let plain = git("repo", json!({ "uri": "u" }));

    assert!(!plain.same_as(&with_icon, &SilentReporter)?);
    let merged = plain.update_with(&with_icon, &SilentReporter)?;
    assert_eq!(merged.extra.get("icon"), Some(&json!("github")));
    Ok(())
}

#[test]
fn resource_sets_ignore_structural_duplicates() -> Result<()> {
    let mut set = ResourceSet::new();
    let first = git(
        "repo",
        json!({ "uri": "u", "git_config": [{ "name": "a", "value": 1 }, { "name": "b", "value": "2" }] }),
    );
    let reordered = git(
        "repo",
        json!({ "uri": "u", "git_config": [{ "name": "b", "value": "2" }, { "name": "a", "value": "1" }] }),
    );

    assert!(set.add(first, &SilentReporter)?);
    assert!(!set.add(reordered, &SilentReporter)?);
    assert!(set.add(git("repo", json!({ "uri": "other" })), &SilentReporter)?);
    assert_eq!(set.len(), 2);
    Ok(())
}

#[test]
fn semver_gcs_fields_merge_field_by_field() -> Result<()> {
    let old = json!({ "driver": "gcs", "bucket": "versions", "key": "app", "json_key": "((gcs))" });
    let new = json!({ "driver": "gcs", "key": "app-next", "initial_version": 1.2 });

    let merged = SourceKind::Semver.merge(Some(&old), Some(&new))?;
    assert_eq!(
        merged,
        json!({
            "driver": "gcs",
            "initial_version": "1.2",
            "bucket": "versions",
            "key": "app-next",
            "json_key": "((gcs))"
        })
    );
    Ok(())
}

#[test]
fn stemcell_and_release_sources_compare_typed() -> Result<()> {
    let a = json!({ "name": "bosh-vsphere-esxi-ubuntu-xenial-go_agent" });
    let b = json!({ "name": "bosh-vsphere-esxi-ubuntu-xenial-go_agent", "force_regular": false });
    assert!(SourceKind::BoshIoStemcell.same(Some(&a), Some(&b))?);

    let release = json!({ "owner": "org", "repository": "cli", "pre_release": true });
    let merged = SourceKind::GithubRelease.merge(
        Some(&release),
        Some(&json!({ "access_token": "((token))" })),
    )?;
    assert_eq!(
        merged,
        json!({ "owner": "org", "repository": "cli", "access_token": "((token))" })
    );
    Ok(())
}

#[test]
fn update_by_name_keeps_base_order_and_skips_new_names() -> Result<()> {
    let base = vec![
        git("a", json!({ "uri": "a" })),
        git("b", json!({ "uri": "b", "branch": "main" })),
    ];
    let new = vec![
        git("c", json!({ "uri": "c" })),
        git("b", json!({ "branch": "release" })),
    ];

    let merged = update_resources(&base, &new, &SilentReporter)?;
    let names: Vec<&str> = merged.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b"]);
    assert_eq!(merged[1].source, Some(json!({ "uri": "b", "branch": "release" })));
    Ok(())
}

#[test]
fn resource_types_compare_params_as_strings() -> Result<()> {
    let mut a = ResourceType::new("gcs", "docker-image");
    a.source = Some(json!({ "repository": "frodenas/gcs-resource", "tag": 1 }));
    a.params = Some(json!({ "depth": 1 }));
    let mut b = a.clone();
    b.source = Some(json!({ "repository": "frodenas/gcs-resource", "tag": "1" }));
    b.params = Some(json!({ "depth": "1" }));

    let mut set = ResourceTypeSet::new();
    assert!(set.add(a, &SilentReporter)?);
    assert!(!set.add(b, &SilentReporter)?);
    Ok(())
}

#[test]
fn resource_type_update_takes_privileged_from_new() -> Result<()> {
    let mut old = ResourceType::new("pool", "docker-image");
    old.privileged = true;
    old.source = Some(json!({ "repository": "concourse/pool-resource", "tag": "1.0" }));
    let mut new = ResourceType::new("pool", "docker-image");
    new.source = Some(json!({ "tag": "1.1" }));

    let merged = old.update_with(&new, &SilentReporter)?;
    assert!(!merged.privileged);
    assert_eq!(
        merged.source,
        Some(json!({ "repository": "concourse/pool-resource", "tag": "1.1" }))
    );
    Ok(())
}
