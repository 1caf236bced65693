// Integration tests for workspace creation and repair

mod common;

use std::fs;

use anyhow::Result;
use common::{FakeRunner, TestHome};
use psnake::artifact::{alias_target, ArtifactKind, ByKind, FixedResolver, ImportOutcome};
use psnake::config::ExistingRoot;
use psnake::layout::{ProjectLayout, SUBDIRS};
use psnake::tools::Stage;
use psnake::workspace::{add_missing_dirs, BuildStep, ProjectMetadata, WorkspaceBuilder};
use psnake::SnakeError;

#[test]
fn test_create_builds_complete_workspace() -> Result<()> {
    let home = TestHome::new()?;
    let runner = FakeRunner::new();
    let builder = WorkspaceBuilder::new(&home.config, &home.paths, &home.registry, &runner);
    let project = home.new_project();
    let mut resolver = FixedResolver::skip();

    let created = builder.create(&project, &mut resolver, ExistingRoot::Fail)?;
    let layout = &created.layout;
    assert_eq!(layout.root(), project.root().as_path());

    for sub in SUBDIRS {
        assert!(layout.root().join(sub).is_dir(), "missing {}", sub);
    }
    assert!(layout.readme().is_file());
    assert!(layout.manifest_file().is_file());
    assert!(layout.gitignore().is_file());
    assert!(layout.report_source().is_file());
    assert!(layout.biblio_specific().is_file());
    assert!(fs::symlink_metadata(layout.biblio_common())?.file_type().is_symlink());

    assert_eq!(created.protocol, ImportOutcome::Skipped);
    assert_eq!(created.dataset, ImportOutcome::Skipped);
    assert!(created.vcs_error.is_none());

    let meta = ProjectMetadata::read(layout)?;
    assert_eq!(meta.customer, "rossi");
    assert_eq!(meta.url, "https://bitbucket.org/psnake/prj24_rossi_abc.git");

    assert_eq!(home.registry.get_default()?, fs::canonicalize(layout.root())?);
    Ok(())
}

#[test]
fn test_create_runs_steps_in_order() -> Result<()> {
    let home = TestHome::new()?;
    let runner = FakeRunner::new();
    let builder = WorkspaceBuilder::new(&home.config, &home.paths, &home.registry, &runner);
    let mut resolver = FixedResolver::skip();

    builder.create(&home.new_project(), &mut resolver, ExistingRoot::Fail)?;

    assert_eq!(
        runner.stages(),
        vec![
            Stage::Editor,
            Stage::VenvCreate,
            Stage::PackageInstall,
            Stage::VcsInit,
            Stage::VcsRemote,
            Stage::VcsAdd,
            Stage::VcsCommit,
        ]
    );
    Ok(())
}

#[test]
fn test_create_imports_both_artifacts() -> Result<()> {
    let home = TestHome::new()?;
    let runner = FakeRunner::new();
    let builder = WorkspaceBuilder::new(&home.config, &home.paths, &home.registry, &runner);
    let protocol = home.source("protocol.pdf", "%PDF");
    let dataset = home.source("visits.csv", "id,visit\n1,2024-01-02\n");
    let mut resolver = ByKind {
        protocol: Box::new(FixedResolver::new(Some("2024-03-01".to_string()), vec![protocol])),
        dataset: Box::new(FixedResolver::new(Some("2024-03-05".to_string()), vec![dataset])),
    };

    let created = builder.create(&home.new_project(), &mut resolver, ExistingRoot::Fail)?;
    let layout = &created.layout;

    let protocol_dated = layout.dated_artifact(ArtifactKind::Protocol, "2024_03_01");
    assert_eq!(fs::read_to_string(&protocol_dated)?, "%PDF");
    assert_eq!(
        alias_target(&layout.artifact_alias(ArtifactKind::Protocol))?,
        Some(fs::canonicalize(&protocol_dated)?)
    );
    assert_eq!(
        created.dataset,
        ImportOutcome::Imported {
            dated: layout.dated_artifact(ArtifactKind::Dataset, "2024_03_05"),
            alias: layout.artifact_alias(ArtifactKind::Dataset),
        }
    );
    assert_eq!(runner.calls_for(Stage::Merge).len(), 1);
    Ok(())
}

#[test]
fn test_failed_step_reports_partial_workspace() -> Result<()> {
    let home = TestHome::new()?;
    let runner = FakeRunner::failing(&[Stage::VenvCreate]);
    let builder = WorkspaceBuilder::new(&home.config, &home.paths, &home.registry, &runner);
    let project = home.new_project();
    let mut resolver = FixedResolver::skip();

    let err = builder
        .create(&project, &mut resolver, ExistingRoot::Fail)
        .unwrap_err();
    match &err {
        SnakeError::PartialWorkspace { root, step, .. } => {
            assert_eq!(root, &project.root());
            assert_eq!(*step, BuildStep::Environment);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(err.failed_stage(), Some(Stage::VenvCreate));

    // earlier steps stay on disk, later ones never ran
    let layout = ProjectLayout::new(project.root());
    assert!(layout.src_dir().is_dir());
    assert!(!layout.metadata_file().exists());
    assert!(home.registry.get_default().is_err());
    Ok(())
}

#[test]
fn test_vcs_failure_keeps_workspace() -> Result<()> {
    let home = TestHome::new()?;
    let runner = FakeRunner::failing(&[Stage::VcsInit]);
    let builder = WorkspaceBuilder::new(&home.config, &home.paths, &home.registry, &runner);
    let mut resolver = FixedResolver::skip();

    let created = builder.create(&home.new_project(), &mut resolver, ExistingRoot::Fail)?;

    assert!(created.vcs_error.is_some());
    assert!(created.layout.metadata_file().is_file());
    assert!(runner.calls_for(Stage::VcsCommit).is_empty());
    Ok(())
}

#[test]
fn test_editor_failure_is_not_fatal() -> Result<()> {
    let home = TestHome::new()?;
    let runner = FakeRunner::failing(&[Stage::Editor]);
    let builder = WorkspaceBuilder::new(&home.config, &home.paths, &home.registry, &runner);
    let mut resolver = FixedResolver::skip();

    let created = builder.create(&home.new_project(), &mut resolver, ExistingRoot::Fail)?;
    assert!(created.layout.readme().is_file());
    Ok(())
}

#[test]
fn test_existing_root_policy() -> Result<()> {
    let home = TestHome::new()?;
    let runner = FakeRunner::new();
    let builder = WorkspaceBuilder::new(&home.config, &home.paths, &home.registry, &runner);
    let project = home.new_project();

    fs::create_dir_all(project.root())?;
    fs::write(project.root().join("stale.txt"), "old")?;

    let err = builder
        .create(&project, &mut FixedResolver::skip(), ExistingRoot::Fail)
        .unwrap_err();
    assert!(matches!(err, SnakeError::RootExists(_)));
    assert!(project.root().join("stale.txt").exists());

    builder.create(&project, &mut FixedResolver::skip(), ExistingRoot::Recreate)?;
    assert!(!project.root().join("stale.txt").exists());
    assert!(ProjectLayout::new(project.root()).metadata_file().is_file());
    Ok(())
}

#[test]
fn test_invalid_name_creates_nothing() -> Result<()> {
    let home = TestHome::new()?;
    let runner = FakeRunner::new();
    let builder = WorkspaceBuilder::new(&home.config, &home.paths, &home.registry, &runner);
    let mut project = home.new_project();
    project.acronym = "a b".to_string();

    let err = builder
        .create(&project, &mut FixedResolver::skip(), ExistingRoot::Fail)
        .unwrap_err();
    assert!(matches!(err, SnakeError::InvalidName { field: "acronym", .. }));
    assert!(!project.root().exists());
    assert!(runner.stages().is_empty());
    Ok(())
}

#[test]
fn test_add_missing_dirs_is_idempotent() -> Result<()> {
    let home = TestHome::new()?;
    let layout = ProjectLayout::new(home.parent().join("rossi_abc"));
    fs::create_dir_all(layout.src_dir())?;
    fs::write(layout.src_dir().join("analysis.py"), "print(1)")?;

    let created = add_missing_dirs(&layout)?;
    assert_eq!(created.len(), SUBDIRS.len() - 1);
    assert_eq!(fs::read_to_string(layout.src_dir().join("analysis.py"))?, "print(1)");

    let again = add_missing_dirs(&layout)?;
    assert!(again.is_empty());
    Ok(())
}

#[test]
fn test_clone_sets_up_project() -> Result<()> {
    let home = TestHome::new()?;
    let runner = FakeRunner::new();
    let builder = WorkspaceBuilder::new(&home.config, &home.paths, &home.registry, &runner);
    let parent = home.parent();

    let layout = builder.clone_project("prj24_rossi_abc", &parent)?;
    assert_eq!(layout.root(), parent.join("rossi_abc").as_path());

    let clone = &runner.calls_for(Stage::VcsClone)[0];
    let args: Vec<String> = clone.args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
    assert_eq!(
        args,
        vec![
            "clone".to_string(),
            "https://bitbucket.org/psnake/prj24_rossi_abc".to_string(),
            layout.root().to_string_lossy().into_owned(),
        ]
    );

    for sub in SUBDIRS {
        assert!(layout.root().join(sub).is_dir(), "missing {}", sub);
    }
    assert_eq!(runner.calls_for(Stage::PackageInstall).len(), 1);
    assert_eq!(home.registry.get_default()?, fs::canonicalize(layout.root())?);
    Ok(())
}

#[test]
fn test_clone_refuses_existing_directory() -> Result<()> {
    let home = TestHome::new()?;
    let runner = FakeRunner::new();
    let builder = WorkspaceBuilder::new(&home.config, &home.paths, &home.registry, &runner);
    let parent = home.parent();
    fs::create_dir_all(parent.join("rossi_abc"))?;

    let err = builder.clone_project("prj24_rossi_abc", &parent).unwrap_err();
    assert!(matches!(err, SnakeError::RootExists(_)));
    assert!(runner.stages().is_empty());
    Ok(())
}
