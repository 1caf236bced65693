//! Workspace creation
//!
//! Builds a new project in a fixed sequence of steps:
//! directories, bootstrap files, templates, bibliography, protocol and
//! dataset imports, environment, metadata, default project, version control.
//!
//! Creation is not transactional. A failing step stops the sequence and is
//! reported as `PartialWorkspace`; whatever the earlier steps wrote stays on
//! disk. Version control comes last and its failure is only reported.

pub mod metadata;
pub mod templates;

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, warn};

use crate::artifact::{resolve_request, ArtifactKind, ImportOutcome, Importer, SourceResolver};
use crate::config::{Config, ExistingRoot, SnakePaths};
use crate::environment::Provisioner;
use crate::error::{IoContext, Result, SnakeError};
use crate::layout::ProjectLayout;
use crate::registry::Registry;
use crate::tools::{Stage, ToolCommand, ToolRunner};

pub use metadata::ProjectMetadata;

static NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9-]+$").unwrap());

/// Steps of workspace creation, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStep {
    Directories,
    Bootstrap,
    Templates,
    Bibliography,
    ImportProtocol,
    ImportDataset,
    Environment,
    Metadata,
    Registry,
    VersionControl,
}

impl std::fmt::Display for BuildStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BuildStep::Directories => "directories",
            BuildStep::Bootstrap => "bootstrap files",
            BuildStep::Templates => "templates",
            BuildStep::Bibliography => "bibliography",
            BuildStep::ImportProtocol => "protocol import",
            BuildStep::ImportDataset => "dataset import",
            BuildStep::Environment => "environment",
            BuildStep::Metadata => "metadata",
            BuildStep::Registry => "default project",
            BuildStep::VersionControl => "version control",
        };
        write!(f, "{}", name)
    }
}

/// Input of workspace creation
#[derive(Debug, Clone)]
pub struct NewProject {
    pub customer: String,
    pub acronym: String,
    pub title: String,
    pub created: NaiveDate,
    /// Directory the project root is created in
    pub parent: PathBuf,
}

impl NewProject {
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [("customer", &self.customer), ("acronym", &self.acronym)] {
            if !NAME_RE.is_match(value) {
                return Err(SnakeError::InvalidName {
                    field,
                    value: value.clone(),
                });
            }
        }
        Ok(())
    }

    /// `<customer>_<acronym>`
    pub fn dir_name(&self) -> String {
        format!("{}_{}", self.customer, self.acronym)
    }

    pub fn root(&self) -> PathBuf {
        self.parent.join(self.dir_name())
    }

    /// `prj<YY>_<customer>_<acronym>`
    pub fn repo_name(&self) -> String {
        format!(
            "prj{:02}_{}_{}",
            self.created.year().rem_euclid(100),
            self.customer,
            self.acronym
        )
    }

    pub fn remote_url(&self, base_url: &str) -> String {
        format!("{}/{}.git", base_url.trim_end_matches('/'), self.repo_name())
    }
}

/// What a successful creation produced
#[derive(Debug)]
pub struct CreatedWorkspace {
    pub layout: ProjectLayout,
    pub metadata: ProjectMetadata,
    pub protocol: ImportOutcome,
    pub dataset: ImportOutcome,
    /// Set when the version-control bootstrap failed
    pub vcs_error: Option<SnakeError>,
}

/// Create any missing project subdirectory; existing ones are left alone
pub fn add_missing_dirs(layout: &ProjectLayout) -> Result<Vec<PathBuf>> {
    let mut created = Vec::new();
    for dir in layout.subdirs() {
        if !dir.is_dir() {
            fs::create_dir_all(&dir).at("Failed to create", &dir)?;
            created.push(dir);
        }
    }
    Ok(created)
}

/// Orchestrates workspace creation and cloning
pub struct WorkspaceBuilder<'a> {
    config: &'a Config,
    paths: &'a SnakePaths,
    registry: &'a Registry,
    runner: &'a dyn ToolRunner,
}

impl<'a> WorkspaceBuilder<'a> {
    pub fn new(
        config: &'a Config,
        paths: &'a SnakePaths,
        registry: &'a Registry,
        runner: &'a dyn ToolRunner,
    ) -> Self {
        Self {
            config,
            paths,
            registry,
            runner,
        }
    }

    pub fn create(
        &self,
        project: &NewProject,
        resolver: &mut dyn SourceResolver,
        existing: ExistingRoot,
    ) -> Result<CreatedWorkspace> {
        project.validate()?;
        let root = project.root();

        if root.exists() {
            match existing {
                ExistingRoot::Fail => return Err(SnakeError::RootExists(root)),
                ExistingRoot::Recreate => {
                    warn!(root = %root.display(), "removing existing project root");
                    fs::remove_dir_all(&root).at("Failed to remove", &root)?;
                }
            }
        }

        let layout = ProjectLayout::new(&root);
        let partial = |step: BuildStep| {
            let root = root.clone();
            move |e: SnakeError| SnakeError::PartialWorkspace {
                root,
                step,
                source: Box::new(e),
            }
        };

        println!("Project directories setup");
        fs::create_dir_all(&root)
            .at("Failed to create", &root)
            .and_then(|_| add_missing_dirs(&layout))
            .map_err(partial(BuildStep::Directories))?;

        println!("README and requirements.txt setup");
        self.bootstrap(project, &layout)
            .map_err(partial(BuildStep::Bootstrap))?;

        println!("Template setup");
        templates::copy_templates(self.paths, &layout).map_err(partial(BuildStep::Templates))?;

        println!("Bibliography setup");
        self.bibliography(&layout)
            .map_err(partial(BuildStep::Bibliography))?;

        let importer = Importer::new(&self.config.tools, self.runner);

        println!("Importing protocol");
        let protocol = resolve_request(ArtifactKind::Protocol, resolver)
            .and_then(|req| importer.import(&layout, ArtifactKind::Protocol, &req))
            .map_err(partial(BuildStep::ImportProtocol))?;

        println!("Importing dataset");
        let dataset = resolve_request(ArtifactKind::Dataset, resolver)
            .and_then(|req| importer.import(&layout, ArtifactKind::Dataset, &req))
            .map_err(partial(BuildStep::ImportDataset))?;

        println!("Virtual environment setup");
        Provisioner::new(&self.config.tools, self.runner)
            .provision(&layout)
            .map_err(partial(BuildStep::Environment))?;

        println!("Metadata setup");
        let metadata = ProjectMetadata {
            customer: project.customer.clone(),
            acronym: project.acronym.clone(),
            title: project.title.clone(),
            created: project.created,
            url: project.remote_url(&self.config.remote.base_url),
        };
        metadata
            .write(&layout)
            .map_err(partial(BuildStep::Metadata))?;

        println!("Setting as default project");
        fs::canonicalize(&root)
            .at("Failed to resolve", &root)
            .and_then(|abs| self.registry.set_default(&abs))
            .map_err(partial(BuildStep::Registry))?;

        println!("Git setup");
        let vcs_error = match self.init_vcs(&layout, &metadata.url) {
            Ok(()) => None,
            Err(e) => {
                warn!(error = %e, "version control setup failed, workspace kept");
                Some(e)
            }
        };

        info!(root = %root.display(), "workspace created");
        Ok(CreatedWorkspace {
            layout,
            metadata,
            protocol,
            dataset,
            vcs_error,
        })
    }

    /// README and manifest from defaults, then handed to the editor
    fn bootstrap(&self, project: &NewProject, layout: &ProjectLayout) -> Result<()> {
        let readme = format!(
            "<!-- -*- mode: markdown -*- -->\n# {}\n\n{}\n\n## Description\n\n\n## TODO\n\n",
            project.dir_name(),
            project.title
        );
        fs::write(layout.readme(), readme).at("Failed to write", &layout.readme())?;

        let mut manifest = self.config.workspace.requirements.join("\n");
        manifest.push('\n');
        fs::write(layout.manifest_file(), manifest).at("Failed to write", &layout.manifest_file())?;

        let edit = ToolCommand::from_argv(Stage::Editor, &self.config.tools.editor)?
            .arg(layout.manifest_file())
            .arg(layout.readme());
        if let Err(e) = self.runner.run(&edit) {
            warn!(error = %e, "editor did not complete, continuing");
        }
        Ok(())
    }

    /// Link the shared bibliography and create the project one
    fn bibliography(&self, layout: &ProjectLayout) -> Result<()> {
        let shared = self.paths.template_biblio();
        if !shared.is_file() {
            return Err(SnakeError::NotFound(shared));
        }
        let shared = fs::canonicalize(&shared).at("Failed to resolve", &shared)?;
        crate::artifact::replace_alias(&layout.biblio_common(), &shared)?;

        let specific = layout.biblio_specific();
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&specific)
            .at("Failed to create", &specific)?;
        Ok(())
    }

    /// `git init`, add the remote, commit everything
    fn init_vcs(&self, layout: &ProjectLayout, url: &str) -> Result<()> {
        let git = &self.config.tools.git;
        let root = layout.root();
        let steps = [
            ToolCommand::from_argv(Stage::VcsInit, git)?.args(["init", "-b", "master"]),
            ToolCommand::from_argv(Stage::VcsRemote, git)?.args(["remote", "add", "origin", url]),
            ToolCommand::from_argv(Stage::VcsAdd, git)?.args(["add", "."]),
            ToolCommand::from_argv(Stage::VcsCommit, git)?.args(["commit", "-m", "Directory setup"]),
        ];
        for cmd in steps {
            self.runner.run(&cmd.current_dir(root).capture())?;
        }
        Ok(())
    }

    /// Clone `repo` (e.g. `prj23_rossi_abc`) into `parent/<rossi_abc>` and
    /// make it usable: current project, missing dirs, fresh environment
    pub fn clone_project(&self, repo: &str, parent: &Path) -> Result<ProjectLayout> {
        let dir_name = repo.split_once('_').map(|(_, rest)| rest).unwrap_or(repo);
        let root = parent.join(dir_name);
        if root.exists() {
            return Err(SnakeError::RootExists(root));
        }

        let url = format!("{}/{}", self.config.remote.base_url.trim_end_matches('/'), repo);
        let clone = ToolCommand::from_argv(Stage::VcsClone, &self.config.tools.git)?
            .args(["clone", url.as_str()])
            .arg(&root);
        self.runner.run(&clone)?;

        let layout = ProjectLayout::new(&root);
        let abs = fs::canonicalize(&root).at("Failed to resolve", &root)?;
        self.registry.set_default(&abs)?;
        add_missing_dirs(&layout)?;
        Provisioner::new(&self.config.tools, self.runner).provision(&layout)?;

        info!(root = %root.display(), %url, "project cloned");
        Ok(layout)
    }
}
