//! CLI commands for psnake
//!
//! Every project-scoped command resolves its project here, once, from an
//! explicit `--prj` or the registry, and passes the layout down.

use anyhow::{Context, Result};
use chrono::Local;
use std::path::{Path, PathBuf};

use crate::artifact::{
    alias_target, resolve_request, ArtifactKind, ByKind, FixedResolver, ImportOutcome, Importer,
    PromptResolver, SourceResolver,
};
use crate::config::{load_config, save_config, Config, ExistingRoot, SnakePaths};
use crate::environment::Provisioner;
use crate::error::SnakeError;
use crate::launch::{self, SendItem};
use crate::layout::ProjectLayout;
use crate::package;
use crate::registry::Registry;
use crate::report;
use crate::tools::{SystemRunner, ToolRunner};
use crate::workspace::{self, templates, NewProject, ProjectMetadata, WorkspaceBuilder};

/// Everything a command needs, built once at the entry point
pub struct Session {
    pub paths: SnakePaths,
    pub config: Config,
    pub registry: Registry,
    pub runner: Box<dyn ToolRunner>,
}

impl Session {
    /// Session on the user's home configuration with real processes
    pub fn load() -> Result<Self> {
        let paths = SnakePaths::new()?;
        Self::with(paths, Box::new(SystemRunner))
    }

    pub fn with(paths: SnakePaths, runner: Box<dyn ToolRunner>) -> Result<Self> {
        let config = load_config(&paths.config)
            .with_context(|| format!("Failed to load {}", paths.config.display()))?;
        let registry = Registry::new(&paths.config);
        Ok(Self {
            paths,
            config,
            registry,
            runner,
        })
    }

    /// Project to operate on: explicit if given, else the default
    pub fn project(&self, explicit: Option<&Path>) -> Result<ProjectLayout> {
        let root = self.registry.resolve(explicit)?;
        if !root.is_dir() {
            return Err(SnakeError::NotFound(root).into());
        }
        Ok(ProjectLayout::new(root))
    }
}

/// How an import command gets its answers
#[derive(Debug, Clone, Default)]
pub struct ImportArgs {
    pub date: Option<String>,
    pub files: Vec<PathBuf>,
    pub skip: bool,
}

/// Where an import's answers come from
#[derive(Debug, Clone, PartialEq, Eq)]
enum Answers {
    Skip,
    Fixed { date: String, files: Vec<PathBuf> },
    /// Prompt for the files, and for the date unless given
    Prompt { date: Option<String> },
}

impl ImportArgs {
    fn is_unset(&self) -> bool {
        !self.skip && self.date.is_none() && self.files.is_empty()
    }

    fn answers(&self) -> Answers {
        if self.skip {
            return Answers::Skip;
        }
        if self.files.is_empty() {
            return Answers::Prompt {
                date: self.date.clone(),
            };
        }
        let date = self
            .date
            .clone()
            .unwrap_or_else(|| Local::now().date_naive().format("%Y-%m-%d").to_string());
        Answers::Fixed {
            date,
            files: self.files.clone(),
        }
    }

    fn resolver(&self) -> Result<Box<dyn SourceResolver>> {
        let resolver: Box<dyn SourceResolver> = match self.answers() {
            Answers::Skip => Box::new(FixedResolver::skip()),
            Answers::Fixed { date, files } => Box::new(FixedResolver::new(Some(date), files)),
            Answers::Prompt { date: Some(date) } => Box::new(PromptResolver::with_version(date)?),
            Answers::Prompt { date: None } => Box::new(PromptResolver::new()?),
        };
        Ok(resolver)
    }
}

/// Import answers for workspace creation; prompts when none are given
#[derive(Debug, Clone, Default)]
pub struct CreateImports {
    pub protocol: ImportArgs,
    pub dataset: ImportArgs,
}

impl CreateImports {
    fn resolver(&self) -> Result<Box<dyn SourceResolver>> {
        if self.protocol.is_unset() && self.dataset.is_unset() {
            return Ok(Box::new(PromptResolver::new()?));
        }
        // once any import flag is given, a kind without flags is skipped
        let per_kind = |args: &ImportArgs| -> Result<Box<dyn SourceResolver>> {
            if args.is_unset() {
                Ok(Box::new(FixedResolver::skip()))
            } else {
                args.resolver()
            }
        };
        Ok(Box::new(ByKind {
            protocol: per_kind(&self.protocol)?,
            dataset: per_kind(&self.dataset)?,
        }))
    }
}

/// Initialize psnake for first-time setup
pub fn init(session: &Session) -> Result<()> {
    let paths = &session.paths;
    println!("Initializing psnake at {}...", paths.root.display());

    paths.ensure_dirs()?;
    println!("  Created directory structure");

    if paths.config.exists() {
        println!("  Kept existing config.toml");
    } else {
        save_config(&paths.config, &Config::default())?;
        println!("  Created config.toml");
    }

    let written = templates::seed_templates(paths)?;
    println!("  Wrote {} template(s) to {}", written.len(), paths.templates.display());

    println!();
    println!("psnake initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  edit {}           Configure tools and remote", paths.config.display());
    println!("  psnake create <customer> <acronym>     Create a new project");
    Ok(())
}

/// Create a new project in `parent`
pub fn create(
    session: &Session,
    customer: &str,
    acronym: &str,
    title: &str,
    parent: &Path,
    recreate: bool,
    imports: &CreateImports,
) -> Result<()> {
    let project = NewProject {
        customer: customer.to_string(),
        acronym: acronym.to_string(),
        title: title.to_string(),
        created: Local::now().date_naive(),
        parent: parent.to_path_buf(),
    };
    let existing = if recreate {
        ExistingRoot::Recreate
    } else {
        session.config.workspace.existing_root
    };

    let mut resolver = imports.resolver()?;
    let builder = WorkspaceBuilder::new(
        &session.config,
        &session.paths,
        &session.registry,
        session.runner.as_ref(),
    );
    let created = builder.create(&project, resolver.as_mut(), existing)?;

    println!();
    println!("Created project: {}", created.layout.root().display());
    println!("  Repository: {}", created.metadata.url);
    print_outcome("Protocol", &created.protocol);
    print_outcome("Dataset", &created.dataset);
    if let Some(e) = &created.vcs_error {
        println!("  Warning: version control not initialized: {}", e);
    }
    Ok(())
}

/// Clone an existing project repository into `parent`
pub fn clone(session: &Session, repo: &str, parent: &Path) -> Result<()> {
    let builder = WorkspaceBuilder::new(
        &session.config,
        &session.paths,
        &session.registry,
        session.runner.as_ref(),
    );
    let layout = builder.clone_project(repo, parent)?;
    println!("Cloned {} into {}", repo, layout.root().display());
    Ok(())
}

pub fn get_default(session: &Session) -> Result<()> {
    let prj = session.registry.get_default()?;
    println!("{}", prj.display());
    Ok(())
}

/// Record `prj` as the default project, made absolute against the current
/// directory; it does not have to exist yet
pub fn set_default(session: &Session, prj: &Path) -> Result<()> {
    let abs = std::path::absolute(prj)
        .with_context(|| format!("Failed to resolve {}", prj.display()))?;
    session.registry.set_default(&abs)?;
    println!("Default project: {}", abs.display());
    Ok(())
}

/// Show the metadata record and artifact aliases of a project
pub fn info(session: &Session, prj: Option<&Path>, json: bool) -> Result<()> {
    let layout = session.project(prj)?;
    let meta = ProjectMetadata::read(&layout)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&meta)?);
        return Ok(());
    }

    println!("Project: {}", layout.root().display());
    println!("{}", "=".repeat(50));
    println!("Customer: {}", meta.customer);
    println!("Acronym:  {}", meta.acronym);
    println!("Title:    {}", meta.title);
    println!("Created:  {}", meta.created);
    println!("URL:      {}", meta.url);
    for kind in [ArtifactKind::Protocol, ArtifactKind::Dataset] {
        match alias_target(&layout.artifact_alias(kind))? {
            Some(target) => println!("{:<9} {}", format!("{}:", kind), target.display()),
            None => println!("{:<9} (none)", format!("{}:", kind)),
        }
    }
    Ok(())
}

pub fn import(session: &Session, kind: ArtifactKind, prj: Option<&Path>, args: &ImportArgs) -> Result<()> {
    let layout = session.project(prj)?;
    let mut resolver = args.resolver()?;
    let request = resolve_request(kind, resolver.as_mut())?;
    let outcome = Importer::new(&session.config.tools, session.runner.as_ref())
        .import(&layout, kind, &request)
        .with_context(|| format!("Failed to import {}", kind))?;
    print_outcome(&capitalize(&kind.to_string()), &outcome);
    Ok(())
}

pub fn venv_setup(session: &Session, prj: Option<&Path>) -> Result<()> {
    let layout = session.project(prj)?;
    Provisioner::new(&session.config.tools, session.runner.as_ref()).provision(&layout)?;
    println!("✓ Environment ready at {}", layout.env_dir().display());
    Ok(())
}

pub fn venv_freeze(session: &Session, prj: Option<&Path>) -> Result<()> {
    let layout = session.project(prj)?;
    let count = Provisioner::new(&session.config.tools, session.runner.as_ref()).snapshot(&layout)?;
    println!("✓ Froze {} package(s) into {}", count, layout.manifest_file().display());
    Ok(())
}

pub fn zip(session: &Session, prj: Option<&Path>) -> Result<()> {
    let layout = session.project(prj)?;
    let pkg = package::package(&layout)?;
    println!("✓ Packaged {} file(s) into {}", pkg.entries.len(), pkg.archive.display());
    for entry in &pkg.entries {
        println!("  {}", entry);
    }
    Ok(())
}

pub fn build_report(session: &Session, prj: Option<&Path>, view: bool) -> Result<()> {
    let layout = session.project(prj)?;
    let runner = session.runner.as_ref();
    let pdf = report::build_report(&layout, &session.config.tools, runner)?;
    println!("✓ Built {}", pdf.display());
    if view {
        launch::view(&pdf, &session.config.tools, runner)?;
    }
    Ok(())
}

pub fn clean(session: &Session, prj: Option<&Path>) -> Result<()> {
    let layout = session.project(prj)?;
    let removed = report::clean(&layout)?;
    println!("Removed {} build file(s)", removed.len());
    Ok(())
}

pub fn edit(session: &Session, prj: Option<&Path>) -> Result<()> {
    let layout = session.project(prj)?;
    launch::edit(&layout, &session.config.tools, session.runner.as_ref())?;
    Ok(())
}

pub fn docs(session: &Session, prj: Option<&Path>) -> Result<()> {
    let layout = session.project(prj)?;
    launch::view_docs(&layout, &session.config.tools, session.runner.as_ref())?;
    Ok(())
}

pub fn run_python(session: &Session, prj: Option<&Path>) -> Result<()> {
    let layout = session.project(prj)?;
    let scripts = launch::run_python(&layout, session.runner.as_ref())?;
    if scripts.is_empty() {
        println!("No python scripts in {}", layout.src_dir().display());
    }
    Ok(())
}

pub fn run_r(session: &Session, prj: Option<&Path>) -> Result<()> {
    let layout = session.project(prj)?;
    let scripts = launch::run_r(&layout, &session.config.tools, session.runner.as_ref())?;
    if scripts.is_empty() {
        println!("No R scripts in {}", layout.src_dir().display());
    }
    Ok(())
}

pub fn send(session: &Session, prj: Option<&Path>, item: &str) -> Result<()> {
    let item: SendItem = item.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    let layout = session.project(prj)?;
    let count = launch::send(&layout, item, &session.config, session.runner.as_ref())?;
    println!("✓ Sent {} file(s)", count);
    Ok(())
}

/// Add any missing standard directory to a project
pub fn fix_dirs(session: &Session, prj: Option<&Path>) -> Result<()> {
    let layout = session.project(prj)?;
    let created = workspace::add_missing_dirs(&layout)?;
    for dir in &created {
        println!("  Created {}", dir.display());
    }
    println!("Added {} missing directories", created.len());
    Ok(())
}

fn print_outcome(label: &str, outcome: &ImportOutcome) {
    match outcome {
        ImportOutcome::Skipped => println!("  {}: skipped", label),
        ImportOutcome::Imported { dated, alias } => {
            println!("  {}: {} -> {}", label, alias.display(), dated.display())
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
