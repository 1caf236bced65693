//! Per-project package environment
//!
//! One virtual environment per project under `.venv`. The dependency
//! manifest in `proj/requirements.txt` outlives it: `provision` rebuilds the
//! environment from the manifest, `snapshot` rewrites the manifest from the
//! environment.

use std::fs;

use tracing::info;

use crate::config::ToolsConfig;
use crate::error::{IoContext, Result, SnakeError};
use crate::layout::ProjectLayout;
use crate::tools::{Stage, ToolCommand, ToolRunner};

/// Creates and freezes project environments
pub struct Provisioner<'a> {
    tools: &'a ToolsConfig,
    runner: &'a dyn ToolRunner,
}

impl<'a> Provisioner<'a> {
    pub fn new(tools: &'a ToolsConfig, runner: &'a dyn ToolRunner) -> Self {
        Self { tools, runner }
    }

    /// Destroy any existing environment, create a fresh one and install
    /// the manifest into it
    pub fn provision(&self, layout: &ProjectLayout) -> Result<()> {
        let manifest = layout.manifest_file();
        if !manifest.is_file() {
            return Err(SnakeError::NotFound(manifest));
        }

        let env_dir = layout.env_dir();
        if env_dir.exists() {
            info!(env = %env_dir.display(), "removing existing environment");
            fs::remove_dir_all(&env_dir).at("Failed to remove", &env_dir)?;
        }

        let create = ToolCommand::from_argv(Stage::VenvCreate, &self.tools.python)?
            .args(["-m", "venv"])
            .arg(&env_dir);
        self.runner.run(&create)?;

        let install = ToolCommand::new(Stage::PackageInstall, layout.env_python())
            .args(["-m", "pip", "install", "-r"])
            .arg(&manifest);
        self.runner.run(&install)?;

        info!(env = %env_dir.display(), "environment provisioned");
        Ok(())
    }

    /// Overwrite the manifest with the environment's installed packages
    pub fn snapshot(&self, layout: &ProjectLayout) -> Result<usize> {
        let python = layout.env_python();
        if !python.exists() {
            return Err(SnakeError::NotFound(python));
        }
        let freeze = ToolCommand::new(Stage::PackageFreeze, &python)
            .args(["-m", "pip", "freeze"])
            .capture();
        let output = self.runner.run(&freeze)?;

        let manifest = layout.manifest_file();
        fs::write(&manifest, &output.stdout).at("Failed to write", &manifest)?;
        let count = output.stdout.lines().filter(|l| !l.trim().is_empty()).count();
        info!(manifest = %manifest.display(), packages = count, "manifest frozen");
        Ok(count)
    }
}
