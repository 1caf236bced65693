// Shared fixtures for integration tests
#![allow(dead_code)]

use std::cell::RefCell;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tempfile::TempDir;

use psnake::config::{Config, SnakePaths};
use psnake::registry::Registry;
use psnake::tools::{Stage, ToolCommand, ToolOutput, ToolRunner};
use psnake::workspace::{templates, NewProject};

/// Runner that records commands and fakes the files tools would write
#[derive(Default)]
pub struct FakeRunner {
    pub calls: RefCell<Vec<ToolCommand>>,
    pub spawned: RefCell<Vec<ToolCommand>>,
    /// Stages that fail with a non-zero exit
    pub failing: Vec<Stage>,
    /// Converter and merger exit cleanly without writing anything
    pub silent: bool,
    /// What `pip freeze` prints
    pub freeze_output: String,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(stages: &[Stage]) -> Self {
        Self {
            failing: stages.to_vec(),
            ..Self::default()
        }
    }

    pub fn stages(&self) -> Vec<Stage> {
        self.calls.borrow().iter().map(|c| c.stage).collect()
    }

    pub fn calls_for(&self, stage: Stage) -> Vec<ToolCommand> {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.stage == stage)
            .cloned()
            .collect()
    }
}

fn args_of(cmd: &ToolCommand) -> Vec<String> {
    cmd.args
        .iter()
        .map(|a: &OsString| a.to_string_lossy().into_owned())
        .collect()
}

impl ToolRunner for FakeRunner {
    fn run(&self, cmd: &ToolCommand) -> psnake::Result<ToolOutput> {
        self.calls.borrow_mut().push(cmd.clone());
        if self.failing.contains(&cmd.stage) {
            return Err(cmd.failure("exit status: 1"));
        }

        let args = args_of(cmd);
        match cmd.stage {
            Stage::Merge if !self.silent => {
                if let Some(dest) = args.iter().find_map(|a| a.strip_prefix("--merge-to=")) {
                    fs::write(dest, "merged workbook").expect("fake merge output");
                }
            }
            Stage::Convert if !self.silent => {
                if let Some(i) = args.iter().position(|a| a == "-o") {
                    fs::write(&args[i + 1], "converted pdf").expect("fake convert output");
                }
            }
            Stage::VenvCreate => {
                if let Some(env) = args.last() {
                    fs::create_dir_all(env).expect("fake venv");
                }
            }
            Stage::VcsClone => {
                if let Some(dest) = args.last() {
                    let proj = Path::new(dest).join("proj");
                    fs::create_dir_all(&proj).expect("fake checkout");
                    fs::write(proj.join("requirements.txt"), "pandas\n").expect("fake manifest");
                }
            }
            Stage::Typeset => {
                if let Some(cwd) = &cmd.cwd {
                    fs::write(cwd.join("report.pdf"), "%PDF").expect("fake typeset output");
                    fs::write(cwd.join("report.aux"), "").expect("fake aux");
                }
            }
            Stage::PackageFreeze => {
                return Ok(ToolOutput {
                    stdout: self.freeze_output.clone(),
                    stderr: String::new(),
                });
            }
            _ => {}
        }
        Ok(ToolOutput::default())
    }

    fn spawn(&self, cmd: &ToolCommand) -> psnake::Result<()> {
        self.spawned.borrow_mut().push(cmd.clone());
        if self.failing.contains(&cmd.stage) {
            return Err(cmd.failure("failed to start"));
        }
        Ok(())
    }
}

/// A psnake home with seeded templates, inside a temporary directory
pub struct TestHome {
    pub temp: TempDir,
    pub paths: SnakePaths,
    pub config: Config,
    pub registry: Registry,
}

impl TestHome {
    pub fn new() -> anyhow::Result<Self> {
        let temp = TempDir::new()?;
        let paths = SnakePaths::at(temp.path().join("home"));
        paths.ensure_dirs()?;
        templates::seed_templates(&paths)?;
        let registry = Registry::new(&paths.config);
        Ok(Self {
            temp,
            paths,
            config: Config::default(),
            registry,
        })
    }

    /// Directory new projects are created in
    pub fn parent(&self) -> PathBuf {
        let dir = self.temp.path().join("projects");
        fs::create_dir_all(&dir).expect("projects dir");
        dir
    }

    pub fn new_project(&self) -> NewProject {
        NewProject {
            customer: "rossi".to_string(),
            acronym: "abc".to_string(),
            title: "Survival after surgery".to_string(),
            created: NaiveDate::from_ymd_opt(2024, 3, 1).expect("valid date"),
            parent: self.parent(),
        }
    }

    /// Write a source file outside any project
    pub fn source(&self, name: &str, content: &str) -> PathBuf {
        let dir = self.temp.path().join("incoming");
        fs::create_dir_all(&dir).expect("incoming dir");
        let path = dir.join(name);
        fs::write(&path, content).expect("source file");
        path
    }
}

/// Project root with all standard subdirectories and nothing else
pub fn bare_project(parent: &Path, name: &str) -> anyhow::Result<psnake::layout::ProjectLayout> {
    let layout = psnake::layout::ProjectLayout::new(parent.join(name));
    psnake::workspace::add_missing_dirs(&layout)?;
    Ok(layout)
}
