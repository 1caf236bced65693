//! Thin launchers for the editor, viewer, script runners and notifier

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::{Config, ToolsConfig};
use crate::error::{IoContext, Result, SnakeError};
use crate::layout::{self, ProjectLayout};
use crate::tools::{relative_to, Stage, ToolCommand, ToolRunner};

/// Files in `dir` with extension `ext`, sorted
fn files_with_extension(dir: &Path, ext: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut found = Vec::new();
    for entry in fs::read_dir(dir).at("Failed to list", dir)? {
        let path = entry.at("Failed to list", dir)?.path();
        if path.is_file() && path.extension().map(|e| e == ext).unwrap_or(false) {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}

/// Files opened by `edit`, relative to the project root
pub fn editable_files(layout: &ProjectLayout) -> Result<Vec<PathBuf>> {
    let skip = layout.dont_edit();
    let mut files = vec![layout.readme(), layout.manifest_file()];
    for ext in ["py", "tex"] {
        files.extend(
            files_with_extension(&layout.src_dir(), ext)?
                .into_iter()
                .filter(|f| !skip.contains(f)),
        );
    }
    Ok(files
        .iter()
        .map(|f| relative_to(f, layout.root()))
        .collect())
}

/// Open the project's editable files, without waiting
pub fn edit(layout: &ProjectLayout, tools: &ToolsConfig, runner: &dyn ToolRunner) -> Result<()> {
    let cmd = ToolCommand::from_argv(Stage::Editor, &tools.editor)?
        .args(editable_files(layout)?)
        .current_dir(layout.root());
    runner.spawn(&cmd)
}

/// Open proj/docs/*.pdf in the viewer, without waiting
pub fn view_docs(layout: &ProjectLayout, tools: &ToolsConfig, runner: &dyn ToolRunner) -> Result<usize> {
    let docs = files_with_extension(&layout.docs_dir(), "pdf")?;
    if docs.is_empty() {
        return Err(SnakeError::NotFound(layout.docs_dir().join("*.pdf")));
    }
    let cmd = ToolCommand::from_argv(Stage::Viewer, &tools.pdf_viewer)?.args(&docs);
    runner.spawn(&cmd)?;
    Ok(docs.len())
}

/// Open one PDF in the viewer, without waiting
pub fn view(path: &Path, tools: &ToolsConfig, runner: &dyn ToolRunner) -> Result<()> {
    let cmd = ToolCommand::from_argv(Stage::Viewer, &tools.pdf_viewer)?.arg(path);
    runner.spawn(&cmd)
}

/// Run every src/*.py with the project interpreter, from the root
pub fn run_python(layout: &ProjectLayout, runner: &dyn ToolRunner) -> Result<Vec<PathBuf>> {
    let root = layout.root();
    let scripts = files_with_extension(&layout.src_dir(), "py")?;
    for script in &scripts {
        let rel = relative_to(script, root);
        println!("Executing {}.", rel.display());
        let cmd = ToolCommand::new(Stage::Script, layout.env_python())
            .arg(&rel)
            .current_dir(root);
        runner.run(&cmd)?;
    }
    Ok(scripts)
}

/// Run every src/*.R in batch mode, output in tmp/<stem>.txt
pub fn run_r(layout: &ProjectLayout, tools: &ToolsConfig, runner: &dyn ToolRunner) -> Result<Vec<PathBuf>> {
    let root = layout.root();
    let scripts = files_with_extension(&layout.src_dir(), "R")?;
    for script in &scripts {
        let stem = script
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let input = relative_to(script, root);
        let output = relative_to(&layout.tmp_dir().join(format!("{}.txt", stem)), root);
        println!("Executing {} (output in {})", input.display(), output.display());
        let cmd = ToolCommand::from_argv(Stage::Script, &tools.r)?
            .args(["CMD", "BATCH", "--no-save", "--no-restore"])
            .arg(&input)
            .arg(&output)
            .current_dir(root);
        runner.run(&cmd)?;
    }
    Ok(scripts)
}

/// What `send` hands to the notifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendItem {
    Report,
    Outputs,
    Archive,
}

impl std::str::FromStr for SendItem {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "report" => Ok(SendItem::Report),
            "outputs" => Ok(SendItem::Outputs),
            "zip" | "archive" => Ok(SendItem::Archive),
            _ => Err(format!("Invalid item: {}. Use: report, outputs, zip", s)),
        }
    }
}

/// Files `send` would transmit for `item`
pub fn send_list(layout: &ProjectLayout, item: SendItem) -> Result<Vec<PathBuf>> {
    let files = match item {
        SendItem::Report => vec![layout.report()],
        SendItem::Archive => vec![layout::archive_path(layout)],
        SendItem::Outputs => {
            let outputs = layout.outputs_dir();
            let mut files = Vec::new();
            if outputs.is_dir() {
                for entry in fs::read_dir(&outputs).at("Failed to list", &outputs)? {
                    files.push(entry.at("Failed to list", &outputs)?.path());
                }
            }
            files.sort();
            if files.is_empty() {
                return Err(SnakeError::NotFound(outputs));
            }
            files
        }
    };
    for file in &files {
        if !file.exists() {
            return Err(SnakeError::NotFound(file.clone()));
        }
    }
    Ok(files)
}

/// Hand files to the notifier, fire-and-forget
pub fn send(layout: &ProjectLayout, item: SendItem, config: &Config, runner: &dyn ToolRunner) -> Result<usize> {
    let files = send_list(layout, item)?;
    for file in &files {
        let resolved = fs::canonicalize(file).at("Failed to resolve", file)?;
        let cmd = ToolCommand::from_argv(Stage::Notify, &config.tools.notifier)?
            .arg(&resolved)
            .args(&config.remote.notify_target);
        runner.spawn(&cmd)?;
        info!(file = %resolved.display(), "sent");
    }
    Ok(files.len())
}
