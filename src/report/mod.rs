//! Report build pipeline
//!
//! Drives the TeX toolchain in the project root. The only thing checked
//! afterwards is that `report.pdf` exists.

use std::fs;
use std::path::PathBuf;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use crate::artifact::replace_alias;
use crate::config::ToolsConfig;
use crate::error::{IoContext, Result, SnakeError};
use crate::layout::ProjectLayout;
use crate::tools::{relative_to, Stage, ToolCommand, ToolRunner};

/// Build products cleaned out of the project root
static AUX_FILE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\.(tex|aux|pytxcode|toc|log|bbl|bcf|blg|run\.xml|out|Rnw)$").unwrap()
});
static AUX_DIR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^pythontex-files-").unwrap());

const JOB: &str = "report";

/// Typeset src/report.tex into report.pdf
pub fn build_report(layout: &ProjectLayout, tools: &ToolsConfig, runner: &dyn ToolRunner) -> Result<PathBuf> {
    let root = layout.root();
    let source = layout.report_source();
    if !source.is_file() {
        return Err(SnakeError::NotFound(source));
    }

    let link = root.join(format!("{}.tex", JOB));
    replace_alias(&link, &relative_to(&source, root))?;

    let interpreter = format!("python:{}", relative_to(&layout.env_python(), root).display());
    let stages = [
        ToolCommand::from_argv(Stage::Typeset, &tools.pdflatex)?.arg(JOB),
        ToolCommand::from_argv(Stage::Bibliography, &tools.biber)?.arg(JOB),
        ToolCommand::from_argv(Stage::CodeExec, &tools.pythontex)?
            .args(["--interpreter", interpreter.as_str()])
            .arg(JOB),
        ToolCommand::from_argv(Stage::Typeset, &tools.pdflatex)?.arg(JOB),
        ToolCommand::from_argv(Stage::Typeset, &tools.pdflatex)?.arg(JOB),
    ];
    for cmd in stages {
        runner.run(&cmd.current_dir(root))?;
    }

    clean(layout)?;

    let report = layout.report();
    if !report.is_file() {
        return Err(SnakeError::NotFound(report));
    }
    info!(report = %report.display(), "report built");
    Ok(report)
}

/// Remove TeX auxiliaries from the project root
pub fn clean(layout: &ProjectLayout) -> Result<Vec<PathBuf>> {
    let root = layout.root();
    let mut removed = Vec::new();
    for entry in fs::read_dir(root).at("Failed to list", root)? {
        let entry = entry.at("Failed to list", root)?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        let file_type = entry.file_type().at("Failed to inspect", &path)?;

        if file_type.is_dir() && AUX_DIR_RE.is_match(&name) {
            fs::remove_dir_all(&path).at("Failed to remove", &path)?;
        } else if !file_type.is_dir() && AUX_FILE_RE.is_match(&name) {
            fs::remove_file(&path).at("Failed to remove", &path)?;
        } else {
            continue;
        }
        debug!(path = %path.display(), "removed");
        removed.push(path);
    }
    removed.sort();
    Ok(removed)
}

/// Does a file name look like a build product
pub fn is_aux(name: &str) -> bool {
    AUX_FILE_RE.is_match(name) || AUX_DIR_RE.is_match(name)
}
