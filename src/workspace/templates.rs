//! Project templates
//!
//! The templates directory under the psnake home holds the files copied
//! into every new project. `psnake init` seeds it with the bundled defaults.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::SnakePaths;
use crate::error::{IoContext, Result, SnakeError};
use crate::layout::ProjectLayout;

/// Bundled default templates (file name, content)
pub const BUNDLED: &[(&str, &str)] = &[
    ("gitignore", include_str!("../../templates/gitignore")),
    ("biblio.bib", include_str!("../../templates/biblio.bib")),
    ("report.tex", include_str!("../../templates/report.tex")),
    ("_region_.tex", include_str!("../../templates/_region_.tex")),
    ("__init__.py", include_str!("../../templates/__init__.py")),
    ("analysis.py", include_str!("../../templates/analysis.py")),
];

/// Extensions of templates that go into a project's src/
const SOURCE_EXTENSIONS: &[&str] = &["tex", "py"];

/// Write bundled templates that are not already present
pub fn seed_templates(paths: &SnakePaths) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(&paths.templates).at("Failed to create", &paths.templates)?;
    let mut written = Vec::new();
    for (name, content) in BUNDLED {
        let path = paths.templates.join(name);
        if path.exists() {
            debug!(template = %path.display(), "keeping existing template");
            continue;
        }
        fs::write(&path, content).at("Failed to write", &path)?;
        written.push(path);
    }
    Ok(written)
}

/// Source templates (`*.tex`, `*.py`) in `dir`, sorted
pub fn source_templates(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(SnakeError::NotFound(dir.to_path_buf()));
    }
    let mut found = Vec::new();
    for entry in fs::read_dir(dir).at("Failed to list", dir)? {
        let path = entry.at("Failed to list", dir)?.path();
        let is_source = path
            .extension()
            .map(|e| SOURCE_EXTENSIONS.iter().any(|s| e == *s))
            .unwrap_or(false);
        if is_source && path.is_file() {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}

/// Copy source templates into src/ and the ignore file into the root
pub fn copy_templates(paths: &SnakePaths, layout: &ProjectLayout) -> Result<()> {
    let src_dir = layout.src_dir();
    for template in source_templates(&paths.templates)? {
        if let Some(name) = template.file_name() {
            let dest = src_dir.join(name);
            fs::copy(&template, &dest).at("Failed to copy", &template)?;
        }
    }

    let gitignore = paths.template_gitignore();
    if !gitignore.is_file() {
        return Err(SnakeError::NotFound(gitignore));
    }
    fs::copy(&gitignore, layout.gitignore()).at("Failed to copy", &gitignore)?;
    Ok(())
}
