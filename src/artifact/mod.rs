//! Versioned artifact import
//!
//! An artifact is stored as an immutable dated file (`dataset_2024_03_01.xlsx`)
//! plus a fixed-name alias symlink (`dataset.xlsx`) pointing at the latest
//! import. Older dated files stay on disk; only the alias moves.
//!
//! The dated file is first produced in the project's tmp/ directory and
//! renamed into place once complete, and the alias is only touched after
//! that. A failing converter therefore leaves the previous version
//! authoritative.

pub mod resolver;

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use tracing::{debug, info};

use crate::config::ToolsConfig;
use crate::error::{IoContext, Result, SnakeError};
use crate::layout::ProjectLayout;
use crate::tools::{Stage, ToolCommand, ToolRunner};

pub use crate::layout::ArtifactKind;
pub use resolver::{resolve_request, ByKind, FixedResolver, PromptResolver, SourceResolver};

/// Date an artifact version refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionTag(NaiveDate);

impl VersionTag {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn today() -> Self {
        Self(Local::now().date_naive())
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// Form used inside file names
    pub fn stamp(&self) -> String {
        self.0.format("%Y_%m_%d").to_string()
    }
}

impl std::fmt::Display for VersionTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl std::str::FromStr for VersionTag {
    type Err = SnakeError;

    /// Accepts `YYYY-MM-DD` and the file-name form `YYYY_MM_DD`
    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().replace('_', "-");
        NaiveDate::parse_from_str(&normalized, "%Y-%m-%d")
            .map(VersionTag)
            .map_err(|_| SnakeError::InvalidVersionTag(s.to_string()))
    }
}

/// What the caller wants imported
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportRequest {
    /// Optional step declined; nothing is touched
    Skip,
    Import {
        tag: VersionTag,
        sources: Vec<PathBuf>,
    },
}

/// Result of an import
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    Skipped,
    Imported { dated: PathBuf, alias: PathBuf },
}

/// Brings external files into a project as versioned artifacts
pub struct Importer<'a> {
    tools: &'a ToolsConfig,
    runner: &'a dyn ToolRunner,
}

impl<'a> Importer<'a> {
    pub fn new(tools: &'a ToolsConfig, runner: &'a dyn ToolRunner) -> Self {
        Self { tools, runner }
    }

    /// Import `request` as the newest version of `kind`
    pub fn import(
        &self,
        layout: &ProjectLayout,
        kind: ArtifactKind,
        request: &ImportRequest,
    ) -> Result<ImportOutcome> {
        let (tag, sources) = match request {
            ImportRequest::Skip => {
                info!(%kind, "import skipped");
                return Ok(ImportOutcome::Skipped);
            }
            ImportRequest::Import { sources, .. } if sources.is_empty() => {
                info!(%kind, "no source selected, import skipped");
                return Ok(ImportOutcome::Skipped);
            }
            ImportRequest::Import { tag, sources } => (tag, sources),
        };

        for source in sources {
            check_source(kind, source)?;
        }
        let alias = layout.artifact_alias(kind);
        check_alias(&alias)?;

        let stamp = tag.stamp();
        let dated = layout.dated_artifact(kind, &stamp);
        let staging_dir = layout.tmp_dir();
        fs::create_dir_all(&staging_dir).at("Failed to create", &staging_dir)?;
        let staged = staging_dir.join(format!(".{}_{}.{}", kind.stem(), stamp, kind.extension()));
        remove_if_present(&staged)?;

        match kind {
            ArtifactKind::Dataset => self.consolidate(layout, &stamp, sources, &staged)?,
            ArtifactKind::Protocol => self.transfer(&sources[0], &staged)?,
        }

        if !staged.is_file() {
            let (stage, argv) = match kind {
                ArtifactKind::Dataset => (Stage::Merge, &self.tools.merger),
                ArtifactKind::Protocol => (Stage::Convert, &self.tools.converter),
            };
            return Err(SnakeError::ExternalTool {
                stage,
                program: argv.first().cloned().unwrap_or_default(),
                detail: format!("no output written to {}", staged.display()),
            });
        }

        let dir = layout.artifact_dir(kind);
        fs::create_dir_all(&dir).at("Failed to create", &dir)?;
        fs::rename(&staged, &dated).at("Failed to move into place", &dated)?;

        let target = fs::canonicalize(&dated).at("Failed to resolve", &dated)?;
        replace_alias(&alias, &target)?;

        info!(%kind, %tag, dated = %dated.display(), "artifact imported");
        Ok(ImportOutcome::Imported { dated, alias })
    }

    /// Tabular sources: one workbook is copied, anything else is merged
    fn consolidate(
        &self,
        layout: &ProjectLayout,
        stamp: &str,
        sources: &[PathBuf],
        staged: &Path,
    ) -> Result<()> {
        let target_ext = ArtifactKind::Dataset.extension();
        if let [single] = sources {
            if has_extension(single, target_ext) {
                fs::copy(single, staged).at("Failed to copy", single)?;
                return Ok(());
            }
        }

        let unpack_dir = layout.tmp_dir().join(format!("dataset_{}", stamp));
        if unpack_dir.exists() {
            fs::remove_dir_all(&unpack_dir).at("Failed to remove", &unpack_dir)?;
        }
        let mut inputs = Vec::new();
        for (i, source) in sources.iter().enumerate() {
            if has_extension(source, "zip") {
                let stem = source
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let dir = unpack_dir.join(format!("{}_{}", i, stem));
                inputs.extend(unpack_tables(source, &dir)?);
            } else {
                inputs.push(source.clone());
            }
        }

        let cmd = ToolCommand::from_argv(Stage::Merge, &self.tools.merger)?
            .arg(format!("--merge-to={}", staged.display()))
            .args(&inputs);
        self.runner.run(&cmd)?;
        Ok(())
    }

    /// Document sources: copied if already PDF, converted otherwise
    fn transfer(&self, source: &Path, staged: &Path) -> Result<()> {
        if has_extension(source, ArtifactKind::Protocol.extension()) {
            fs::copy(source, staged).at("Failed to copy", source)?;
            return Ok(());
        }
        let cmd = ToolCommand::from_argv(Stage::Convert, &self.tools.converter)?
            .arg("-o")
            .arg(staged)
            .arg(source);
        self.runner.run(&cmd)?;
        Ok(())
    }
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().eq_ignore_ascii_case(ext))
        .unwrap_or(false)
}

fn check_source(kind: ArtifactKind, source: &Path) -> Result<()> {
    if !source.is_file() {
        return Err(SnakeError::NotFound(source.to_path_buf()));
    }
    let accepted = kind.accepted_sources();
    if !accepted.iter().any(|ext| has_extension(source, ext)) {
        return Err(SnakeError::UnsupportedSource {
            path: source.to_path_buf(),
            accepted: accepted.join(" "),
        });
    }
    Ok(())
}

fn remove_if_present(path: &Path) -> Result<()> {
    match fs::symlink_metadata(path) {
        Ok(_) => fs::remove_file(path).at("Failed to remove", path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(SnakeError::io("Failed to inspect", path, e)),
    }
}

/// Extract the tabular members of a zip archive under `dir`, keeping
/// their paths inside the archive
fn unpack_tables(archive: &Path, dir: &Path) -> Result<Vec<PathBuf>> {
    let file = File::open(archive).at("Failed to open", archive)?;
    let mut zip = zip::ZipArchive::new(file)
        .map_err(|e| SnakeError::io("Failed to read", archive, io::Error::new(io::ErrorKind::InvalidData, e)))?;
    fs::create_dir_all(dir).at("Failed to create", dir)?;

    let mut extracted = Vec::new();
    for i in 0..zip.len() {
        let mut entry = zip
            .by_index(i)
            .map_err(|e| SnakeError::io("Failed to read", archive, io::Error::new(io::ErrorKind::InvalidData, e)))?;
        if entry.is_dir() {
            continue;
        }
        let Some(name) = entry.enclosed_name().map(Path::to_path_buf) else {
            continue;
        };
        let is_table = ["csv", "xls", "xlsx"].iter().any(|ext| has_extension(&name, ext));
        if !is_table {
            debug!(archive = %archive.display(), entry = %name.display(), "skipping non-tabular member");
            continue;
        }
        let out_path = dir.join(&name);
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).at("Failed to create", parent)?;
        }
        let mut out = File::create(&out_path).at("Failed to create", &out_path)?;
        io::copy(&mut entry, &mut out).at("Failed to extract", &out_path)?;
        extracted.push(out_path);
    }
    Ok(extracted)
}

/// Refuse an alias path held by anything but a symlink
fn check_alias(alias: &Path) -> Result<()> {
    match fs::symlink_metadata(alias) {
        Ok(meta) if !meta.file_type().is_symlink() => Err(SnakeError::AliasConflict(alias.to_path_buf())),
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(SnakeError::io("Failed to inspect", alias, e)),
    }
}

/// Point `alias` at `target`, replacing any previous alias
///
/// The new link is created beside the alias and renamed over it, so a
/// concurrent reader sees either the old or the new target. A regular file
/// at the alias path is never clobbered.
pub fn replace_alias(alias: &Path, target: &Path) -> Result<()> {
    check_alias(alias)?;
    debug!(alias = %alias.display(), target = %target.display(), "pointing alias");

    let name = alias
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let staging = alias.with_file_name(format!(".{}.new", name));
    remove_if_present(&staging)?;
    make_symlink(target, &staging)?;
    fs::rename(&staging, alias).at("Failed to replace", alias)
}

/// Current target of an alias, if it exists
pub fn alias_target(alias: &Path) -> Result<Option<PathBuf>> {
    match fs::read_link(alias) {
        Ok(target) => Ok(Some(target)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(SnakeError::io("Failed to read alias", alias, e)),
    }
}

#[cfg(unix)]
pub(crate) fn make_symlink(target: &Path, link: &Path) -> Result<()> {
    std::os::unix::fs::symlink(target, link).at("Failed to link", link)
}

#[cfg(windows)]
pub(crate) fn make_symlink(target: &Path, link: &Path) -> Result<()> {
    std::os::windows::fs::symlink_file(target, link).at("Failed to link", link)
}
