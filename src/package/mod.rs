//! Delivery packaging
//!
//! Collects the report and everything in outputs/ into one zip archive:
//!
//! ```text
//! <project>/report.pdf
//! <project>/attachments/<output>
//! ```
//!
//! The report keeps its own name at the top level whatever it links to.
//! Outputs keep the name they have in outputs/, and directories keep their
//! inner paths, so every output lands under attachments/.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{IoContext, Result, SnakeError};
use crate::layout::{self, ProjectLayout};

const ATTACHMENTS: &str = "attachments";

/// Result of a packaging run
#[derive(Debug, Clone)]
pub struct Package {
    pub archive: PathBuf,
    /// Archive entry names, sorted
    pub entries: Vec<String>,
}

/// Package into the well-known temporary location for the project
pub fn package(project: &ProjectLayout) -> Result<Package> {
    package_to(project, &layout::archive_path(project))
}

/// Package into `archive`, replacing any previous file there
pub fn package_to(project: &ProjectLayout, archive: &Path) -> Result<Package> {
    let report = project.report();
    if !report.is_file() {
        return Err(SnakeError::NotFound(report));
    }
    let outputs = project.outputs_dir();
    if !outputs.is_dir() {
        return Err(SnakeError::NotFound(outputs));
    }

    let entries = collect_entries(project, &outputs, &report)?;

    if fs::symlink_metadata(archive).is_ok() {
        fs::remove_file(archive).at("Failed to remove", archive)?;
    }
    write_archive(archive, &entries)?;

    info!(archive = %archive.display(), entries = entries.len(), "package written");
    Ok(Package {
        archive: archive.to_path_buf(),
        entries: entries.into_keys().collect(),
    })
}

/// Map of archive entry name to source file
fn collect_entries(
    project: &ProjectLayout,
    outputs: &Path,
    report: &Path,
) -> Result<BTreeMap<String, PathBuf>> {
    let prj = project.name();

    let mut listing: Vec<PathBuf> = fs::read_dir(outputs)
        .at("Failed to list", outputs)?
        .map(|e| e.map(|e| e.path()))
        .collect::<io::Result<_>>()
        .at("Failed to list", outputs)?;
    listing.sort();

    let mut entries = BTreeMap::new();
    for item in listing {
        let resolved = fs::canonicalize(&item).map_err(|_| SnakeError::NotFound(item.clone()))?;
        let name = item
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if resolved.is_dir() {
            for entry in WalkDir::new(&resolved).follow_links(true).sort_by_file_name() {
                let entry = entry.map_err(|e| {
                    SnakeError::io("Failed to walk", &resolved, io::Error::new(io::ErrorKind::Other, e))
                })?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let rel = entry
                    .path()
                    .strip_prefix(&resolved)
                    .unwrap_or(entry.path())
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("/");
                let key = format!("{}/{}/{}/{}", prj, ATTACHMENTS, name, rel);
                insert(&mut entries, key, entry.path().to_path_buf());
            }
        } else {
            insert(&mut entries, format!("{}/{}/{}", prj, ATTACHMENTS, name), resolved);
        }
    }

    let report_name = report
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let resolved = fs::canonicalize(report).map_err(|_| SnakeError::NotFound(report.to_path_buf()))?;
    insert(&mut entries, format!("{}/{}", prj, report_name), resolved);
    Ok(entries)
}

fn insert(entries: &mut BTreeMap<String, PathBuf>, key: String, source: PathBuf) {
    if let Some(previous) = entries.insert(key.clone(), source) {
        debug!(entry = %key, replaced = %previous.display(), "archive name collision, last write wins");
    }
}

fn write_archive(archive: &Path, entries: &BTreeMap<String, PathBuf>) -> Result<()> {
    let zip_error = |e: zip::result::ZipError| {
        SnakeError::io("Failed to write", archive, io::Error::new(io::ErrorKind::Other, e))
    };

    let file = File::create(archive).at("Failed to create", archive)?;
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, source) in entries {
        zip.start_file(name.as_str(), options).map_err(zip_error)?;
        let mut input = File::open(source).at("Failed to open", source)?;
        io::copy(&mut input, &mut zip).at("Failed to write", archive)?;
    }
    zip.finish().map_err(zip_error)?;
    Ok(())
}
