//! Project directory conventions
//!
//! Maps a project root to every well-known path inside it. Nothing here
//! touches the filesystem; other modules use these functions instead of
//! hardcoding layout strings.

use std::path::{Path, PathBuf};

/// Subdirectories every initialized project has, relative to the root
pub const SUBDIRS: &[&str] = &[
    "tmp",
    "data",
    "outputs",
    "proj",
    "proj/biblio",
    "proj/docs",
    "proj/docs/revisione_protocollo",
    "proj/docs/revisione_articolo",
    "proj/docs/letteratura",
    "src",
];

/// Source files the editor should not open
const DONT_EDIT: &[&str] = &["__init__.py", "_region_.tex"];

/// Kinds of versioned artifact a project imports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Dataset,
    Protocol,
}

impl ArtifactKind {
    /// File stem shared by the dated files and the alias
    pub fn stem(&self) -> &'static str {
        match self {
            ArtifactKind::Dataset => "dataset",
            ArtifactKind::Protocol => "protocol",
        }
    }

    /// Extension of the stored artifact
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::Dataset => "xlsx",
            ArtifactKind::Protocol => "pdf",
        }
    }

    /// Extensions accepted as import sources
    pub fn accepted_sources(&self) -> &'static [&'static str] {
        match self {
            ArtifactKind::Dataset => &["csv", "xls", "xlsx", "zip"],
            ArtifactKind::Protocol => &["pdf", "doc", "docx"],
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.stem())
    }
}

impl std::str::FromStr for ArtifactKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dataset" | "data" => Ok(ArtifactKind::Dataset),
            "protocol" => Ok(ArtifactKind::Protocol),
            _ => Err(format!("Invalid artifact kind: {}. Use: dataset, protocol", s)),
        }
    }
}

/// Well-known paths of one project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    root: PathBuf,
}

impl ProjectLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Project name, i.e. the last component of the root
    pub fn name(&self) -> String {
        self.root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.root.display().to_string())
    }

    pub fn subdirs(&self) -> Vec<PathBuf> {
        SUBDIRS.iter().map(|d| self.root.join(d)).collect()
    }

    pub fn tmp_dir(&self) -> PathBuf {
        self.root.join("tmp")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join("data")
    }

    pub fn outputs_dir(&self) -> PathBuf {
        self.root.join("outputs")
    }

    pub fn proj_dir(&self) -> PathBuf {
        self.root.join("proj")
    }

    pub fn metadata_file(&self) -> PathBuf {
        self.proj_dir().join("metadata.toml")
    }

    pub fn manifest_file(&self) -> PathBuf {
        self.proj_dir().join("requirements.txt")
    }

    pub fn biblio_dir(&self) -> PathBuf {
        self.proj_dir().join("biblio")
    }

    pub fn biblio_common(&self) -> PathBuf {
        self.biblio_dir().join("common_biblio.bib")
    }

    pub fn biblio_specific(&self) -> PathBuf {
        self.biblio_dir().join("prj_biblio.bib")
    }

    pub fn docs_dir(&self) -> PathBuf {
        self.proj_dir().join("docs")
    }

    pub fn src_dir(&self) -> PathBuf {
        self.root.join("src")
    }

    /// Report source kept under src/
    pub fn report_source(&self) -> PathBuf {
        self.src_dir().join("report.tex")
    }

    /// Primary deliverable produced by the document pipeline
    pub fn report(&self) -> PathBuf {
        self.root.join("report.pdf")
    }

    pub fn readme(&self) -> PathBuf {
        self.root.join("README.md")
    }

    pub fn gitignore(&self) -> PathBuf {
        self.root.join(".gitignore")
    }

    pub fn env_dir(&self) -> PathBuf {
        self.root.join(".venv")
    }

    /// Interpreter inside the project environment
    pub fn env_python(&self) -> PathBuf {
        if cfg!(windows) {
            self.env_dir().join("Scripts").join("python.exe")
        } else {
            self.env_dir().join("bin").join("python")
        }
    }

    /// Directory an artifact kind lives in
    pub fn artifact_dir(&self, kind: ArtifactKind) -> PathBuf {
        match kind {
            ArtifactKind::Dataset => self.data_dir(),
            ArtifactKind::Protocol => self.docs_dir(),
        }
    }

    /// Dated file for `kind`, with `stamp` already in file-name form
    pub fn dated_artifact(&self, kind: ArtifactKind, stamp: &str) -> PathBuf {
        self.artifact_dir(kind)
            .join(format!("{}_{}.{}", kind.stem(), stamp, kind.extension()))
    }

    /// Stable alias pointing at the latest dated file of `kind`
    pub fn artifact_alias(&self, kind: ArtifactKind) -> PathBuf {
        self.artifact_dir(kind)
            .join(format!("{}.{}", kind.stem(), kind.extension()))
    }

    /// Files under src/ the editor must skip
    pub fn dont_edit(&self) -> Vec<PathBuf> {
        DONT_EDIT.iter().map(|f| self.src_dir().join(f)).collect()
    }
}

/// Archive written by the packager for a project
pub fn archive_path(layout: &ProjectLayout) -> PathBuf {
    std::env::temp_dir().join(format!("{}.zip", layout.name()))
}
