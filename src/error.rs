//! Error types shared by the workspace core

use std::path::PathBuf;

use crate::tools::Stage;
use crate::workspace::BuildStep;

pub type Result<T, E = SnakeError> = std::result::Result<T, E>;

/// Errors raised by the workspace core
///
/// Skipped imports are not errors; see [`crate::artifact::ImportOutcome`].
#[derive(Debug, thiserror::Error)]
pub enum SnakeError {
    #[error("No default project recorded in {0} (use `psnake set <prj>` or pass --prj)")]
    ConfigurationMissing(PathBuf),

    #[error("Not found: {0}")]
    NotFound(PathBuf),

    #[error("{stage} failed ({program}): {detail}")]
    ExternalTool {
        stage: Stage,
        program: String,
        detail: String,
    },

    #[error("Workspace {root} left incomplete at step '{step}': {source}")]
    PartialWorkspace {
        root: PathBuf,
        step: BuildStep,
        #[source]
        source: Box<SnakeError>,
    },

    #[error("Invalid version tag '{0}': expected a date as YYYY-MM-DD")]
    InvalidVersionTag(String),

    #[error("Invalid {field} '{value}': use letters, digits and '-' only")]
    InvalidName { field: &'static str, value: String },

    #[error("Unsupported source {path} (accepted: {accepted})")]
    UnsupportedSource { path: PathBuf, accepted: String },

    #[error("Alias {0} exists and is not a symbolic link")]
    AliasConflict(PathBuf),

    #[error("Project root {0} already exists")]
    RootExists(PathBuf),

    #[error("{context} {path}: {source}")]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SnakeError {
    pub(crate) fn io(context: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SnakeError::Io {
            context,
            path: path.into(),
            source,
        }
    }

    /// Stage of the external tool that failed, if any
    pub fn failed_stage(&self) -> Option<Stage> {
        match self {
            SnakeError::ExternalTool { stage, .. } => Some(*stage),
            SnakeError::PartialWorkspace { source, .. } => source.failed_stage(),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for SnakeError {
    fn from(e: toml::de::Error) -> Self {
        SnakeError::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for SnakeError {
    fn from(e: toml::ser::Error) -> Self {
        SnakeError::Config(e.to_string())
    }
}

/// Attach a path to a raw io error
pub(crate) trait IoContext<T> {
    fn at(self, context: &'static str, path: &std::path::Path) -> Result<T>;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn at(self, context: &'static str, path: &std::path::Path) -> Result<T> {
        self.map_err(|e| SnakeError::io(context, path, e))
    }
}
