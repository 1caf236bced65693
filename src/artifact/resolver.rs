//! Source selection for artifact imports
//!
//! Where the files come from is injected: an interactive prompt for the
//! command line, fixed answers for flags and tests.

use std::path::PathBuf;

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::warn;

use super::{ArtifactKind, ImportRequest, VersionTag};
use crate::error::{Result, SnakeError};

/// Supplies the version tag and source files of an import
pub trait SourceResolver {
    /// Version tag as typed by the user; `None` or blank means skip
    fn version(&mut self, kind: ArtifactKind) -> Result<Option<String>>;

    /// Files to import; empty means skip
    fn select(&mut self, kind: ArtifactKind) -> Result<Vec<PathBuf>>;
}

/// Turn a resolver's answers into an import request
pub fn resolve_request(kind: ArtifactKind, resolver: &mut dyn SourceResolver) -> Result<ImportRequest> {
    let tag = match resolver.version(kind)? {
        Some(t) if !t.trim().is_empty() => t.parse::<VersionTag>()?,
        _ => return Ok(ImportRequest::Skip),
    };

    let mut sources = resolver.select(kind)?;
    if sources.is_empty() {
        return Ok(ImportRequest::Skip);
    }
    if kind == ArtifactKind::Protocol && sources.len() > 1 {
        warn!(count = sources.len(), "protocol takes a single file, keeping the first");
        sources.truncate(1);
    }
    Ok(ImportRequest::Import { tag, sources })
}

/// Pre-supplied answers
#[derive(Debug, Clone, Default)]
pub struct FixedResolver {
    pub tag: Option<String>,
    pub files: Vec<PathBuf>,
}

impl FixedResolver {
    pub fn new(tag: Option<String>, files: Vec<PathBuf>) -> Self {
        Self { tag, files }
    }

    /// Resolver that always declines
    pub fn skip() -> Self {
        Self::default()
    }
}

impl SourceResolver for FixedResolver {
    fn version(&mut self, _kind: ArtifactKind) -> Result<Option<String>> {
        Ok(self.tag.clone())
    }

    fn select(&mut self, _kind: ArtifactKind) -> Result<Vec<PathBuf>> {
        Ok(self.files.clone())
    }
}

/// One resolver per artifact kind
pub struct ByKind {
    pub protocol: Box<dyn SourceResolver>,
    pub dataset: Box<dyn SourceResolver>,
}

impl ByKind {
    fn pick(&mut self, kind: ArtifactKind) -> &mut dyn SourceResolver {
        match kind {
            ArtifactKind::Protocol => self.protocol.as_mut(),
            ArtifactKind::Dataset => self.dataset.as_mut(),
        }
    }
}

impl SourceResolver for ByKind {
    fn version(&mut self, kind: ArtifactKind) -> Result<Option<String>> {
        self.pick(kind).version(kind)
    }

    fn select(&mut self, kind: ArtifactKind) -> Result<Vec<PathBuf>> {
        self.pick(kind).select(kind)
    }
}

/// Asks on the terminal
pub struct PromptResolver {
    editor: DefaultEditor,
    /// Version given up front; only the files are asked for
    preset: Option<String>,
}

impl PromptResolver {
    pub fn new() -> Result<Self> {
        let editor = DefaultEditor::new()
            .map_err(|e| SnakeError::Config(format!("Failed to open terminal prompt: {}", e)))?;
        Ok(Self { editor, preset: None })
    }

    pub fn with_version(version: impl Into<String>) -> Result<Self> {
        let mut resolver = Self::new()?;
        resolver.preset = Some(version.into());
        Ok(resolver)
    }

    /// One line of input; Ctrl-C and Ctrl-D count as blank
    fn ask(&mut self, prompt: &str) -> Result<String> {
        match self.editor.readline(prompt) {
            Ok(line) => Ok(line.trim().to_string()),
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(String::new()),
            Err(e) => Err(SnakeError::Config(format!("Failed to read input: {}", e))),
        }
    }
}

impl SourceResolver for PromptResolver {
    fn version(&mut self, kind: ArtifactKind) -> Result<Option<String>> {
        if let Some(preset) = &self.preset {
            return Ok(Some(preset.clone()));
        }
        let answer = self.ask(&format!(
            "Date of the {} (YYYY-MM-DD) or leave blank to skip: ",
            kind
        ))?;
        Ok(Some(answer).filter(|a| !a.is_empty()))
    }

    fn select(&mut self, kind: ArtifactKind) -> Result<Vec<PathBuf>> {
        println!(
            "Select the {} file(s) to import [{}], one per line, blank line to finish:",
            kind,
            kind.accepted_sources().join(" ")
        );
        let mut files = Vec::new();
        loop {
            let line = self.ask("> ")?;
            if line.is_empty() {
                break;
            }
            files.push(PathBuf::from(line.trim_matches(|c| c == '"' || c == '\'')));
            if kind == ArtifactKind::Protocol {
                break;
            }
        }
        Ok(files)
    }
}
