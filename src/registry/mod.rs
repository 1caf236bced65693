//! Default project registry
//!
//! Persists which project is "current" as `[default] prj` in config.toml.
//! Only that key is touched; every other section of the file survives a
//! write. No locking: the last writer wins.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::{read_table, write_table};
use crate::error::{Result, SnakeError};

const SECTION: &str = "default";
const KEY: &str = "prj";

/// Registry backed by a single TOML file
#[derive(Debug, Clone)]
pub struct Registry {
    store: PathBuf,
}

impl Registry {
    pub fn new(store: impl Into<PathBuf>) -> Self {
        Self {
            store: store.into(),
        }
    }

    pub fn store(&self) -> &Path {
        &self.store
    }

    /// Read the current project
    ///
    /// Fails with `ConfigurationMissing` when the file, the section or the
    /// key is absent. The path is not checked for existence.
    pub fn get_default(&self) -> Result<PathBuf> {
        let missing = || SnakeError::ConfigurationMissing(self.store.clone());
        if !self.store.exists() {
            return Err(missing());
        }
        let table = read_table(&self.store)?;
        let prj = table
            .get(SECTION)
            .and_then(|s| s.get(KEY))
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(missing)?;
        Ok(PathBuf::from(prj))
    }

    /// Record `project` as current, creating the store if needed
    pub fn set_default(&self, project: &Path) -> Result<()> {
        let mut table = read_table(&self.store)?;
        let section = table
            .entry(SECTION.to_string())
            .or_insert_with(|| toml::Value::Table(toml::Table::new()));
        if !section.is_table() {
            *section = toml::Value::Table(toml::Table::new());
        }
        if let Some(section) = section.as_table_mut() {
            section.insert(
                KEY.to_string(),
                toml::Value::String(project.to_string_lossy().into_owned()),
            );
        }
        write_table(&self.store, &table)?;
        debug!(store = %self.store.display(), project = %project.display(), "default project set");
        Ok(())
    }

    /// Explicit project if given, otherwise the recorded default
    pub fn resolve(&self, explicit: Option<&Path>) -> Result<PathBuf> {
        match explicit {
            Some(p) => Ok(p.to_path_buf()),
            None => self.get_default(),
        }
    }
}
