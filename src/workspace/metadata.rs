//! Project metadata record (proj/metadata.toml)

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;

use crate::error::{IoContext, Result, SnakeError};
use crate::layout::ProjectLayout;

/// Facts fixed at creation time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    pub customer: String,
    pub acronym: String,
    pub title: String,
    pub created: NaiveDate,
    pub url: String,
}

#[derive(Serialize, Deserialize)]
struct MetadataFile {
    project: ProjectMetadata,
}

impl ProjectMetadata {
    pub fn write(&self, layout: &ProjectLayout) -> Result<()> {
        let path = layout.metadata_file();
        let content = toml::to_string_pretty(&MetadataFile {
            project: self.clone(),
        })?;
        fs::write(&path, content).at("Failed to write", &path)
    }

    pub fn read(layout: &ProjectLayout) -> Result<Self> {
        let path = layout.metadata_file();
        if !path.is_file() {
            return Err(SnakeError::NotFound(path));
        }
        let content = fs::read_to_string(&path).at("Failed to read", &path)?;
        let file: MetadataFile = toml::from_str(&content)?;
        Ok(file.project)
    }
}
