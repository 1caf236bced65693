//! Configuration management for psnake
//!
//! Handles the ~/.project_snake/ directory structure and config.toml

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{IoContext, Result, SnakeError};

/// Environment variable overriding the psnake home directory
pub const HOME_ENV: &str = "PSNAKE_HOME";

/// What workspace creation does when the project root already exists
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExistingRoot {
    /// Refuse to touch an existing directory
    #[default]
    Fail,
    /// Delete the directory and build it again (dev/test convenience)
    Recreate,
}

impl std::fmt::Display for ExistingRoot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExistingRoot::Fail => write!(f, "fail"),
            ExistingRoot::Recreate => write!(f, "recreate"),
        }
    }
}

/// Main configuration structure
///
/// Lives in the same file as the default project pointer; unknown
/// sections are ignored here and preserved by the registry.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub workspace: WorkspaceConfig,
}

/// Command lines of the external programs, as argv vectors
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub editor: Vec<String>,
    pub pdf_viewer: Vec<String>,
    pub python: Vec<String>,
    pub converter: Vec<String>,
    pub merger: Vec<String>,
    pub notifier: Vec<String>,
    pub git: Vec<String>,
    pub pdflatex: Vec<String>,
    pub biber: Vec<String>,
    pub pythontex: Vec<String>,
    pub r: Vec<String>,
}

fn argv(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            editor: argv(&["emacs", "--no-splash", "-r", "-fh"]),
            pdf_viewer: argv(&["okular", "--unique"]),
            python: argv(&["python3"]),
            converter: argv(&["pandoc"]),
            merger: argv(&["ssconvert"]),
            notifier: argv(&["winston_sends"]),
            git: argv(&["git"]),
            pdflatex: argv(&["pdflatex", "-interaction=nonstopmode"]),
            biber: argv(&["biber"]),
            pythontex: argv(&["pythontex"]),
            r: argv(&["R"]),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Prefix of derived repository URLs, without trailing slash
    pub base_url: String,
    /// Extra arguments appended after the file when notifying
    pub notify_target: Vec<String>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://bitbucket.org/psnake".to_string(),
            notify_target: argv(&["group::lavoro"]),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    pub existing_root: ExistingRoot,
    /// Initial lines of a new project's dependency manifest
    pub requirements: Vec<String>,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            existing_root: ExistingRoot::default(),
            requirements: argv(&[
                "# matplotlib",
                "# scipy",
                "# statsmodels",
                "# tableone",
                "pandas",
                "openpyxl",
            ]),
        }
    }
}

/// Returns the path to the psnake home directory (~/.project_snake)
pub fn snake_home() -> Result<PathBuf> {
    if let Some(home) = std::env::var_os(HOME_ENV) {
        return Ok(PathBuf::from(home));
    }
    let home = dirs::home_dir()
        .ok_or_else(|| SnakeError::Config("Could not determine home directory".to_string()))?;
    Ok(home.join(".project_snake"))
}

/// Returns paths to all psnake directories
#[derive(Debug, Clone)]
pub struct SnakePaths {
    pub root: PathBuf,
    pub config: PathBuf,
    pub templates: PathBuf,
}

impl SnakePaths {
    pub fn new() -> Result<Self> {
        Ok(Self::at(snake_home()?))
    }

    /// Paths rooted at an explicit directory
    pub fn at(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            config: root.join("config.toml"),
            templates: root.join("templates"),
            root,
        }
    }

    /// Create all directories if they don't exist
    pub fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.root).at("Failed to create", &self.root)?;
        fs::create_dir_all(&self.templates).at("Failed to create", &self.templates)?;
        Ok(())
    }

    pub fn template_biblio(&self) -> PathBuf {
        self.templates.join("biblio.bib")
    }

    pub fn template_gitignore(&self) -> PathBuf {
        self.templates.join("gitignore")
    }

    /// Check if psnake has been initialized
    pub fn is_initialized(&self) -> bool {
        self.config.exists() && self.templates.is_dir()
    }
}

/// Load configuration from `path`, falling back to defaults if absent
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = fs::read_to_string(path).at("Failed to read", path)?;
    Ok(toml::from_str(&content)?)
}

/// Save configuration to disk, keeping sections it does not own
pub fn save_config(path: &Path, config: &Config) -> Result<()> {
    let mut table = read_table(path)?;
    let ours: toml::Table = toml::Table::try_from(config)?;
    for (key, value) in ours {
        table.insert(key, value);
    }
    write_table(path, &table)
}

/// Read the whole config file as a generic table (empty if absent)
pub(crate) fn read_table(path: &Path) -> Result<toml::Table> {
    if !path.exists() {
        return Ok(toml::Table::new());
    }
    let content = fs::read_to_string(path).at("Failed to read", path)?;
    Ok(content.parse::<toml::Table>()?)
}

pub(crate) fn write_table(path: &Path, table: &toml::Table) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).at("Failed to create", parent)?;
    }
    let content = toml::to_string_pretty(table)?;
    fs::write(path, content).at("Failed to write", path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_config_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let config = load_config(&temp.path().join("config.toml")).unwrap();
        assert_eq!(config.tools.converter, vec!["pandoc".to_string()]);
        assert_eq!(config.workspace.existing_root, ExistingRoot::Fail);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            "[default]\nprj = \"/w/a_b\"\n\n[tools]\neditor = [\"vim\"]\n\n[workspace]\nexisting_root = \"recreate\"\n",
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.tools.editor, vec!["vim".to_string()]);
        assert_eq!(config.tools.biber, vec!["biber".to_string()]);
        assert_eq!(config.workspace.existing_root, ExistingRoot::Recreate);
    }

    #[test]
    fn test_save_keeps_foreign_sections() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[default]\nprj = \"/w/a_b\"\n").unwrap();

        save_config(&path, &Config::default()).unwrap();

        let table = read_table(&path).unwrap();
        assert_eq!(table["default"]["prj"].as_str(), Some("/w/a_b"));
        assert!(table.contains_key("tools"));
    }
}
