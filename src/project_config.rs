//! Optional per-project settings read from `launch.toml`.
//!
//! Only the archive contents are configurable; credentials and identifiers
//! always come from the environment.
//!
//! ```toml
//! [archive]
//! include = ["package.json", "package-lock.json", "next.config.js", "pages", "public"]
//! skip_dirs = ["node_modules"]
//! exclude = ["deployment.zip"]
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::DeployError;

pub const PROJECT_CONFIG_FILE: &str = "launch.toml";

/// File name of the temporary archive written into the project root.
pub const ARCHIVE_FILE_NAME: &str = "deployment.zip";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LaunchToml {
    #[serde(default)]
    pub archive: ArchiveSettings,
}

/// Which top-level entries go into the archive and what is skipped while walking them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArchiveSettings {
    /// Top-level files or directories, relative to the project root
    #[serde(default = "default_include")]
    pub include: Vec<String>,
    /// Directory names skipped at every depth
    #[serde(default = "default_skip_dirs")]
    pub skip_dirs: Vec<String>,
    /// Top-level names never archived, even when listed in `include`
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
}

fn default_include() -> Vec<String> {
    [
        "package.json",
        "package-lock.json",
        "next.config.js",
        "pages",
        "public",
        "app",
        "functions",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_skip_dirs() -> Vec<String> {
    vec!["node_modules".to_string()]
}

fn default_exclude() -> Vec<String> {
    vec![ARCHIVE_FILE_NAME.to_string()]
}

impl Default for ArchiveSettings {
    fn default() -> Self {
        Self {
            include: default_include(),
            skip_dirs: default_skip_dirs(),
            exclude: default_exclude(),
        }
    }
}

impl LaunchToml {
    /// Load `launch.toml` from the project root, falling back to defaults when absent.
    pub fn load_or_default(project_dir: &Path) -> Result<Self, DeployError> {
        let path = project_dir.join(PROJECT_CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path).map_err(|e| DeployError::io(&path, e))?;
        let mut parsed: LaunchToml =
            toml::from_str(&content).map_err(|e| DeployError::InvalidProjectConfig {
                path: path.clone(),
                message: e.to_string(),
            })?;

        // The archive must never contain itself.
        if !parsed
            .archive
            .exclude
            .iter()
            .any(|name| name == ARCHIVE_FILE_NAME)
        {
            parsed.archive.exclude.push(ARCHIVE_FILE_NAME.to_string());
        }
        Ok(parsed)
    }
}
