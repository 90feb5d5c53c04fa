use std::path::{Path, PathBuf};

use crate::errors::DeployError;
use crate::project_config::{ARCHIVE_FILE_NAME, ArchiveSettings, LaunchToml};
use crate::region::RegionEndpoints;

pub const CLIENT_ID_VAR: &str = "CONTENTSTACK_CLIENT_ID";
pub const CLIENT_SECRET_VAR: &str = "CONTENTSTACK_CLIENT_SECRET";
pub const PROJECT_UID_VAR: &str = "PROJECT_UID";
pub const ENVIRONMENT_UID_VAR: &str = "ENVIRONMENT_UID";
pub const REGION_VAR: &str = "CONTENTSTACK_REGION";
pub const AUTH_URL_VAR: &str = "CONTENTSTACK_AUTH_URL";
pub const LAUNCH_URL_VAR: &str = "CONTENTSTACK_LAUNCH_URL";

/// Client-credentials pair for the M2M token grant.
#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Everything one deploy run needs, resolved once at startup.
///
/// Nothing below the CLI layer reads the process environment; the pipeline
/// receives this value and never mutates it.
#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    pub project_uid: String,
    pub environment_uid: String,
    pub region: String,
    pub endpoints: RegionEndpoints,
    pub project_dir: PathBuf,
    pub archive_path: PathBuf,
    pub archive: ArchiveSettings,
}

impl Config {
    /// Build the configuration from the process environment.
    pub fn from_env(project_dir: &Path) -> Result<Self, DeployError> {
        Self::from_lookup(project_dir, |name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    ///
    /// Values are trimmed and empty strings count as missing. An unknown
    /// region is reported on its own; otherwise every missing name is
    /// reported together.
    pub fn from_lookup<F>(project_dir: &Path, lookup: F) -> Result<Self, DeployError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let client_id = get(CLIENT_ID_VAR);
        let client_secret = get(CLIENT_SECRET_VAR);
        let project_uid = get(PROJECT_UID_VAR);
        let environment_uid = get(ENVIRONMENT_UID_VAR);
        let region = get(REGION_VAR).map(|r| r.to_uppercase());

        let endpoints = match &region {
            Some(key) => Some(RegionEndpoints::resolve(key)?),
            None => None,
        };

        let mut missing = Vec::new();
        if client_id.is_none() {
            missing.push(CLIENT_ID_VAR);
        }
        if client_secret.is_none() {
            missing.push(CLIENT_SECRET_VAR);
        }
        if project_uid.is_none() {
            missing.push(PROJECT_UID_VAR);
        }
        if environment_uid.is_none() {
            missing.push(ENVIRONMENT_UID_VAR);
        }
        if region.is_none() {
            missing.push(REGION_VAR);
        }

        let (
            Some(client_id),
            Some(client_secret),
            Some(project_uid),
            Some(environment_uid),
            Some(region),
            Some(endpoints),
        ) = (
            client_id,
            client_secret,
            project_uid,
            environment_uid,
            region,
            endpoints,
        )
        else {
            return Err(DeployError::MissingVariables { names: missing });
        };

        let endpoints = endpoints.with_overrides(
            get(AUTH_URL_VAR).as_deref(),
            get(LAUNCH_URL_VAR).as_deref(),
        )?;

        let project_dir = project_dir
            .canonicalize()
            .map_err(|e| DeployError::io(project_dir, e))?;
        let archive = LaunchToml::load_or_default(&project_dir)?.archive;
        let archive_path = project_dir.join(ARCHIVE_FILE_NAME);

        Ok(Self {
            credentials: Credentials {
                client_id,
                client_secret,
            },
            project_uid,
            environment_uid,
            region,
            endpoints,
            project_dir,
            archive_path,
            archive,
        })
    }
}
