//! Deploy orchestration: token, archive, signed URL, upload, deployment.
//!
//! Token acquisition and archive building have no data dependency and run
//! concurrently; every later step waits for the one before it. The first
//! failure ends the run. The local archive is owned by an [`ArchiveGuard`]
//! registered before anything can fail, so it is removed exactly once on
//! every exit path, including when the whole future is dropped.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::api::{DeployApiClient, DeploymentRecord, acquire_token, http_client};
use crate::archive::{ArchiveSummary, build_archive};
use crate::config::Config;
use crate::errors::DeployError;
use crate::upload::{self, StrategyKind};

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Token,
    Archive,
    SignedUrl,
    Upload,
    CreateDeployment,
}

impl Step {
    pub fn label(&self) -> &'static str {
        match self {
            Step::Token => "Requesting access token",
            Step::Archive => "Building archive",
            Step::SignedUrl => "Requesting signed upload URL",
            Step::Upload => "Uploading archive",
            Step::CreateDeployment => "Creating deployment",
        }
    }
}

/// Receives step progress; the CLI renders it, tests ignore it.
pub trait StepObserver: Sync {
    fn started(&self, _step: Step) {}
    fn finished(&self, _step: Step, _detail: &str) {}
}

/// Observer that discards progress.
pub struct Silent;

impl StepObserver for Silent {}

/// Everything a successful run produced.
#[derive(Debug, Clone)]
pub struct DeployOutcome {
    pub archive: ArchiveSummary,
    pub upload_uid: String,
    pub strategy: StrategyKind,
    pub deployment: DeploymentRecord,
}

/// Owns the temporary archive path and deletes the file when released.
#[derive(Debug)]
pub struct ArchiveGuard {
    path: Option<PathBuf>,
}

impl ArchiveGuard {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Remove the archive if it exists. Later calls are no-ops.
    ///
    /// Returns true when a file was actually deleted.
    pub fn release(&mut self) -> bool {
        let Some(path) = self.path.take() else {
            return false;
        };
        match std::fs::remove_file(&path) {
            Ok(()) => {
                info!(path = %path.display(), "removed local archive");
                true
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to remove local archive");
                false
            }
        }
    }
}

impl Drop for ArchiveGuard {
    fn drop(&mut self) {
        self.release();
    }
}

/// Run the full deployment described by `config`.
pub async fn deploy(config: &Config, observer: &dyn StepObserver) -> Result<DeployOutcome, DeployError> {
    let client = http_client()?;
    let mut guard = ArchiveGuard::new(&config.archive_path);
    let result = run_steps(&client, config, observer).await;
    guard.release();
    result
}

async fn run_steps(
    client: &reqwest::Client,
    config: &Config,
    observer: &dyn StepObserver,
) -> Result<DeployOutcome, DeployError> {
    observer.started(Step::Token);
    observer.started(Step::Archive);
    let (token, archive) = tokio::join!(
        acquire_token(client, &config.credentials, &config.endpoints.auth_base),
        build_archive(&config.project_dir, &config.archive_path, &config.archive),
    );
    let token = token?;
    observer.finished(
        Step::Token,
        token.organization_uid.as_deref().unwrap_or("no organization"),
    );
    let archive = archive?;
    observer.finished(Step::Archive, &format!("{} files", archive.file_count));

    let api = DeployApiClient::new(client.clone(), config.endpoints.deploy_base.clone(), token);

    observer.started(Step::SignedUrl);
    let descriptor = api.signed_upload_url().await?;
    let (Some(_), Some(upload_uid)) = (descriptor.upload_url(), descriptor.upload_uid()) else {
        return Err(DeployError::InvalidDescriptor(
            "Missing uploadUrl or uploadUid in response".to_string(),
        ));
    };
    let upload_uid = upload_uid.to_string();
    observer.finished(Step::SignedUrl, &upload_uid);

    observer.started(Step::Upload);
    let strategy = upload::upload(client, &descriptor, &config.archive_path).await?;
    observer.finished(Step::Upload, &format!("{strategy} upload"));

    observer.started(Step::CreateDeployment);
    let deployment = api
        .create_deployment(&config.project_uid, &config.environment_uid, &upload_uid)
        .await?;
    observer.finished(
        Step::CreateDeployment,
        deployment.uid.as_deref().unwrap_or("accepted"),
    );

    info!(
        upload_uid = %upload_uid,
        deployment_uid = deployment.uid.as_deref().unwrap_or("-"),
        "deployment created"
    );
    Ok(DeployOutcome {
        archive,
        upload_uid,
        strategy,
        deployment,
    })
}
