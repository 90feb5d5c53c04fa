//! Deploy command — `launch-deploy deploy` (also the default).

use std::path::Path;
use std::process::ExitCode;

use console::style;
use launch_deploy::pipeline::{self, DeployOutcome};
use launch_deploy::ui::DeployUI;
use launch_deploy::ui::icons::{CROSS, HINT, PACKAGE, ROCKET};
use launch_deploy::{Config, DeployError};
use tokio::signal;
use tracing::warn;

use crate::DeployArgs;

pub async fn cmd_deploy(project_dir: &Path, args: &DeployArgs) -> ExitCode {
    load_dotenv(project_dir);

    // Preflight: no network activity until the configuration is complete.
    let config = match Config::from_lookup(project_dir, |name| {
        args.value_for(name).or_else(|| std::env::var(name).ok())
    }) {
        Ok(config) => config,
        Err(err) => return report_failure(&err),
    };

    println!();
    println!(
        "{}Deploying {} to environment {} ({})",
        PACKAGE,
        style(&config.project_uid).cyan(),
        style(&config.environment_uid).cyan(),
        config.region
    );

    // Dropping the pipeline future on a signal releases the archive guard.
    let terminated = termination_signal();
    let ui = DeployUI::new();
    let result = tokio::select! {
        result = pipeline::deploy(&config, &ui) => result,
        () = terminated => Err(DeployError::Interrupted),
    };

    match result {
        Ok(outcome) => {
            report_success(&outcome);
            ExitCode::SUCCESS
        }
        Err(err) => {
            ui.fail_pending();
            report_failure(&err)
        }
    }
}

/// Resolves on Ctrl-C or SIGTERM.
///
/// The SIGTERM handler is registered before this returns, not on first poll.
fn termination_signal() -> impl Future<Output = ()> {
    #[cfg(unix)]
    let sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
        Ok(stream) => Some(stream),
        Err(e) => {
            warn!(error = %e, "failed to install SIGTERM handler");
            None
        }
    };

    async move {
        let ctrl_c = async {
            if let Err(e) = signal::ctrl_c().await {
                warn!(error = %e, "failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async move {
            match sigterm {
                Some(mut stream) => {
                    stream.recv().await;
                }
                None => std::future::pending::<()>().await,
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            () = ctrl_c => {},
            () = terminate => {},
        }
    }
}

/// Load `<project>/.env` without overriding variables already set.
fn load_dotenv(project_dir: &Path) {
    let path = project_dir.join(".env");
    match dotenvy::from_path(&path) {
        Ok(()) => {}
        Err(e) if e.not_found() => {}
        Err(e) => warn!(path = %path.display(), error = %e, "ignoring unreadable .env file"),
    }
}

fn report_success(outcome: &DeployOutcome) {
    println!();
    println!("{}{}", ROCKET, style("Deployment created").green().bold());
    println!("  Files archived: {}", outcome.archive.file_count);
    println!("  Upload:         {} ({})", outcome.upload_uid, outcome.strategy);
    if let Some(uid) = &outcome.deployment.uid {
        println!("  Deployment:     {}", uid);
    }
    if let Some(status) = &outcome.deployment.status {
        println!("  Status:         {}", status);
    }
}

fn report_failure(err: &DeployError) -> ExitCode {
    eprintln!();
    eprintln!("{}Deployment failed: {}", CROSS, err);
    for hint in err.hints() {
        eprintln!("  {}{}", HINT, hint);
    }
    ExitCode::FAILURE
}
