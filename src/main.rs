use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use launch_deploy::config::{CLIENT_ID_VAR, ENVIRONMENT_UID_VAR, PROJECT_UID_VAR, REGION_VAR};

mod cmd;

#[derive(Parser)]
#[command(name = "launch-deploy")]
#[command(version, about = "Package a project and deploy it to Contentstack Launch")]
pub struct Cli {
    /// Log pipeline details (same as RUST_LOG=launch_deploy=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log output format
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Project root to package (defaults to the current directory)
    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Package the project and create a new deployment (default)
    Deploy(DeployArgs),
    /// List known regions and their endpoints
    Regions,
}

/// Flags that override the corresponding environment variables.
///
/// The client secret is only read from the environment.
#[derive(Args, Default)]
pub struct DeployArgs {
    /// Overrides CONTENTSTACK_CLIENT_ID
    #[arg(long)]
    pub client_id: Option<String>,

    /// Overrides PROJECT_UID
    #[arg(long)]
    pub project_uid: Option<String>,

    /// Overrides ENVIRONMENT_UID
    #[arg(long)]
    pub environment_uid: Option<String>,

    /// Overrides CONTENTSTACK_REGION
    #[arg(long)]
    pub region: Option<String>,
}

impl DeployArgs {
    /// Value given on the command line for an environment variable name.
    pub fn value_for(&self, name: &str) -> Option<String> {
        match name {
            CLIENT_ID_VAR => self.client_id.clone(),
            PROJECT_UID_VAR => self.project_uid.clone(),
            ENVIRONMENT_UID_VAR => self.environment_uid.clone(),
            REGION_VAR => self.region.clone(),
            _ => None,
        }
    }
}

fn init_tracing(verbose: bool, format: LogFormat) {
    let default_directive = if verbose {
        "launch_deploy=debug"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn resolve_project_dir(dir: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    let dir = match dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    anyhow::ensure!(
        dir.is_dir(),
        "Project directory {} does not exist",
        dir.display()
    );
    Ok(dir)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_format);

    let project_dir = match resolve_project_dir(cli.project_dir) {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli.command.unwrap_or(Commands::Deploy(DeployArgs::default())) {
        Commands::Deploy(args) => cmd::cmd_deploy(&project_dir, &args).await,
        Commands::Regions => cmd::cmd_regions(),
    }
}
