pub mod api;
pub mod archive;
pub mod config;
pub mod errors;
pub mod pipeline;
pub mod project_config;
pub mod region;
pub mod ui;
pub mod upload;
pub mod util;

pub use config::Config;
pub use errors::DeployError;
pub use pipeline::{DeployOutcome, deploy};
