//! HTTP clients for the Contentstack token endpoint and the Launch deploy API.

pub mod client;
pub mod token;

pub use client::{DeployApiClient, DeploymentRecord};
pub use token::{AccessToken, acquire_token};

use reqwest::Url;

use crate::errors::DeployError;

/// Append path segments to a base URL, percent-encoding each one.
pub(crate) fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, DeployError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| DeployError::InvalidConfig(format!("'{base}' cannot be used as a base URL")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Build the shared HTTP client used for every request in a run.
///
/// No request timeout is set; connection-level timeouts come from the transport.
pub fn http_client() -> Result<reqwest::Client, DeployError> {
    reqwest::Client::builder()
        .user_agent(concat!("launch-deploy/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(DeployError::Transport)
}
