//! Region key to endpoint lookup.

use reqwest::Url;

use crate::errors::DeployError;

/// Auth and Launch API hosts for one region.
const REGION_HOSTS: &[(&str, &str, &str)] = &[
    ("AWS_NA", "app.contentstack.com", "launch-api.contentstack.com"),
    ("AWS_EU", "eu-app.contentstack.com", "eu-launch-api.contentstack.com"),
    ("AWS_AU", "au-app.contentstack.com", "au-launch-api.contentstack.com"),
    ("AZURE_NA", "azure-na-app.contentstack.com", "azure-na-launch-api.contentstack.com"),
    ("AZURE_EU", "azure-eu-app.contentstack.com", "azure-eu-launch-api.contentstack.com"),
    ("GCP_NA", "gcp-na-app.contentstack.com", "gcp-na-launch-api.contentstack.com"),
    ("GCP_EU", "gcp-eu-app.contentstack.com", "gcp-eu-launch-api.contentstack.com"),
    ("STAGE", "dev11-app.csnonprod.com", "dev-launch-api.csnonprod.com"),
];

/// Base URLs for the token endpoint and the Launch deploy API.
///
/// Resolved once from a region key; both are `https://<host>/` for the
/// built-in table and arbitrary base URLs when overridden.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionEndpoints {
    pub auth_base: Url,
    pub deploy_base: Url,
}

impl RegionEndpoints {
    /// Look up a region key (case-insensitive, surrounding whitespace ignored).
    pub fn resolve(region: &str) -> Result<Self, DeployError> {
        let key = region.trim().to_uppercase();
        let (_, auth, launch) = REGION_HOSTS
            .iter()
            .find(|(name, _, _)| *name == key)
            .ok_or_else(|| DeployError::UnknownRegion {
                region: key.clone(),
                valid: region_keys(),
            })?;

        Ok(Self {
            auth_base: https_base(auth)?,
            deploy_base: https_base(launch)?,
        })
    }

    /// Replace either base URL, e.g. for a private installation or a local test server.
    pub fn with_overrides(
        mut self,
        auth_url: Option<&str>,
        deploy_url: Option<&str>,
    ) -> Result<Self, DeployError> {
        if let Some(url) = auth_url {
            self.auth_base = parse_base(url, "CONTENTSTACK_AUTH_URL")?;
        }
        if let Some(url) = deploy_url {
            self.deploy_base = parse_base(url, "CONTENTSTACK_LAUNCH_URL")?;
        }
        Ok(self)
    }

    pub fn auth_host(&self) -> &str {
        self.auth_base.host_str().unwrap_or_default()
    }

    pub fn deploy_host(&self) -> &str {
        self.deploy_base.host_str().unwrap_or_default()
    }
}

/// All known region keys, in table order.
pub fn region_keys() -> Vec<&'static str> {
    REGION_HOSTS.iter().map(|(name, _, _)| *name).collect()
}

/// `(key, auth host, launch host)` rows for display.
pub fn region_table() -> &'static [(&'static str, &'static str, &'static str)] {
    REGION_HOSTS
}

fn https_base(host: &str) -> Result<Url, DeployError> {
    parse_base(&format!("https://{host}/"), "region table")
}

fn parse_base(raw: &str, origin: &str) -> Result<Url, DeployError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| DeployError::InvalidConfig(format!("{origin}: '{raw}' is not a URL ({e})")))?;
    if url.host_str().is_none() {
        return Err(DeployError::InvalidConfig(format!(
            "{origin}: '{raw}' has no host"
        )));
    }
    Ok(url)
}
