//! Typed error hierarchy for the deploy pipeline.
//!
//! Every pipeline step returns `DeployError`; nothing is retried or recovered
//! locally, so the variant that reaches `cmd::deploy` is the one the user sees.
//! Variants group into five families:
//! - configuration: missing variables, unknown region, bad `launch.toml`
//! - HTTP status: authentication, token request, deploy API
//! - response shape: unparseable bodies, wrong endpoint, incomplete descriptor
//! - transfer: upload rejected by storage, connection-level failures
//! - local: archive and filesystem failures, interruption

use std::path::PathBuf;

use thiserror::Error;

/// Which remote rejected the credentials with a 401.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthSource {
    /// The token endpoint rejected the client id/secret.
    TokenEndpoint,
    /// The deploy API rejected the bearer token.
    DeployApi,
}

impl std::fmt::Display for AuthSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthSource::TokenEndpoint => write!(f, "token endpoint rejected the client credentials"),
            AuthSource::DeployApi => write!(f, "Launch API rejected the access token"),
        }
    }
}

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("Missing: {}", .names.join(", "))]
    MissingVariables { names: Vec<&'static str> },

    #[error("Unknown CONTENTSTACK_REGION: {region} (use one of: {})", .valid.join(", "))]
    UnknownRegion {
        region: String,
        valid: Vec<&'static str>,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to read {path}: {message}")]
    InvalidProjectConfig { path: PathBuf, message: String },

    #[error("Authentication failed (401): {source_api}")]
    Authentication { source_api: AuthSource },

    #[error("Token request failed: {status}{}", dash_suffix(.detail.as_deref()))]
    TokenRequest { status: u16, detail: Option<String> },

    #[error("API Error {status}{}", dash_suffix(.message.as_deref()))]
    Api { status: u16, message: Option<String> },

    #[error("Parse error in {context}: {source}")]
    ResponseParse {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid API endpoint: {host} answered with an XML/HTML page")]
    WrongEndpoint { host: String },

    #[error("Invalid signed URL response: {0}")]
    InvalidDescriptor(String),

    #[error("Upload failed: {status}{}", dash_suffix(Some(.body.as_str())))]
    UploadFailed { status: u16, body: String },

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to build archive {path}: {message}")]
    Archive { path: PathBuf, message: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Deployment interrupted")]
    Interrupted,
}

fn dash_suffix(detail: Option<&str>) -> String {
    match detail {
        Some(d) if !d.is_empty() => format!(" - {d}"),
        _ => String::new(),
    }
}

impl DeployError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DeployError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for failures detected before any network request is made.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            DeployError::MissingVariables { .. }
                | DeployError::UnknownRegion { .. }
                | DeployError::InvalidConfig(_)
                | DeployError::InvalidProjectConfig { .. }
        )
    }

    /// Contextual hints printed under the failure message.
    pub fn hints(&self) -> Vec<&'static str> {
        let mut hints = Vec::new();
        match self {
            DeployError::Authentication { .. } => {
                hints.push("Check M2M app has Launch API permissions");
            }
            DeployError::TokenRequest { status: 400, .. } => {
                hints.push("Check CONTENTSTACK_CLIENT_ID and CONTENTSTACK_CLIENT_SECRET");
            }
            DeployError::Api { status: 404, .. } => {
                hints.push("Verify PROJECT_UID and ENVIRONMENT_UID");
            }
            DeployError::Api { status: 403, .. } => {
                hints.push("Check M2M app has Launch API permissions");
            }
            DeployError::WrongEndpoint { .. } => {
                hints.push("Invalid API endpoint - check CONTENTSTACK_REGION");
            }
            DeployError::InvalidDescriptor(_) => {
                hints.push("The signed upload response was incomplete; retry the deployment");
            }
            DeployError::UploadFailed { .. } => {
                hints.push("The signed upload URL may have expired; retry the deployment");
            }
            _ => {}
        }
        if self.is_configuration() {
            hints.push("Check environment variables");
        }
        hints
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_variables_lists_names_in_order() {
        let err = DeployError::MissingVariables {
            names: vec!["PROJECT_UID", "ENVIRONMENT_UID"],
        };
        assert_eq!(err.to_string(), "Missing: PROJECT_UID, ENVIRONMENT_UID");
        assert!(err.is_configuration());
        assert_eq!(err.hints(), vec!["Check environment variables"]);
    }

    #[test]
    fn unknown_region_echoes_valid_keys() {
        let err = DeployError::UnknownRegion {
            region: "MARS".into(),
            valid: vec!["AWS_EU", "AWS_NA"],
        };
        let msg = err.to_string();
        assert!(msg.contains("MARS"));
        assert!(msg.contains("AWS_EU, AWS_NA"));
    }

    #[test]
    fn authentication_from_either_source_gets_permissions_hint() {
        for source_api in [AuthSource::TokenEndpoint, AuthSource::DeployApi] {
            let err = DeployError::Authentication { source_api };
            assert!(err.to_string().contains("401"));
            assert_eq!(err.hints(), vec!["Check M2M app has Launch API permissions"]);
            assert!(!err.is_configuration());
        }
    }

    #[test]
    fn not_found_suggests_checking_identifiers() {
        let err = DeployError::Api {
            status: 404,
            message: None,
        };
        assert_eq!(err.to_string(), "API Error 404");
        assert_eq!(err.hints(), vec!["Verify PROJECT_UID and ENVIRONMENT_UID"]);
    }

    #[test]
    fn api_error_carries_server_message() {
        let err = DeployError::Api {
            status: 422,
            message: Some("environment is locked".into()),
        };
        assert_eq!(err.to_string(), "API Error 422 - environment is locked");
        assert!(err.hints().is_empty());
    }

    #[test]
    fn token_request_detail_is_optional() {
        let bare = DeployError::TokenRequest {
            status: 500,
            detail: None,
        };
        assert_eq!(bare.to_string(), "Token request failed: 500");

        let detailed = DeployError::TokenRequest {
            status: 400,
            detail: Some("invalid_client".into()),
        };
        assert_eq!(detailed.to_string(), "Token request failed: 400 - invalid_client");
    }

    #[test]
    fn upload_failure_includes_body_when_present() {
        let err = DeployError::UploadFailed {
            status: 403,
            body: "<Error><Code>AccessDenied</Code></Error>".into(),
        };
        assert!(err.to_string().starts_with("Upload failed: 403 - <Error>"));

        let empty = DeployError::UploadFailed {
            status: 500,
            body: String::new(),
        };
        assert_eq!(empty.to_string(), "Upload failed: 500");
    }

    #[test]
    fn wrong_endpoint_points_at_region() {
        let err = DeployError::WrongEndpoint {
            host: "eu-launch-api.contentstack.com".into(),
        };
        assert_eq!(
            err.hints(),
            vec!["Invalid API endpoint - check CONTENTSTACK_REGION"]
        );
    }

    #[test]
    fn error_implements_std_error() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&DeployError::Interrupted);
    }
}
