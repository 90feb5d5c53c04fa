//! Machine-to-machine token acquisition via the client-credentials grant.

use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::endpoint;
use crate::config::Credentials;
use crate::errors::{AuthSource, DeployError};
use crate::util::error_message_from_body;

const TOKEN_PATH: &[&str] = &["apps-api", "apps", "token"];

/// Scope requested for the token; grants deployment management.
pub const TOKEN_SCOPE: &str = "launch:manage";

/// Short-lived bearer token plus the organization it belongs to, if reported.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub organization_uid: Option<String>,
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("organization_uid", &self.organization_uid)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    #[serde(default)]
    organization_uid: Option<Value>,
}

/// Exchange client credentials for an access token.
pub async fn acquire_token(
    client: &reqwest::Client,
    credentials: &Credentials,
    auth_base: &Url,
) -> Result<AccessToken, DeployError> {
    let url = endpoint(auth_base, TOKEN_PATH)?;
    debug!(url = %url, client_id = %credentials.client_id, "requesting M2M token");

    let response = client
        .post(url)
        .form(&[
            ("scope", TOKEN_SCOPE),
            ("grant_type", "client_credentials"),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
        ])
        .send()
        .await?;

    let status = response.status();
    let body = response.text().await?;
    interpret_token_response(status, &body)
}

/// Map a token endpoint response to a token or a typed failure.
pub(crate) fn interpret_token_response(
    status: StatusCode,
    body: &str,
) -> Result<AccessToken, DeployError> {
    if status == StatusCode::UNAUTHORIZED {
        return Err(DeployError::Authentication {
            source_api: AuthSource::TokenEndpoint,
        });
    }

    if !status.is_success() {
        let detail = if status == StatusCode::BAD_REQUEST {
            let detail = error_message_from_body(body);
            if let Some(msg) = &detail {
                warn!(status = status.as_u16(), "Token API response: {}", msg);
            }
            detail
        } else {
            None
        };
        return Err(DeployError::TokenRequest {
            status: status.as_u16(),
            detail,
        });
    }

    let parsed: TokenResponse =
        serde_json::from_str(body).map_err(|source| DeployError::ResponseParse {
            context: "token response",
            source,
        })?;

    let token = parsed
        .access_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| DeployError::TokenRequest {
            status: status.as_u16(),
            detail: Some("response carried no access_token".to_string()),
        })?;

    let organization_uid = match parsed.organization_uid {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };

    Ok(AccessToken {
        token,
        organization_uid,
    })
}
