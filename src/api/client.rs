//! Authenticated JSON client for the Launch deploy API.

use reqwest::{Method, StatusCode, Url};
use serde_json::{Value, json};
use tracing::debug;

use super::{AccessToken, endpoint};
use crate::errors::{AuthSource, DeployError};
use crate::upload::UploadDescriptor;
use crate::util::{error_message_from_body, looks_like_markup};

pub const API_VERSION_HEADER: &str = "x-cs-api-version";
pub const API_VERSION: &str = "1.0";
pub const ORGANIZATION_HEADER: &str = "organization_uid";

const SIGNED_URL_PATH: &[&str] = &["projects", "upload", "signed_url"];

/// The platform's acknowledgement of a new deployment.
///
/// Only the fields useful for reporting are lifted out; the raw body is kept.
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentRecord {
    pub uid: Option<String>,
    pub status: Option<String>,
    pub raw: Value,
}

impl DeploymentRecord {
    fn from_json(raw: Value) -> Self {
        let field = |key: &str| {
            raw.get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        Self {
            uid: field("uid"),
            status: field("status"),
            raw,
        }
    }
}

/// Launch API client bound to one access token.
#[derive(Debug, Clone)]
pub struct DeployApiClient {
    http: reqwest::Client,
    base: Url,
    token: AccessToken,
}

impl DeployApiClient {
    pub fn new(http: reqwest::Client, base: Url, token: AccessToken) -> Self {
        Self { http, base, token }
    }

    /// Send one authenticated request and return the parsed JSON body.
    ///
    /// An empty 2xx body parses as `{}`.
    pub async fn request(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&Value>,
    ) -> Result<Value, DeployError> {
        let url = endpoint(&self.base, segments)?;
        debug!(method = %method, url = %url, "Launch API request");

        let mut builder = self
            .http
            .request(method, url)
            .bearer_auth(&self.token.token)
            .header(reqwest::header::ACCEPT, "application/json")
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(API_VERSION_HEADER, API_VERSION);
        if let Some(org) = &self.token.organization_uid {
            builder = builder.header(ORGANIZATION_HEADER, org);
        }
        if let Some(body) = body {
            builder = builder.body(serde_json::to_vec(body).map_err(|source| {
                DeployError::ResponseParse {
                    context: "request body",
                    source,
                }
            })?);
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;
        interpret_api_response(status, self.base.host_str().unwrap_or_default(), &text)
    }

    /// Ask for a signed upload location for the next archive.
    pub async fn signed_upload_url(&self) -> Result<UploadDescriptor, DeployError> {
        let value = self.request(Method::GET, SIGNED_URL_PATH, None).await?;
        UploadDescriptor::from_json(value)
    }

    /// Register an uploaded archive as a new deployment of the environment.
    pub async fn create_deployment(
        &self,
        project_uid: &str,
        environment_uid: &str,
        upload_uid: &str,
    ) -> Result<DeploymentRecord, DeployError> {
        let body = json!({ "uploadUid": upload_uid });
        let segments = [
            "projects",
            project_uid,
            "environments",
            environment_uid,
            "deployments",
        ];
        let value = self.request(Method::POST, &segments, Some(&body)).await?;
        Ok(DeploymentRecord::from_json(value))
    }
}

/// Map a deploy API response to JSON or a typed failure.
pub(crate) fn interpret_api_response(
    status: StatusCode,
    host: &str,
    body: &str,
) -> Result<Value, DeployError> {
    if status == StatusCode::UNAUTHORIZED {
        return Err(DeployError::Authentication {
            source_api: AuthSource::DeployApi,
        });
    }

    let parsed = if body.trim().is_empty() {
        Ok(json!({}))
    } else {
        serde_json::from_str::<Value>(body)
    };

    match parsed {
        Err(_) if looks_like_markup(body) => Err(DeployError::WrongEndpoint {
            host: host.to_string(),
        }),
        _ if !status.is_success() => Err(DeployError::Api {
            status: status.as_u16(),
            message: error_message_from_body(body),
        }),
        Err(source) => Err(DeployError::ResponseParse {
            context: "Launch API response",
            source,
        }),
        Ok(value) => Ok(value),
    }
}
