//! Archive upload to a signed storage location.
//!
//! The descriptor returned by the signed-URL endpoint alone decides how the
//! archive is transferred:
//!
//! | Normalized `fields` | Strategy                  | Default method |
//! |---------------------|---------------------------|----------------|
//! | non-empty           | [`MultipartUpload`] (form POST with policy fields) | `POST` |
//! | empty or absent     | [`DirectUpload`] (raw bytes as the whole body)     | `PUT`  |
//!
//! Both stream the archive from disk and send an exact `Content-Length`.

pub mod descriptor;
pub mod multipart;

pub use descriptor::{PairMap, UploadDescriptor, normalize_pairs};
pub use multipart::MultipartFraming;

use std::path::Path;

use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Url};
use tracing::{debug, info, warn};

use crate::errors::DeployError;
use crate::project_config::ARCHIVE_FILE_NAME;

/// MIME type of the uploaded archive.
pub const ARCHIVE_CONTENT_TYPE: &str = "application/zip";

/// Form field name carrying the archive in multipart uploads.
pub const FILE_FIELD: &str = "file";

pub(crate) const STREAM_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Multipart,
    Direct,
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyKind::Multipart => write!(f, "multipart"),
            StrategyKind::Direct => write!(f, "direct"),
        }
    }
}

/// A descriptor after validation and normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadPlan {
    pub url: Url,
    /// Explicit method from the descriptor; `None` means the strategy default.
    pub method: Option<Method>,
    pub headers: PairMap,
    pub fields: PairMap,
}

impl UploadPlan {
    pub fn from_descriptor(descriptor: &UploadDescriptor) -> Result<Self, DeployError> {
        let raw_url = descriptor
            .upload_url()
            .ok_or_else(|| DeployError::InvalidDescriptor("No uploadUrl in signed URL response".into()))?;
        let url = Url::parse(raw_url).map_err(|e| {
            DeployError::InvalidDescriptor(format!("uploadUrl '{raw_url}' is not a URL ({e})"))
        })?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(DeployError::InvalidDescriptor(format!(
                "uploadUrl '{raw_url}' is not an http(s) URL"
            )));
        }

        let method = match descriptor.method.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(m) => Some(Method::from_bytes(m.to_uppercase().as_bytes()).map_err(|_| {
                DeployError::InvalidDescriptor(format!("method '{m}' is not an HTTP method"))
            })?),
        };

        Ok(Self {
            url,
            method,
            headers: descriptor.normalized_headers(),
            fields: descriptor.normalized_fields(),
        })
    }

    /// Strategy selection: any normalized form field means a multipart form upload.
    pub fn strategy_kind(&self) -> StrategyKind {
        if self.fields.is_empty() {
            StrategyKind::Direct
        } else {
            StrategyKind::Multipart
        }
    }

    pub fn into_strategy(self) -> UploadStrategy {
        match self.strategy_kind() {
            StrategyKind::Multipart => UploadStrategy::Multipart(MultipartUpload {
                url: self.url,
                method: self.method.unwrap_or(Method::POST),
                headers: self.headers,
                fields: self.fields,
            }),
            StrategyKind::Direct => UploadStrategy::Direct(DirectUpload {
                url: self.url,
                method: self.method.unwrap_or(Method::PUT),
                headers: self.headers,
            }),
        }
    }
}

/// Request line and headers, fixed before the body is opened.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
}

/// Pre-signed form POST: policy fields followed by the archive as the last part.
#[derive(Debug, Clone)]
pub struct MultipartUpload {
    pub url: Url,
    pub method: Method,
    pub headers: PairMap,
    pub fields: PairMap,
}

impl MultipartUpload {
    /// Compute framing and headers for an archive of `file_len` bytes.
    ///
    /// Header precedence, lowest first: descriptor headers, multipart
    /// `Content-Type`, computed `Content-Length`.
    pub fn prepare(&self, file_len: u64) -> Result<(PreparedRequest, MultipartFraming), DeployError> {
        let framing =
            MultipartFraming::new(&self.fields, FILE_FIELD, ARCHIVE_FILE_NAME, ARCHIVE_CONTENT_TYPE);
        let mut headers = header_map(&self.headers)?;
        headers.insert(CONTENT_TYPE, header_value(&framing.content_type())?);
        headers.insert(
            CONTENT_LENGTH,
            HeaderValue::from(framing.content_length(file_len)),
        );
        let prepared = PreparedRequest {
            method: self.method.clone(),
            url: self.url.clone(),
            headers,
        };
        Ok((prepared, framing))
    }

    async fn execute(&self, client: &reqwest::Client, archive: &Path) -> Result<(), DeployError> {
        let (file, file_len) = open_archive(archive).await?;
        let (prepared, framing) = self.prepare(file_len)?;
        debug!(fields = self.fields.len(), boundary = framing.boundary(), "multipart framing ready");
        send(client, prepared, framing.into_body(file)).await
    }
}

/// Raw streamed upload: the archive bytes are the entire request body.
#[derive(Debug, Clone)]
pub struct DirectUpload {
    pub url: Url,
    pub method: Method,
    pub headers: PairMap,
}

impl DirectUpload {
    /// Descriptor headers plus `Content-Length` and `Content-Type` where not already supplied.
    pub fn prepare(&self, file_len: u64) -> Result<PreparedRequest, DeployError> {
        let mut headers = header_map(&self.headers)?;
        match headers.get(CONTENT_LENGTH) {
            Some(given) if given.to_str().ok() != Some(file_len.to_string().as_str()) => {
                warn!(given = ?given, actual = file_len, "descriptor Content-Length differs from archive size");
            }
            Some(_) => {}
            None => {
                headers.insert(CONTENT_LENGTH, HeaderValue::from(file_len));
            }
        }
        if !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(ARCHIVE_CONTENT_TYPE));
        }
        Ok(PreparedRequest {
            method: self.method.clone(),
            url: self.url.clone(),
            headers,
        })
    }

    async fn execute(&self, client: &reqwest::Client, archive: &Path) -> Result<(), DeployError> {
        let (file, file_len) = open_archive(archive).await?;
        let prepared = self.prepare(file_len)?;
        let body = reqwest::Body::wrap_stream(tokio_util::io::ReaderStream::with_capacity(
            file,
            STREAM_CHUNK_SIZE,
        ));
        send(client, prepared, body).await
    }
}

/// One of the two transfer strategies, chosen by [`UploadPlan::into_strategy`].
#[derive(Debug, Clone)]
pub enum UploadStrategy {
    Multipart(MultipartUpload),
    Direct(DirectUpload),
}

impl UploadStrategy {
    pub fn kind(&self) -> StrategyKind {
        match self {
            UploadStrategy::Multipart(_) => StrategyKind::Multipart,
            UploadStrategy::Direct(_) => StrategyKind::Direct,
        }
    }

    pub async fn execute(&self, client: &reqwest::Client, archive: &Path) -> Result<(), DeployError> {
        match self {
            UploadStrategy::Multipart(upload) => upload.execute(client, archive).await,
            UploadStrategy::Direct(upload) => upload.execute(client, archive).await,
        }
    }
}

/// Upload the archive at `archive` to the location described by `descriptor`.
pub async fn upload(
    client: &reqwest::Client,
    descriptor: &UploadDescriptor,
    archive: &Path,
) -> Result<StrategyKind, DeployError> {
    let strategy = UploadPlan::from_descriptor(descriptor)?.into_strategy();
    strategy.execute(client, archive).await?;
    Ok(strategy.kind())
}

async fn open_archive(path: &Path) -> Result<(tokio::fs::File, u64), DeployError> {
    let file = tokio::fs::File::open(path)
        .await
        .map_err(|e| DeployError::io(path, e))?;
    let len = file
        .metadata()
        .await
        .map_err(|e| DeployError::io(path, e))?
        .len();
    Ok((file, len))
}

async fn send(
    client: &reqwest::Client,
    prepared: PreparedRequest,
    body: reqwest::Body,
) -> Result<(), DeployError> {
    info!(
        method = %prepared.method,
        host = prepared.url.host_str().unwrap_or_default(),
        "uploading archive"
    );
    let response = client
        .request(prepared.method, prepared.url)
        .headers(prepared.headers)
        .body(body)
        .send()
        .await?;

    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    // Storage services explain quota, signature and permission failures in the body.
    let body = response.text().await.unwrap_or_default();
    Err(DeployError::UploadFailed {
        status: status.as_u16(),
        body: body.trim().to_string(),
    })
}

fn header_map(pairs: &PairMap) -> Result<HeaderMap, DeployError> {
    let mut headers = HeaderMap::new();
    for (key, value) in pairs {
        let name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|_| DeployError::InvalidDescriptor(format!("invalid header name '{key}'")))?;
        headers.insert(name, header_value(value)?);
    }
    Ok(headers)
}

fn header_value(value: &str) -> Result<HeaderValue, DeployError> {
    HeaderValue::from_str(value)
        .map_err(|_| DeployError::InvalidDescriptor(format!("invalid header value '{value}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn plan(value: serde_json::Value) -> Result<UploadPlan, DeployError> {
        UploadPlan::from_descriptor(&UploadDescriptor::from_json(value).unwrap())
    }

    #[test]
    fn missing_upload_url_is_invalid_descriptor() {
        let err = plan(json!({"uploadUid": "u-1"})).unwrap_err();
        assert!(matches!(err, DeployError::InvalidDescriptor(ref m) if m.contains("uploadUrl")));
    }

    #[test]
    fn non_http_url_is_rejected() {
        let err = plan(json!({"uploadUrl": "ftp://storage.example/x"})).unwrap_err();
        assert!(matches!(err, DeployError::InvalidDescriptor(_)));
        let err = plan(json!({"uploadUrl": "not a url"})).unwrap_err();
        assert!(matches!(err, DeployError::InvalidDescriptor(_)));
    }

    #[test]
    fn non_empty_fields_select_multipart() {
        for fields in [
            json!({"key": "k"}),
            json!([{"key": "key", "value": "k"}]),
            json!([{"formFieldKey": "policy", "formFieldValue": "p"}]),
        ] {
            let plan = plan(json!({"uploadUrl": "https://s.example/x", "fields": fields})).unwrap();
            assert_eq!(plan.strategy_kind(), StrategyKind::Multipart);
        }
    }

    #[test]
    fn empty_fields_select_direct() {
        for fields in [json!(null), json!([]), json!({}), json!([{"key": " ", "value": "v"}])] {
            let plan = plan(json!({"uploadUrl": "https://s.example/x", "fields": fields})).unwrap();
            assert_eq!(plan.strategy_kind(), StrategyKind::Direct);
        }
        let plan = plan(json!({"uploadUrl": "https://s.example/x"})).unwrap();
        assert_eq!(plan.strategy_kind(), StrategyKind::Direct);
    }

    #[test]
    fn method_defaults_follow_strategy() {
        let multipart = plan(json!({"uploadUrl": "https://s.example/x", "fields": {"k": "v"}}))
            .unwrap()
            .into_strategy();
        match multipart {
            UploadStrategy::Multipart(m) => assert_eq!(m.method, Method::POST),
            other => panic!("Expected multipart, got {other:?}"),
        }

        let direct = plan(json!({"uploadUrl": "https://s.example/x"}))
            .unwrap()
            .into_strategy();
        match direct {
            UploadStrategy::Direct(d) => assert_eq!(d.method, Method::PUT),
            other => panic!("Expected direct, got {other:?}"),
        }
    }

    #[test]
    fn explicit_method_is_normalized() {
        let plan = plan(json!({"uploadUrl": "https://s.example/x", "method": " put "})).unwrap();
        assert_eq!(plan.method, Some(Method::PUT));
    }

    #[test]
    fn direct_prepare_adds_length_and_type() {
        let plan = plan(json!({
            "uploadUrl": "https://s.example/bucket/obj?X-Amz-Signature=abc",
            "method": "PUT",
            "headers": [{"key": "x-amz-acl", "value": "private"}]
        }))
        .unwrap();
        let UploadStrategy::Direct(direct) = plan.into_strategy() else {
            panic!("Expected direct strategy");
        };
        let prepared = direct.prepare(2048).unwrap();
        assert_eq!(prepared.method, Method::PUT);
        assert_eq!(prepared.url.query(), Some("X-Amz-Signature=abc"));
        assert_eq!(prepared.headers[CONTENT_LENGTH], "2048");
        assert_eq!(prepared.headers[CONTENT_TYPE], ARCHIVE_CONTENT_TYPE);
        assert_eq!(prepared.headers["x-amz-acl"], "private");
    }

    #[test]
    fn direct_prepare_keeps_supplied_headers() {
        let plan = plan(json!({
            "uploadUrl": "https://s.example/x",
            "headers": {"Content-Type": "application/octet-stream", "Content-Length": "2048"}
        }))
        .unwrap();
        let UploadStrategy::Direct(direct) = plan.into_strategy() else {
            panic!("Expected direct strategy");
        };
        let prepared = direct.prepare(2048).unwrap();
        assert_eq!(prepared.headers[CONTENT_TYPE], "application/octet-stream");
        assert_eq!(prepared.headers.get_all(CONTENT_LENGTH).iter().count(), 1);
    }

    #[test]
    fn multipart_prepare_overrides_framing_headers() {
        let plan = plan(json!({
            "uploadUrl": "https://s.example/",
            "headers": {"Content-Type": "text/plain", "Content-Length": "1", "x-extra": "1"},
            "fields": {"key": "k", "policy": "p"}
        }))
        .unwrap();
        let UploadStrategy::Multipart(multipart) = plan.into_strategy() else {
            panic!("Expected multipart strategy");
        };
        let (prepared, framing) = multipart.prepare(100).unwrap();
        assert_eq!(prepared.method, Method::POST);
        assert_eq!(prepared.headers[CONTENT_TYPE], framing.content_type().as_str());
        assert_eq!(
            prepared.headers[CONTENT_LENGTH],
            framing.content_length(100).to_string().as_str()
        );
        assert_eq!(prepared.headers["x-extra"], "1");
    }

    #[test]
    fn invalid_header_name_is_invalid_descriptor() {
        let plan = plan(json!({"uploadUrl": "https://s.example/x", "headers": {"bad header": "v"}}))
            .unwrap();
        let UploadStrategy::Direct(direct) = plan.into_strategy() else {
            panic!("Expected direct strategy");
        };
        assert!(matches!(
            direct.prepare(1).unwrap_err(),
            DeployError::InvalidDescriptor(_)
        ));
    }
}
