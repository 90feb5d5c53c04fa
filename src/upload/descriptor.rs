//! Signed upload descriptors and their normalization.
//!
//! The signed-URL endpoint describes headers and pre-signed form fields in
//! more than one shape:
//!
//! ```json
//! { "headers": [{ "key": "x-amz-acl", "value": "private" }] }
//! { "headers": { "x-amz-acl": "private" } }
//! { "fields": [{ "formFieldKey": "policy", "formFieldValue": "..." }] }
//! { "fields": [{ "key": "policy", "value": "..." }] }
//! { "fields": { "policy": "..." } }
//! ```
//!
//! [`normalize_pairs`] folds all of them into one [`PairMap`]. Keys and values
//! are trimmed, entries whose key or value is empty afterwards are dropped, and
//! when a key repeats the later value wins at the key's first position. Pairs
//! keep the order the server sent them in; storage services that check form
//! policies can depend on it. For list entries carrying both naming
//! conventions the earlier convention in the list takes precedence.

use indexmap::IndexMap;
use serde::Deserialize;
use serde::de::Error as _;
use serde_json::Value;
use tracing::warn;

use crate::errors::DeployError;

/// Canonical flat mapping for headers and form fields, in received order.
pub type PairMap = IndexMap<String, String>;

/// Pair naming accepted for `headers` list entries.
pub const HEADER_CONVENTIONS: &[(&str, &str)] = &[("key", "value")];

/// Pair naming accepted for `fields` list entries, in precedence order.
pub const FIELD_CONVENTIONS: &[(&str, &str)] =
    &[("formFieldKey", "formFieldValue"), ("key", "value")];

/// Response of the signed-URL request, as received.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadDescriptor {
    #[serde(default)]
    pub upload_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub upload_uid: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub headers: Option<Value>,
    #[serde(default)]
    pub fields: Option<Value>,
}

impl UploadDescriptor {
    pub fn from_json(value: Value) -> Result<Self, DeployError> {
        // serde would otherwise fill the struct positionally from an array.
        if !value.is_object() {
            return Err(DeployError::ResponseParse {
                context: "signed URL response",
                source: serde_json::Error::custom(format!(
                    "expected a JSON object, got {}",
                    json_kind(&value)
                )),
            });
        }
        serde_json::from_value(value).map_err(|source| DeployError::ResponseParse {
            context: "signed URL response",
            source,
        })
    }

    /// Upload URL, if present and non-blank.
    pub fn upload_url(&self) -> Option<&str> {
        non_blank(self.upload_url.as_deref())
    }

    /// Correlation id for the later deployment-creation call, if present and non-blank.
    pub fn upload_uid(&self) -> Option<&str> {
        non_blank(self.upload_uid.as_deref())
    }

    pub fn normalized_headers(&self) -> PairMap {
        normalize_pairs(self.headers.as_ref(), HEADER_CONVENTIONS)
    }

    pub fn normalized_fields(&self) -> PairMap {
        normalize_pairs(self.fields.as_ref(), FIELD_CONVENTIONS)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(scalar_to_string))
}

/// Render a JSON scalar as a string; `null`, arrays and objects yield `None`.
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Fold a list-of-pairs or flat-object value into a [`PairMap`].
///
/// `conventions` lists the `(key, value)` member names accepted for list
/// entries, highest precedence first. Anything that is neither a list nor an
/// object normalizes to an empty map.
pub fn normalize_pairs(raw: Option<&Value>, conventions: &[(&str, &str)]) -> PairMap {
    let mut out = PairMap::new();
    match raw {
        None | Some(Value::Null) => {}
        Some(Value::Array(entries)) => {
            for entry in entries {
                let Some(obj) = entry.as_object() else {
                    continue;
                };
                let pair = conventions.iter().find_map(|(k, v)| {
                    let key = obj.get(*k).and_then(scalar_to_string)?;
                    let value = obj.get(*v).and_then(scalar_to_string)?;
                    Some((key, value))
                });
                if let Some((key, value)) = pair {
                    insert_trimmed(&mut out, &key, &value);
                }
            }
        }
        Some(Value::Object(map)) => {
            for (key, value) in map {
                if let Some(value) = scalar_to_string(value) {
                    insert_trimmed(&mut out, key, &value);
                }
            }
        }
        Some(other) => {
            warn!(value = %other, "ignoring unexpected pair collection shape");
        }
    }
    out
}

fn insert_trimmed(out: &mut PairMap, key: &str, value: &str) {
    let (key, value) = (key.trim(), value.trim());
    if !key.is_empty() && !value.is_empty() {
        out.insert(key.to_string(), value.to_string());
    }
}
