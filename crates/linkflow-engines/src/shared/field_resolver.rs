//! Normalizes the signed-upload response of the media API into an
//! [`UploadTarget`].
//!
//! The API has shipped several shapes for this response: the upload URL under
//! different names, the signing fields nested under one of several keys, or
//! flattened onto the top level with mixed casing. Every recognized spelling
//! lives in the lookup tables below; [`FieldResolver::resolve`] is the only
//! code that walks them.

use linkflow_core::error::{SchemaResolutionFailure, SchemaResolutionKind};
use log::debug;
use serde::Serialize;
use serde_json::{Map, Value};

use super::response_parser::ResponseParser;

/// Top-level keys that may carry the upload URL, highest priority first
pub const UPLOAD_URL_KEYS: [&str; 4] = ["post_action_url", "upload_url", "s3_url", "url"];

/// Keys under which the signing fields may be nested, highest priority first
pub const NESTED_FIELD_KEYS: [&str; 3] = ["fields", "s3_fields", "upload_fields"];

/// Canonical name of the object key form field
pub const SIGNING_KEY_FIELD: &str = "key";

/// Canonical signing fields and the spellings each may appear under at the
/// top level of the response, probed in order.
pub const SIGNING_FIELD_ALIASES: &[(&str, &[&str])] = &[
    (SIGNING_KEY_FIELD, &["key"]),
    ("Policy", &["Policy", "policy"]),
    (
        "X-Amz-Algorithm",
        &["X-Amz-Algorithm", "x-amz-algorithm", "x_amz_algorithm"],
    ),
    (
        "X-Amz-Credential",
        &["X-Amz-Credential", "x-amz-credential", "x_amz_credential"],
    ),
    ("X-Amz-Date", &["X-Amz-Date", "x-amz-date", "x_amz_date"]),
    (
        "X-Amz-Signature",
        &["X-Amz-Signature", "x-amz-signature", "x_amz_signature"],
    ),
    (
        "X-Amz-Security-Token",
        &[
            "X-Amz-Security-Token",
            "x-amz-security-token",
            "x_amz_security_token",
        ],
    ),
];

/// Where and how to submit a pre-signed upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadTarget {
    pub upload_url: String,
    /// Form fields in submission order; `key` is always first
    pub fields: Vec<(String, String)>,
}

impl UploadTarget {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn key(&self) -> Option<&str> {
        self.field(SIGNING_KEY_FIELD)
    }
}

pub struct FieldResolver;

impl FieldResolver {
    /// Resolve the upload URL and signing fields of a signed-upload response
    pub fn resolve(response: &Value) -> Result<UploadTarget, SchemaResolutionFailure> {
        let empty = Map::new();
        let map = response.as_object().unwrap_or(&empty);

        let upload_url = Self::resolve_upload_url(map)
            .ok_or_else(|| Self::failure(SchemaResolutionKind::MissingUploadTarget, response))?;

        let mut fields = match Self::nested_fields(map) {
            Some(fields) => fields,
            None => {
                debug!("No nested signing fields found, extracting from top-level keys");
                Self::flattened_fields(map)
            }
        };

        let key_index = fields
            .iter()
            .position(|(k, v)| k == SIGNING_KEY_FIELD && !v.is_empty())
            .ok_or_else(|| Self::failure(SchemaResolutionKind::MissingSigningKey, response))?;
        let key = fields.remove(key_index);
        fields.insert(0, key);

        debug!(
            "Resolved upload target {} with fields {:?}",
            upload_url,
            fields.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>()
        );

        Ok(UploadTarget { upload_url, fields })
    }

    /// First non-empty string among [`UPLOAD_URL_KEYS`]
    pub fn resolve_upload_url(map: &Map<String, Value>) -> Option<String> {
        UPLOAD_URL_KEYS.iter().find_map(|key| {
            map.get(*key)
                .and_then(Value::as_str)
                .filter(|url| !url.is_empty())
                .map(str::to_string)
        })
    }

    /// First non-empty object among [`NESTED_FIELD_KEYS`], in its own key order
    fn nested_fields(map: &Map<String, Value>) -> Option<Vec<(String, String)>> {
        NESTED_FIELD_KEYS.iter().find_map(|key| {
            let nested = map.get(*key)?.as_object().filter(|m| !m.is_empty())?;
            Some(
                nested
                    .iter()
                    .filter_map(|(name, value)| {
                        Self::form_value(value).map(|value| (name.clone(), value))
                    })
                    .collect(),
            )
        })
    }

    /// Canonical fields bound from their first present top-level alias
    fn flattened_fields(map: &Map<String, Value>) -> Vec<(String, String)> {
        SIGNING_FIELD_ALIASES
            .iter()
            .filter_map(|(canonical, aliases)| {
                aliases.iter().find_map(|alias| {
                    map.get(*alias)
                        .and_then(Self::form_value)
                        .map(|value| (canonical.to_string(), value))
                })
            })
            .collect()
    }

    /// Text a JSON value is submitted as; `null` is treated as absent
    fn form_value(value: &Value) -> Option<String> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    fn failure(kind: SchemaResolutionKind, response: &Value) -> SchemaResolutionFailure {
        SchemaResolutionFailure {
            kind,
            response_keys: ResponseParser::top_level_keys(response),
        }
    }
}
