use linkflow_core::error::{LinkflowError, LinkflowResult};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};

/// Set-once fields of a [`WorkflowContext`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ContextField {
    LinkpageId,
    LinkpageUrl,
    QrCodeId,
    QrAssetPath,
    MediaId,
    DerivedPdfUrl,
    AttachedLinkIds,
}

impl ContextField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextField::LinkpageId => "linkpage_id",
            ContextField::LinkpageUrl => "linkpage_url",
            ContextField::QrCodeId => "qr_code_id",
            ContextField::QrAssetPath => "qr_asset_path",
            ContextField::MediaId => "media_id",
            ContextField::DerivedPdfUrl => "derived_pdf_url",
            ContextField::AttachedLinkIds => "attached_link_ids",
        }
    }
}

impl fmt::Display for ContextField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value produced by a step for one context field
#[derive(Debug, Clone, PartialEq)]
pub enum ContextValue {
    LinkpageId(u64),
    LinkpageUrl(String),
    QrCodeId(u64),
    QrAssetPath(PathBuf),
    MediaId(u64),
    DerivedPdfUrl(String),
    AttachedLinkIds(Vec<u64>),
}

impl ContextValue {
    pub fn field(&self) -> ContextField {
        match self {
            ContextValue::LinkpageId(_) => ContextField::LinkpageId,
            ContextValue::LinkpageUrl(_) => ContextField::LinkpageUrl,
            ContextValue::QrCodeId(_) => ContextField::QrCodeId,
            ContextValue::QrAssetPath(_) => ContextField::QrAssetPath,
            ContextValue::MediaId(_) => ContextField::MediaId,
            ContextValue::DerivedPdfUrl(_) => ContextField::DerivedPdfUrl,
            ContextValue::AttachedLinkIds(_) => ContextField::AttachedLinkIds,
        }
    }
}

/// Everything a step hands back to the orchestrator.
///
/// Steps fill this in as they go, so a step that fails half-way still
/// contributes the records of the calls that did succeed. Its values are
/// only applied when the step completes.
#[derive(Debug, Clone, Default)]
pub struct StepOutput {
    pub values: Vec<ContextValue>,
    pub records: Vec<(String, Value)>,
}

impl StepOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, value: ContextValue) {
        self.values.push(value);
    }

    pub fn record(&mut self, name: &str, value: Value) {
        self.records.push((name.to_string(), value));
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.records.is_empty()
    }
}

/// State accumulated over one provisioning run.
///
/// Each field is written at most once, by the step that produces it. The
/// raw response of every call is kept in `records`, keyed by record name
/// and ordered by arrival.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WorkflowContext {
    linkpage_id: Option<u64>,
    linkpage_url: Option<String>,
    qr_code_id: Option<u64>,
    qr_asset_path: Option<PathBuf>,
    media_id: Option<u64>,
    derived_pdf_url: Option<String>,
    attached_link_ids: Option<Vec<u64>>,
    records: Map<String, Value>,
}

impl WorkflowContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn linkpage_id(&self) -> Option<u64> {
        self.linkpage_id
    }

    pub fn linkpage_url(&self) -> Option<&str> {
        self.linkpage_url.as_deref()
    }

    pub fn qr_code_id(&self) -> Option<u64> {
        self.qr_code_id
    }

    pub fn qr_asset_path(&self) -> Option<&Path> {
        self.qr_asset_path.as_deref()
    }

    pub fn media_id(&self) -> Option<u64> {
        self.media_id
    }

    pub fn derived_pdf_url(&self) -> Option<&str> {
        self.derived_pdf_url.as_deref()
    }

    pub fn attached_link_ids(&self) -> Option<&[u64]> {
        self.attached_link_ids.as_deref()
    }

    pub fn has(&self, field: ContextField) -> bool {
        match field {
            ContextField::LinkpageId => self.linkpage_id.is_some(),
            ContextField::LinkpageUrl => self.linkpage_url.is_some(),
            ContextField::QrCodeId => self.qr_code_id.is_some(),
            ContextField::QrAssetPath => self.qr_asset_path.is_some(),
            ContextField::MediaId => self.media_id.is_some(),
            ContextField::DerivedPdfUrl => self.derived_pdf_url.is_some(),
            ContextField::AttachedLinkIds => self.attached_link_ids.is_some(),
        }
    }

    /// Set a field; fails if it already holds a value
    pub fn apply(&mut self, value: ContextValue) -> LinkflowResult<()> {
        let field = value.field();
        if self.has(field) {
            return Err(LinkflowError::ContextConflict {
                field: field.to_string(),
            });
        }
        match value {
            ContextValue::LinkpageId(v) => self.linkpage_id = Some(v),
            ContextValue::LinkpageUrl(v) => self.linkpage_url = Some(v),
            ContextValue::QrCodeId(v) => self.qr_code_id = Some(v),
            ContextValue::QrAssetPath(v) => self.qr_asset_path = Some(v),
            ContextValue::MediaId(v) => self.media_id = Some(v),
            ContextValue::DerivedPdfUrl(v) => self.derived_pdf_url = Some(v),
            ContextValue::AttachedLinkIds(v) => self.attached_link_ids = Some(v),
        }
        Ok(())
    }

    /// Store a raw response; record names are set-once as well
    pub fn record(&mut self, name: &str, value: Value) -> LinkflowResult<()> {
        if self.records.contains_key(name) {
            return Err(LinkflowError::ContextConflict {
                field: name.to_string(),
            });
        }
        self.records.insert(name.to_string(), value);
        Ok(())
    }

    /// Merge a step's output. Every value is attempted; the first conflict is returned.
    pub fn merge(&mut self, output: StepOutput) -> LinkflowResult<()> {
        let mut first_error = None;
        for value in output.values {
            if let Err(e) = self.apply(value) {
                first_error.get_or_insert(e);
            }
        }
        for (name, value) in output.records {
            if let Err(e) = self.record(&name, value) {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Keep only the raw records of a failed step; its values are dropped.
    pub fn merge_records(&mut self, output: StepOutput) -> LinkflowResult<()> {
        let mut first_error = None;
        for (name, value) in output.records {
            if let Err(e) = self.record(&name, value) {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn records(&self) -> &Map<String, Value> {
        &self.records
    }

    /// Flat aggregate handed to the result sink
    pub fn results(&self) -> Map<String, Value> {
        self.records.clone()
    }

    /// Read a required field, reporting which step needed it
    pub fn require<T>(&self, step: &str, field: ContextField, value: Option<T>) -> LinkflowResult<T> {
        value.ok_or_else(|| LinkflowError::MissingInput {
            step: step.to_string(),
            field: field.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fields_are_set_once() {
        let mut ctx = WorkflowContext::new();
        assert!(!ctx.has(ContextField::LinkpageId));

        ctx.apply(ContextValue::LinkpageId(42)).unwrap();
        assert_eq!(ctx.linkpage_id(), Some(42));

        let err = ctx.apply(ContextValue::LinkpageId(43)).unwrap_err();
        assert!(matches!(err, LinkflowError::ContextConflict { .. }));
        assert_eq!(ctx.linkpage_id(), Some(42));
    }

    #[test]
    fn records_are_set_once_and_ordered() {
        let mut ctx = WorkflowContext::new();
        ctx.record("linkpage", json!({"id": 42})).unwrap();
        ctx.record("qr_code", json!({"id": 7})).unwrap();
        assert!(ctx.record("linkpage", json!({})).is_err());

        let results = ctx.results();
        let keys: Vec<&String> = results.keys().collect();
        assert_eq!(keys, vec!["linkpage", "qr_code"]);
        assert_eq!(ctx.records()["linkpage"]["id"], 42);
    }

    #[test]
    fn merge_applies_values_and_records() {
        let mut output = StepOutput::new();
        output.set(ContextValue::MediaId(99));
        output.set(ContextValue::DerivedPdfUrl("https://q.eddy.pro/pdf/99".into()));
        output.record("signed_url", json!({"id": 99}));

        let mut ctx = WorkflowContext::new();
        ctx.merge(output).unwrap();

        assert_eq!(ctx.media_id(), Some(99));
        assert_eq!(ctx.derived_pdf_url(), Some("https://q.eddy.pro/pdf/99"));
        assert!(ctx.records().contains_key("signed_url"));
    }

    #[test]
    fn merge_keeps_going_after_a_conflict() {
        let mut ctx = WorkflowContext::new();
        ctx.apply(ContextValue::QrCodeId(7)).unwrap();

        let mut output = StepOutput::new();
        output.set(ContextValue::QrCodeId(8));
        output.record("qr_code", json!({"id": 8}));

        assert!(ctx.merge(output).is_err());
        assert_eq!(ctx.qr_code_id(), Some(7));
        assert!(ctx.records().contains_key("qr_code"));
    }

    #[test]
    fn require_reports_step_and_field() {
        let ctx = WorkflowContext::new();
        let err = ctx
            .require("create-qr-code", ContextField::LinkpageId, ctx.linkpage_id())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "step [create-qr-code] requires 'linkpage_id' which no earlier step produced"
        );
    }
}
