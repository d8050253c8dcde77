use async_trait::async_trait;
use linkflow_core::error::{LinkflowError, LinkflowResult};
use linkflow_core::redaction::redact_signing_fields;
use linkflow_engines::shared::{
    FieldResolver, FileHandler, PayloadBuilder, ResponseParser, UrlBuilder,
    MEDIA_STATUS_PENDING_UPLOAD,
};
use log::{debug, info, warn};
use serde_json::json;

use super::{
    RECORD_ACTIVATED_MEDIA, RECORD_MEDIA_DETAILS, RECORD_SIGNED_URL, RECORD_UPLOAD_STATUS,
};
use crate::context::{ContextField, ContextValue, StepOutput, WorkflowContext};
use crate::step::{StepDescriptor, StepEnv, StepExecutor, StepGate};

// Labels of the calls made by this step, as they appear in transport failures
pub const REQUEST_UPLOAD_TARGET: &str = "request-upload-target";
pub const UPLOAD_MEDIA: &str = "upload-media";
pub const VERIFY_MEDIA: &str = "verify-media";
pub const ACTIVATE_MEDIA: &str = "activate-media";

static PROVISION_MEDIA: StepDescriptor = StepDescriptor {
    name: "provision-media",
    title: "Upload PDF Media",
    requires: &[],
    produces: &[ContextField::MediaId, ContextField::DerivedPdfUrl],
    gate: StepGate::Always,
};

/// Registers a media record, uploads the PDF to object storage through a
/// pre-signed POST, checks the record and activates it.
///
/// The media id and the derived PDF URL are only emitted once activation
/// succeeds. Raw responses of the calls made so far are recorded either way.
pub struct ProvisionAndUploadMedia;

#[async_trait]
impl StepExecutor for ProvisionAndUploadMedia {
    fn descriptor(&self) -> &'static StepDescriptor {
        &PROVISION_MEDIA
    }

    async fn execute(
        &self,
        _context: &WorkflowContext,
        env: &StepEnv<'_>,
        output: &mut StepOutput,
    ) -> LinkflowResult<()> {
        let params = env.params;
        let org_id = params.org_id;
        let pdf_name = params.pdf_name()?;

        if FileHandler::get_file_extension(&params.pdf_path).as_deref() != Some("pdf") {
            warn!(
                "{} has no .pdf extension, uploading it as application/pdf anyway",
                params.pdf_path.display()
            );
        }

        // (a) signed upload target
        info!("Requesting upload target for '{}'", pdf_name);
        let query = [env.api.org_query(), ("content_type", "application".to_string())];
        let payload = PayloadBuilder::request_signed_target(org_id, params.media_folder);
        let signed = env
            .api
            .post_json(REQUEST_UPLOAD_TARGET, &UrlBuilder::media_path(None), &query, &payload)
            .await?;
        debug!("Signed upload response: {}", redact_signing_fields(&signed));

        let media_id = ResponseParser::extract_id(&signed, "id");
        let target = FieldResolver::resolve(&signed);
        output.record(RECORD_SIGNED_URL, signed);

        let media_id = media_id.ok_or_else(|| {
            LinkflowError::invalid_response(REQUEST_UPLOAD_TARGET, "no 'id' in signed upload response")
        })?;
        let pdf_url = env.environment.derived_pdf_url(media_id);
        info!("  Media ID: {}", media_id);
        info!("  PDF URL : {}", pdf_url);

        // (b) resolve, build and submit the upload form
        let target = target?;
        let form = FileHandler::build_upload_form(&target, &params.pdf_path)?;
        let upload_url = form.upload_url.clone();
        info!("Uploading {} to {}", pdf_name, upload_url);
        let status = env
            .api
            .post_multipart(UPLOAD_MEDIA, &upload_url, form.into_multipart().await?)
            .await?;
        info!("  Upload status: {}", status);
        output.record(RECORD_UPLOAD_STATUS, json!(status));

        // (c) the record should now wait for activation
        let media_path = UrlBuilder::media_path(Some(media_id));
        let org_query = [env.api.org_query()];
        let media = env.api.get_json(VERIFY_MEDIA, &media_path, &org_query).await?;
        match ResponseParser::media_status(&media) {
            Some(state) if state.eq_ignore_ascii_case(MEDIA_STATUS_PENDING_UPLOAD) => {
                info!("  Media status: {}", state)
            }
            other => warn!(
                "Media {} reports status {:?}, expected '{}'",
                media_id, other, MEDIA_STATUS_PENDING_UPLOAD
            ),
        }
        let activation = PayloadBuilder::activate_media(media_id, &media, &pdf_name, org_id);
        output.record(RECORD_MEDIA_DETAILS, media);

        // (d) activate
        let activated = env
            .api
            .put_json(ACTIVATE_MEDIA, &media_path, &org_query, &activation)
            .await?;
        info!(
            "  Activated: status={} name={}",
            ResponseParser::media_status(&activated).unwrap_or("<none>"),
            ResponseParser::extract_str(&activated, "name").unwrap_or(&pdf_name)
        );
        output.record(RECORD_ACTIVATED_MEDIA, activated);
        output.set(ContextValue::MediaId(media_id));
        output.set(ContextValue::DerivedPdfUrl(pdf_url));
        Ok(())
    }
}
