use async_trait::async_trait;
use linkflow_core::error::{LinkflowError, LinkflowResult};
use linkflow_engines::shared::{PayloadBuilder, ResponseParser, UrlBuilder};
use log::info;
use serde_json::json;

use super::{RECORD_QR_CODE, RECORD_QR_DETAILS, RECORD_QR_IMAGE_PATH};
use crate::context::{ContextField, ContextValue, StepOutput, WorkflowContext};
use crate::step::{StepDescriptor, StepEnv, StepExecutor, StepGate};

static CREATE_QR_CODE: StepDescriptor = StepDescriptor {
    name: "create-qr-code",
    title: "Create QR Code",
    requires: &[ContextField::LinkpageId],
    produces: &[ContextField::QrCodeId],
    gate: StepGate::Always,
};

static GET_QR_DETAILS: StepDescriptor = StepDescriptor {
    name: "get-qr-details",
    title: "Get QR Code Details",
    requires: &[ContextField::QrCodeId],
    produces: &[],
    gate: StepGate::Always,
};

static DOWNLOAD_QR_ASSET: StepDescriptor = StepDescriptor {
    name: "download-qr-asset",
    title: "Download QR Code",
    requires: &[ContextField::QrCodeId],
    produces: &[ContextField::QrAssetPath],
    gate: StepGate::Always,
};

/// Creates a dynamic QR code whose campaign points at the linkpage
pub struct CreateQrCode;

#[async_trait]
impl StepExecutor for CreateQrCode {
    fn descriptor(&self) -> &'static StepDescriptor {
        &CREATE_QR_CODE
    }

    async fn execute(
        &self,
        context: &WorkflowContext,
        env: &StepEnv<'_>,
        output: &mut StepOutput,
    ) -> LinkflowResult<()> {
        let step = self.name();
        let linkpage_id = context.require(step, ContextField::LinkpageId, context.linkpage_id())?;
        let params = env.params;

        info!("Creating QR code '{}' for linkpage {}", params.qr_name, linkpage_id);
        let payload = PayloadBuilder::create_qr_code(&params.qr_name, params.org_id, linkpage_id);
        let response = env
            .api
            .post_json(step, &UrlBuilder::qrcodes_path(), &[env.api.org_query()], &payload)
            .await?;

        let id = ResponseParser::extract_id(&response, "id");
        output.record(RECORD_QR_CODE, response);
        let id = id.ok_or_else(|| LinkflowError::invalid_response(step, "no 'id' in QR code"))?;

        info!("  QR Code ID: {}", id);
        output.set(ContextValue::QrCodeId(id));
        Ok(())
    }
}

/// Reads the QR code back; informational only
pub struct GetQrDetails;

#[async_trait]
impl StepExecutor for GetQrDetails {
    fn descriptor(&self) -> &'static StepDescriptor {
        &GET_QR_DETAILS
    }

    async fn execute(
        &self,
        context: &WorkflowContext,
        env: &StepEnv<'_>,
        output: &mut StepOutput,
    ) -> LinkflowResult<()> {
        let step = self.name();
        let qr_code_id = context.require(step, ContextField::QrCodeId, context.qr_code_id())?;

        let details = env
            .api
            .get_json(step, &UrlBuilder::qrcode_path(qr_code_id), &[env.api.org_query()])
            .await?;

        info!(
            "  Name: {}",
            ResponseParser::extract_str(&details, "name").unwrap_or("<unnamed>")
        );
        if let Some(url) = ResponseParser::extract_str(&details, "url") {
            info!("  URL : {}", url);
        }
        output.record(RECORD_QR_DETAILS, details);
        Ok(())
    }
}

/// Downloads the rendered QR code and writes it verbatim to the output directory
pub struct DownloadQrAsset;

#[async_trait]
impl StepExecutor for DownloadQrAsset {
    fn descriptor(&self) -> &'static StepDescriptor {
        &DOWNLOAD_QR_ASSET
    }

    async fn execute(
        &self,
        context: &WorkflowContext,
        env: &StepEnv<'_>,
        output: &mut StepOutput,
    ) -> LinkflowResult<()> {
        let step = self.name();
        let qr_code_id = context.require(step, ContextField::QrCodeId, context.qr_code_id())?;
        let options = &env.params.qr_download;

        let query = [
            ("size", options.size.to_string()),
            ("error_correction_level", options.error_correction.to_string()),
            ("canvas_type", options.format.as_str().to_string()),
            env.api.org_query(),
        ];
        let bytes = env
            .api
            .get_bytes(step, &UrlBuilder::qrcode_download_path(qr_code_id), &query)
            .await?;

        let output_dir = &env.params.output_dir;
        tokio::fs::create_dir_all(output_dir).await?;
        let path = output_dir.join(format!("qr_{}.{}", qr_code_id, options.format.as_str()));
        tokio::fs::write(&path, &bytes).await?;

        info!("  Saved {} bytes to {}", bytes.len(), path.display());
        output.record(RECORD_QR_IMAGE_PATH, json!(path.display().to_string()));
        output.set(ContextValue::QrAssetPath(path));
        Ok(())
    }
}
