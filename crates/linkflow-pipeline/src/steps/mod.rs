pub mod linkpage;
pub mod media;
pub mod qr_code;

pub use linkpage::{AttachPdfLink, CreateLinkpage, DetachPdfLinks};
pub use media::ProvisionAndUploadMedia;
pub use qr_code::{CreateQrCode, DownloadQrAsset, GetQrDetails};

use crate::step::StepExecutor;

// Names of the entries in the results record
pub const RECORD_LINKPAGE: &str = "linkpage";
pub const RECORD_QR_CODE: &str = "qr_code";
pub const RECORD_QR_DETAILS: &str = "qr_details";
pub const RECORD_QR_IMAGE_PATH: &str = "qr_image_path";
pub const RECORD_SIGNED_URL: &str = "signed_url";
pub const RECORD_UPLOAD_STATUS: &str = "upload_status";
pub const RECORD_MEDIA_DETAILS: &str = "media_details";
pub const RECORD_ACTIVATED_MEDIA: &str = "activated_media";
pub const RECORD_UPDATED_LINKPAGE: &str = "updated_linkpage";
pub const RECORD_DELETE_RESULT: &str = "delete_result";

/// The provisioning sequence in execution order
pub fn standard_steps() -> Vec<Box<dyn StepExecutor>> {
    vec![
        Box::new(CreateLinkpage),
        Box::new(CreateQrCode),
        Box::new(GetQrDetails),
        Box::new(DownloadQrAsset),
        Box::new(ProvisionAndUploadMedia),
        Box::new(AttachPdfLink),
        Box::new(DetachPdfLinks),
    ]
}

#[cfg(test)]
pub(crate) mod test_support {
    use linkflow_core::auth::AuthManager;
    use linkflow_core::config::{EnvironmentConfig, HttpSettings, RunParams};
    use linkflow_engines::ApiHttpClient;
    use tempfile::TempDir;

    use crate::step::StepEnv;

    pub const PDF_BASE_URL: &str = "https://q.eddy.pro";

    /// A mock-server-backed environment plus a temp dir holding `sample.pdf`
    pub struct Harness {
        pub api: ApiHttpClient,
        pub environment: EnvironmentConfig,
        pub params: RunParams,
        pub dir: TempDir,
    }

    impl Harness {
        pub fn new(server: &mockito::ServerGuard) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let pdf = dir.path().join("sample.pdf");
            std::fs::write(&pdf, b"%PDF-1.4 linkflow test").unwrap();

            let environment = EnvironmentConfig::custom("mock", &server.url(), PDF_BASE_URL).unwrap();
            let auth = AuthManager::api_token("abcdef123456").unwrap();
            let api = ApiHttpClient::new(&auth, &environment, 949, HttpSettings::default()).unwrap();

            let mut params = RunParams::new(949, &pdf);
            params.output_dir = dir.path().to_path_buf();

            Self {
                api,
                environment,
                params,
                dir,
            }
        }

        pub fn env(&self) -> StepEnv<'_> {
            StepEnv {
                api: &self.api,
                params: &self.params,
                environment: &self.environment,
            }
        }
    }
}
