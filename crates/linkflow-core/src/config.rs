use clap::ValueEnum;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{LinkflowError, LinkflowResult};

/// Deployment targets the pipeline can run against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Qa,
    Prod,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Qa => "qa",
            Environment::Prod => "prod",
        }
    }

    /// The fixed base URLs of this deployment target
    pub fn config(&self) -> EnvironmentConfig {
        match self {
            Environment::Qa => EnvironmentConfig {
                name: self.as_str().to_string(),
                api_base_url: "https://beaconstacqa.mobstac.com/api/2.0".to_string(),
                pdf_base_url: "https://q.eddy.pro".to_string(),
            },
            Environment::Prod => EnvironmentConfig {
                name: self.as_str().to_string(),
                api_base_url: "https://api.uniqode.com/api/2.0".to_string(),
                pdf_base_url: "https://eddy.pro".to_string(),
            },
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Base URLs resolved once before the first call and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub name: String,
    /// Root of the resource-management API, without trailing slash
    pub api_base_url: String,
    /// Root of the asset-delivery host serving uploaded PDFs
    pub pdf_base_url: String,
}

impl EnvironmentConfig {
    /// Builds a configuration for a host that is not one of the built-in targets
    pub fn custom(name: &str, api_base_url: &str, pdf_base_url: &str) -> LinkflowResult<Self> {
        for (label, url) in [("api base URL", api_base_url), ("PDF base URL", pdf_base_url)] {
            reqwest::Url::parse(url)
                .map_err(|e| LinkflowError::Config(format!("invalid {} '{}': {}", label, url, e)))?;
        }

        let config = Self {
            name: name.to_string(),
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            pdf_base_url: pdf_base_url.trim_end_matches('/').to_string(),
        };
        debug!("Using custom environment '{}' ({})", config.name, config.api_base_url);
        Ok(config)
    }

    /// Public URL under which the platform serves an uploaded PDF media record
    pub fn derived_pdf_url(&self, media_id: u64) -> String {
        format!("{}/pdf/{}", self.pdf_base_url.trim_end_matches('/'), media_id)
    }
}

/// Rendering format requested for the downloaded QR asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum QrFormat {
    Pdf,
    Png,
    Svg,
}

impl QrFormat {
    /// Value of the `canvas_type` query parameter, also used as file extension
    pub fn as_str(&self) -> &'static str {
        match self {
            QrFormat::Pdf => "pdf",
            QrFormat::Png => "png",
            QrFormat::Svg => "svg",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrDownloadOptions {
    pub size: u32,
    pub error_correction: u8,
    pub format: QrFormat,
}

impl Default for QrDownloadOptions {
    fn default() -> Self {
        Self {
            size: 1024,
            error_correction: 2,
            format: QrFormat::Pdf,
        }
    }
}

/// Caller-supplied parameters for a single provisioning run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunParams {
    pub org_id: u64,
    pub linkpage_name: String,
    pub qr_name: String,
    pub pdf_path: PathBuf,
    pub media_folder: Option<u64>,
    pub output_dir: PathBuf,
    pub qr_download: QrDownloadOptions,
    /// Run the optional link detach step after attaching the PDF
    pub detach_links: bool,
}

impl RunParams {
    pub fn new(org_id: u64, pdf_path: impl Into<PathBuf>) -> Self {
        Self {
            org_id,
            linkpage_name: "Hersheys TLC 101".to_string(),
            qr_name: "QR: Hersheys 10001".to_string(),
            pdf_path: pdf_path.into(),
            media_folder: None,
            output_dir: PathBuf::from("."),
            qr_download: QrDownloadOptions::default(),
            detach_links: false,
        }
    }

    /// Base name of the PDF, used as upload file name and link title
    pub fn pdf_name(&self) -> LinkflowResult<String> {
        file_name_of(&self.pdf_path)
    }

    pub fn validate(&self) -> LinkflowResult<()> {
        if self.org_id == 0 {
            return Err(LinkflowError::Config(
                "organization id must be non-zero".to_string(),
            ));
        }
        if !self.pdf_path.is_file() {
            return Err(LinkflowError::Config(format!(
                "PDF file not found: {}",
                self.pdf_path.display()
            )));
        }
        if self.linkpage_name.trim().is_empty() || self.qr_name.trim().is_empty() {
            return Err(LinkflowError::Config(
                "linkpage and QR names must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

pub fn file_name_of(path: &Path) -> LinkflowResult<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| {
            LinkflowError::Config(format!("invalid file name: {}", path.display()))
        })
}

/// Settings of the HTTP layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpSettings {
    pub timeout: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_environments() {
        let qa = Environment::Qa.config();
        assert_eq!(qa.api_base_url, "https://beaconstacqa.mobstac.com/api/2.0");
        assert_eq!(qa.pdf_base_url, "https://q.eddy.pro");

        let prod = Environment::Prod.config();
        assert_eq!(prod.api_base_url, "https://api.uniqode.com/api/2.0");
        assert_eq!(prod.pdf_base_url, "https://eddy.pro");
    }

    #[test]
    fn test_derived_pdf_url_for_both_environments() {
        for media_id in [1u64, 99, 123_456_789] {
            assert_eq!(
                Environment::Qa.config().derived_pdf_url(media_id),
                format!("https://q.eddy.pro/pdf/{}", media_id)
            );
            assert_eq!(
                Environment::Prod.config().derived_pdf_url(media_id),
                format!("https://eddy.pro/pdf/{}", media_id)
            );
        }
    }

    #[test]
    fn test_custom_environment_trims_and_validates() {
        let cfg = EnvironmentConfig::custom("local", "http://127.0.0.1:9000/api/", "http://cdn.local/")
            .unwrap();
        assert_eq!(cfg.api_base_url, "http://127.0.0.1:9000/api");
        assert_eq!(cfg.derived_pdf_url(5), "http://cdn.local/pdf/5");

        assert!(EnvironmentConfig::custom("bad", "not a url", "http://cdn.local").is_err());
    }

    #[test]
    fn test_run_params_validation() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("sample.pdf");
        std::fs::File::create(&pdf)
            .unwrap()
            .write_all(b"%PDF-1.4")
            .unwrap();

        let params = RunParams::new(949, &pdf);
        assert!(params.validate().is_ok());
        assert_eq!(params.pdf_name().unwrap(), "sample.pdf");

        let zero_org = RunParams::new(0, &pdf);
        assert!(zero_org.validate().is_err());

        let missing = RunParams::new(949, dir.path().join("missing.pdf"));
        assert!(missing.validate().is_err());
    }

    #[test]
    fn test_qr_format_names() {
        assert_eq!(QrFormat::Pdf.as_str(), "pdf");
        assert_eq!(QrFormat::Png.as_str(), "png");
        assert_eq!(QrFormat::Svg.as_str(), "svg");
        assert_eq!(QrDownloadOptions::default().size, 1024);
    }
}
