use clap::{ArgAction, Parser, ValueHint};
use linkflow_core::config::{Environment, HttpSettings, QrDownloadOptions, QrFormat, RunParams};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::CliError;

#[derive(Parser, Debug)]
#[command(
    name = "linkflow",
    version,
    about = "Create a linkpage, a dynamic QR code pointing at it, and attach an uploaded PDF"
)]
pub struct LinkflowArgs {
    #[arg(long, env = "UNIQODE_TOKEN", hide_env_values = true, help = "API token")]
    pub token: Option<String>,

    #[arg(long = "org-id", env = "UNIQODE_ORG_ID", help = "Organization id")]
    pub org_id: Option<u64>,

    #[arg(
        long = "env",
        env = "UNIQODE_ENV",
        value_enum,
        ignore_case = true,
        default_value_t = Environment::Qa,
        help = "Deployment target"
    )]
    pub environment: Environment,

    #[arg(
        long = "pdf-path",
        value_name = "FILE",
        value_hint = ValueHint::FilePath,
        help = "PDF to upload and attach"
    )]
    pub pdf_path: PathBuf,

    #[arg(long = "linkpage-name", default_value = "Hersheys TLC 101")]
    pub linkpage_name: String,

    #[arg(long = "qr-name", default_value = "QR: Hersheys 10001")]
    pub qr_name: String,

    #[arg(long = "media-folder", help = "Media folder id for the uploaded PDF")]
    pub media_folder: Option<u64>,

    #[arg(
        long = "delete-after",
        action = ArgAction::SetTrue,
        help = "Remove the attached links from the linkpage at the end of the run"
    )]
    pub delete_after: bool,

    #[arg(
        long = "output-dir",
        value_name = "DIR",
        value_hint = ValueHint::DirPath,
        default_value = ".",
        help = "Where the QR asset and flow_results.json are written"
    )]
    pub output_dir: PathBuf,

    #[arg(long = "qr-size", default_value_t = 1024)]
    pub qr_size: u32,

    #[arg(long = "qr-error-correction", default_value_t = 2, value_parser = clap::value_parser!(u8).range(0..=3))]
    pub qr_error_correction: u8,

    #[arg(long = "qr-format", value_enum, default_value_t = QrFormat::Pdf)]
    pub qr_format: QrFormat,

    #[arg(long = "timeout-secs", default_value_t = 60, help = "Per-request timeout")]
    pub timeout_secs: u64,

    #[arg(short, long, action = ArgAction::SetTrue, help = "Enable debug logging")]
    pub verbose: bool,
}

impl LinkflowArgs {
    pub fn token(&self) -> Result<&str, CliError> {
        self.token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(CliError::MissingToken)
    }

    pub fn run_params(&self) -> Result<RunParams, CliError> {
        let org_id = self.org_id.ok_or(CliError::MissingOrgId)?;
        if self.timeout_secs == 0 {
            return Err(CliError::Validation(
                "--timeout-secs must be greater than zero".to_string(),
            ));
        }

        let mut params = RunParams::new(org_id, &self.pdf_path);
        params.linkpage_name = self.linkpage_name.clone();
        params.qr_name = self.qr_name.clone();
        params.media_folder = self.media_folder;
        params.output_dir = self.output_dir.clone();
        params.detach_links = self.delete_after;
        params.qr_download = QrDownloadOptions {
            size: self.qr_size,
            error_correction: self.qr_error_correction,
            format: self.qr_format,
        };

        params
            .validate()
            .map_err(|e| CliError::Validation(e.to_string()))?;
        Ok(params)
    }

    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }

    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(extra: &[&str]) -> LinkflowArgs {
        let mut argv = vec!["linkflow", "--token", "abcdef123456", "--pdf-path", "/tmp/doc.pdf"];
        argv.extend_from_slice(extra);
        LinkflowArgs::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_follow_the_documented_values() {
        let args = parse(&["--env", "qa"]);
        assert_eq!(args.environment, Environment::Qa);
        assert_eq!(args.linkpage_name, "Hersheys TLC 101");
        assert_eq!(args.qr_name, "QR: Hersheys 10001");
        assert_eq!(args.qr_size, 1024);
        assert_eq!(args.qr_error_correction, 2);
        assert_eq!(args.qr_format, QrFormat::Pdf);
        assert_eq!(args.output_dir, PathBuf::from("."));
        assert!(!args.delete_after);
        assert_eq!(args.http_settings().timeout, Duration::from_secs(60));
        assert_eq!(args.log_filter(), "info");
    }

    #[test]
    fn parses_overrides() {
        let args = parse(&[
            "--env",
            "prod",
            "--qr-format",
            "svg",
            "--qr-size",
            "512",
            "--media-folder",
            "12",
            "--delete-after",
            "-v",
        ]);
        assert_eq!(args.environment, Environment::Prod);
        assert_eq!(args.qr_format, QrFormat::Svg);
        assert_eq!(args.qr_size, 512);
        assert_eq!(args.media_folder, Some(12));
        assert!(args.delete_after);
        assert_eq!(args.log_filter(), "debug");
    }

    #[test]
    fn environment_name_is_case_insensitive() {
        assert_eq!(parse(&["--env", "QA"]).environment, Environment::Qa);
        assert_eq!(parse(&["--env", "Prod"]).environment, Environment::Prod);
    }

    #[test]
    fn rejects_unknown_environment_and_correction_level() {
        let argv = ["linkflow", "--pdf-path", "/tmp/doc.pdf", "--env", "staging"];
        assert!(LinkflowArgs::try_parse_from(argv).is_err());

        let argv = ["linkflow", "--pdf-path", "/tmp/doc.pdf", "--qr-error-correction", "7"];
        assert!(LinkflowArgs::try_parse_from(argv).is_err());
    }

    #[test]
    fn run_params_carry_every_option() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("brochure.pdf");
        std::fs::File::create(&pdf)
            .unwrap()
            .write_all(b"%PDF-1.4")
            .unwrap();

        let pdf_arg = pdf.to_string_lossy().to_string();
        let args = LinkflowArgs::try_parse_from([
            "linkflow",
            "--token",
            "abcdef123456",
            "--org-id",
            "949",
            "--pdf-path",
            pdf_arg.as_str(),
            "--qr-format",
            "png",
            "--delete-after",
        ])
        .unwrap();

        let params = args.run_params().unwrap();
        assert_eq!(params.org_id, 949);
        assert_eq!(params.pdf_name().unwrap(), "brochure.pdf");
        assert_eq!(params.qr_download.format, QrFormat::Png);
        assert!(params.detach_links);
    }

    #[test]
    fn blank_token_is_missing() {
        let args = parse(&[]);
        assert_eq!(args.token().unwrap(), "abcdef123456");

        let mut args = parse(&[]);
        args.token = Some("   ".to_string());
        assert!(matches!(args.token(), Err(CliError::MissingToken)));
    }

    #[test]
    fn missing_pdf_is_a_validation_error() {
        let mut args = parse(&[]);
        args.org_id = Some(949);
        args.pdf_path = PathBuf::from("/definitely/not/here.pdf");
        assert!(matches!(args.run_params(), Err(CliError::Validation(_))));
    }
}
