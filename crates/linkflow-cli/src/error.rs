use thiserror::Error;

/// Exit status for runs that failed inside the pipeline
pub const EXIT_FAILURE: i32 = 1;
/// Exit status for invalid arguments or configuration
pub const EXIT_CONFIG: i32 = 10;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("missing API token: pass --token or set UNIQODE_TOKEN")]
    MissingToken,
    #[error("missing organization id: pass --org-id or set UNIQODE_ORG_ID")]
    MissingOrgId,
    #[error("configuration error: {0}")]
    Config(String),
    #[error("validation error: {0}")]
    Validation(String),
}

/// Exit status for an error returned by [`crate::cli::run`]
pub fn exit_code(error: &anyhow::Error) -> i32 {
    if error.downcast_ref::<CliError>().is_some() {
        EXIT_CONFIG
    } else {
        EXIT_FAILURE
    }
}
