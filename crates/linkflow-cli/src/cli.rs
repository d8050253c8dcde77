use anyhow::Result;
use clap::Parser;
use linkflow_core::auth::AuthManager;
use linkflow_engines::ApiHttpClient;
use linkflow_pipeline::{JsonFileSink, Orchestrator};
use log::{debug, info};
use std::sync::Arc;

use crate::args::LinkflowArgs;
use crate::error::CliError;

pub async fn run() -> Result<()> {
    let args = LinkflowArgs::parse();
    init_logging(args.log_filter());
    execute(args).await
}

/// `RUST_LOG` wins over the filter derived from `--verbose`
pub fn init_logging(default_filter: &str) {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_secs()
        .try_init();
}

pub async fn execute(args: LinkflowArgs) -> Result<()> {
    let token = args.token()?;
    let params = args.run_params()?;
    let environment = args.environment.config();
    debug!(
        "Environment '{}': api={} pdf={}",
        environment.name, environment.api_base_url, environment.pdf_base_url
    );

    let auth = AuthManager::api_token(token).map_err(|e| CliError::Config(e.to_string()))?;
    let api = ApiHttpClient::new(&auth, &environment, params.org_id, args.http_settings())?;

    let sink = Arc::new(JsonFileSink::new(&params.output_dir));
    let orchestrator = Orchestrator::new(api, environment, params).with_sink(sink.clone());

    let outcome = orchestrator.run().await;
    info!("Run {}", outcome.state);
    outcome.into_result()?;
    info!("Results written to {}", sink.path().display());
    Ok(())
}
