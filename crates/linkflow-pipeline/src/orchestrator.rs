use linkflow_core::config::{EnvironmentConfig, RunParams};
use linkflow_core::error::LinkflowError;
use linkflow_engines::ApiHttpClient;
use log::{debug, error, info, warn};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::context::{StepOutput, WorkflowContext};
use crate::results::ResultSink;
use crate::step::{StepEnv, StepExecutor};
use crate::steps::standard_steps;

/// Label used when only persisting the results failed
pub const PERSIST_RESULTS: &str = "persist-results";

/// Where a run is in the step sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    Running { step: &'static str },
    Completed,
    Failed { step: &'static str },
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::NotStarted => write!(f, "not started"),
            RunState::Running { step } => write!(f, "running [{}]", step),
            RunState::Completed => write!(f, "completed"),
            RunState::Failed { step } => write!(f, "failed at [{}]", step),
        }
    }
}

#[derive(Debug, Error)]
#[error("pipeline failed at step [{step}]: {source}")]
pub struct PipelineFailure {
    pub step: String,
    pub source: LinkflowError,
}

/// Terminal state of a run together with everything it accumulated
#[derive(Debug)]
pub struct RunOutcome {
    pub state: RunState,
    pub context: WorkflowContext,
    pub error: Option<PipelineFailure>,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> Result<WorkflowContext, PipelineFailure> {
        match self.error {
            Some(failure) => Err(failure),
            None => Ok(self.context),
        }
    }
}

/// Runs the provisioning steps in order against one environment.
///
/// The sequence stops at the first failing step. Whether the run completes
/// or fails, the accumulated records are handed to the result sink once.
pub struct Orchestrator {
    api: ApiHttpClient,
    environment: EnvironmentConfig,
    params: RunParams,
    steps: Vec<Box<dyn StepExecutor>>,
    sink: Option<Arc<dyn ResultSink>>,
}

impl Orchestrator {
    pub fn new(api: ApiHttpClient, environment: EnvironmentConfig, params: RunParams) -> Self {
        Self::with_steps(api, environment, params, standard_steps())
    }

    pub fn with_steps(
        api: ApiHttpClient,
        environment: EnvironmentConfig,
        params: RunParams,
        steps: Vec<Box<dyn StepExecutor>>,
    ) -> Self {
        Self {
            api,
            environment,
            params,
            steps,
            sink: None,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn ResultSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|step| step.name()).collect()
    }

    pub fn params(&self) -> &RunParams {
        &self.params
    }

    pub async fn run(&self) -> RunOutcome {
        let env = StepEnv {
            api: &self.api,
            params: &self.params,
            environment: &self.environment,
        };
        let mut context = WorkflowContext::new();
        let mut state = RunState::NotStarted;
        let mut failure = None;

        info!(
            "Starting run against '{}' ({}) for organization {}",
            self.environment.name, self.environment.api_base_url, self.params.org_id
        );

        let total = self.steps.len();
        for (index, step) in self.steps.iter().enumerate() {
            let descriptor = step.descriptor();
            if !descriptor.gate.is_open(&self.params) {
                debug!("Step [{}] not requested, skipping", descriptor.name);
                continue;
            }

            transition(&mut state, RunState::Running { step: descriptor.name });
            info!("{}", "=".repeat(60));
            info!("STEP {}/{} - {}", index + 1, total, descriptor.title);
            info!("{}", "=".repeat(60));

            if let Err(e) = Self::execute_step(step.as_ref(), &mut context, &env).await {
                error!("Step [{}] failed: {}", descriptor.name, e);
                transition(&mut state, RunState::Failed { step: descriptor.name });
                failure = Some(PipelineFailure {
                    step: descriptor.name.to_string(),
                    source: e,
                });
                break;
            }
            info!("Step [{}] completed successfully", descriptor.name);
        }

        if failure.is_none() {
            transition(&mut state, RunState::Completed);
            Self::log_summary(&context);
        }

        if let Err(e) = self.persist(&context).await {
            error!("Failed to persist results: {}", e);
            if failure.is_none() {
                transition(&mut state, RunState::Failed { step: PERSIST_RESULTS });
                failure = Some(PipelineFailure {
                    step: PERSIST_RESULTS.to_string(),
                    source: e,
                });
            }
        }

        RunOutcome {
            state,
            context,
            error: failure,
        }
    }

    async fn execute_step(
        step: &dyn StepExecutor,
        context: &mut WorkflowContext,
        env: &StepEnv<'_>,
    ) -> Result<(), LinkflowError> {
        let descriptor = step.descriptor();
        for field in descriptor.requires {
            if !context.has(*field) {
                return Err(LinkflowError::MissingInput {
                    step: descriptor.name.to_string(),
                    field: field.to_string(),
                });
            }
        }

        let mut output = StepOutput::new();
        let result = step.execute(context, env, &mut output).await;
        if let Err(e) = result {
            if !output.is_empty() {
                debug!(
                    "Keeping {} record(s) and dropping {} value(s) of failed step [{}]",
                    output.records.len(),
                    output.values.len(),
                    descriptor.name
                );
            }
            if let Err(conflict) = context.merge_records(output) {
                warn!("Could not keep records of [{}]: {}", descriptor.name, conflict);
            }
            return Err(e);
        }
        context.merge(output)?;

        for field in descriptor.produces {
            if !context.has(*field) {
                return Err(LinkflowError::invalid_response(
                    descriptor.name,
                    format!("step did not produce '{}'", field),
                ));
            }
        }
        Ok(())
    }

    async fn persist(&self, context: &WorkflowContext) -> Result<(), LinkflowError> {
        match &self.sink {
            Some(sink) => sink.persist(&context.results()).await,
            None => {
                warn!("No result sink configured, results are not persisted");
                Ok(())
            }
        }
    }

    fn log_summary(context: &WorkflowContext) {
        info!("{}", "=".repeat(60));
        info!("WORKFLOW COMPLETED SUCCESSFULLY");
        info!("{}", "=".repeat(60));
        if let Some(id) = context.linkpage_id() {
            info!("  Linkpage ID : {}", id);
        }
        if let Some(url) = context.linkpage_url() {
            info!("  Linkpage URL: {}", url);
        }
        if let Some(id) = context.qr_code_id() {
            info!("  QR Code ID  : {}", id);
        }
        if let Some(path) = context.qr_asset_path() {
            info!("  QR Image    : {}", path.display());
        }
        if let Some(id) = context.media_id() {
            info!("  Media ID    : {}", id);
        }
        if let Some(url) = context.derived_pdf_url() {
            info!("  PDF URL     : {}", url);
        }
    }
}

fn transition(state: &mut RunState, next: RunState) {
    debug!("Run state: {} -> {}", state, next);
    *state = next;
}
