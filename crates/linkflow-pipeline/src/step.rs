use async_trait::async_trait;
use linkflow_core::config::{EnvironmentConfig, RunParams};
use linkflow_core::error::LinkflowResult;
use linkflow_engines::ApiHttpClient;

use crate::context::{ContextField, StepOutput, WorkflowContext};

/// When a step in the sequence is executed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepGate {
    Always,
    /// Only when the caller asked for the attached links to be removed again
    WhenDetachRequested,
}

impl StepGate {
    pub fn is_open(&self, params: &RunParams) -> bool {
        match self {
            StepGate::Always => true,
            StepGate::WhenDetachRequested => params.detach_links,
        }
    }
}

/// Static description of a step: what it needs and what it adds to the context
#[derive(Debug)]
pub struct StepDescriptor {
    pub name: &'static str,
    pub title: &'static str,
    pub requires: &'static [ContextField],
    pub produces: &'static [ContextField],
    pub gate: StepGate,
}

/// Read-only collaborators shared by every step of a run
pub struct StepEnv<'a> {
    pub api: &'a ApiHttpClient,
    pub params: &'a RunParams,
    pub environment: &'a EnvironmentConfig,
}

#[async_trait]
pub trait StepExecutor: Send + Sync {
    fn descriptor(&self) -> &'static StepDescriptor;

    /// Run the step against the current context.
    ///
    /// Values and records pushed into `output` are merged into the context
    /// even when the step returns an error.
    async fn execute(
        &self,
        context: &WorkflowContext,
        env: &StepEnv<'_>,
        output: &mut StepOutput,
    ) -> LinkflowResult<()>;

    fn name(&self) -> &'static str {
        self.descriptor().name
    }
}
