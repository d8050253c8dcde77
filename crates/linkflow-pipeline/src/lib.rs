//! The provisioning workflow: a sequence of step executors run by the
//! [`Orchestrator`] over a set-once [`WorkflowContext`], with the results
//! handed to a [`ResultSink`].
pub mod context;
pub mod orchestrator;
pub mod results;
pub mod step;
pub mod steps;

pub use context::{ContextField, ContextValue, StepOutput, WorkflowContext};
pub use orchestrator::{Orchestrator, PipelineFailure, RunOutcome, RunState};
pub use results::{JsonFileSink, MemorySink, ResultSink, RESULTS_FILE_NAME};
pub use step::{StepDescriptor, StepEnv, StepExecutor, StepGate};
pub use steps::standard_steps;
