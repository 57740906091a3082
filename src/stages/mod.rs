//! Pipeline stages
//!
//! A [`Stage`] inspects and rewrites one request's [`RequestContext`] and
//! either lets processing continue or halts it with a typed error. Stages run
//! strictly in order within a request; after a halt no later stage runs. The
//! runner is the single place a halt becomes an error, which is what keeps
//! the one-response-per-request invariant enforceable at the transport edge.

pub mod attachment;
pub mod composite;
pub mod conditional;
pub mod response;
pub mod validation;

pub use attachment::AttachmentConstraintStage;
pub use composite::{CompositeValidationStage, ValidationRule};
pub use conditional::ConditionalStage;
pub use response::{BufferSink, GuardedSink, ResponseSink, ResponseValidationStage};
pub use validation::ValidationStage;

use async_trait::async_trait;

use crate::core::{PipelineError, RequestContext};

/// Outcome of applying one stage.
#[derive(Debug)]
pub enum StageFlow {
    /// Proceed to the next stage
    Continue,
    /// Stop the pipeline; the error becomes the response
    Halt(PipelineError),
}

impl StageFlow {
    pub fn is_continue(&self) -> bool {
        matches!(self, StageFlow::Continue)
    }
}

/// One step of the request pipeline.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Short name used in diagnostics.
    fn name(&self) -> &str;

    async fn apply(&self, ctx: &mut RequestContext) -> StageFlow;
}

/// Ordered, fail-fast sequence of stages.
#[derive(Default)]
pub struct StagePipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl StagePipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage; stages run in the order they were added.
    pub fn stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Apply the stages in order, stopping at the first halt.
    pub async fn run(&self, ctx: &mut RequestContext) -> Result<(), PipelineError> {
        for stage in &self.stages {
            match stage.apply(ctx).await {
                StageFlow::Continue => {}
                StageFlow::Halt(err) => return Err(err),
            }
        }
        Ok(())
    }
}
