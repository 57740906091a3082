//! Predicate-gated stage wrapper
//!
//! Wraps any [`Stage`] behind a predicate over the request context. When the
//! predicate is false the wrapped stage never runs and the context is left
//! untouched; the pipeline proceeds to the next stage either way (unless the
//! wrapped stage halts).

use async_trait::async_trait;

use crate::core::RequestContext;

use super::{Stage, StageFlow};

pub struct ConditionalStage {
    predicate: Box<dyn Fn(&RequestContext) -> bool + Send + Sync>,
    inner: Box<dyn Stage>,
}

impl ConditionalStage {
    pub fn new(
        predicate: impl Fn(&RequestContext) -> bool + Send + Sync + 'static,
        inner: impl Stage + 'static,
    ) -> Self {
        Self {
            predicate: Box::new(predicate),
            inner: Box::new(inner),
        }
    }
}

#[async_trait]
impl Stage for ConditionalStage {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn apply(&self, ctx: &mut RequestContext) -> StageFlow {
        if !(self.predicate)(ctx) {
            return StageFlow::Continue;
        }
        self.inner.apply(ctx).await
    }
}
