//! The top-level tracer object.
//!
//! Owns the shared trace builder and the concurrency model, and delegates
//! instrumentation calls to the calling context's execution unit. There is
//! no ambient global instance: embedders construct a `Tracer` explicitly and
//! pass it by reference, which makes initialization and shutdown visible.

use crate::builder::{SharedTraceBuilder, SimpleTraceBuilder};
use crate::error::TraceResult;
use crate::ids::{EventReference, TraceId};
use crate::reporter::Reporter;
use crate::runtime::{ConcurrencyModel, ThreadBoundModel, UnitHandle};
use crate::tags::TagMap;
use crate::wire::{EventStatus, EventType};

pub struct Tracer {
    builder: SharedTraceBuilder,
    model: Box<dyn ConcurrencyModel>,
}

impl Tracer {
    /// A tracer with the default builder and one-unit-per-thread policy.
    pub fn new(reporter: Box<dyn Reporter>) -> Self {
        Self::builder(reporter).build()
    }

    pub fn builder(reporter: Box<dyn Reporter>) -> TracerBuilder {
        TracerBuilder {
            reporter,
            model_factory: None,
        }
    }

    /// The shared trace builder, for constructing execution units directly
    /// instead of going through the concurrency model.
    pub fn trace_builder(&self) -> SharedTraceBuilder {
        self.builder.clone()
    }

    /// The calling context's execution unit, created lazily.
    pub fn unit(&self) -> TraceResult<UnitHandle> {
        self.model.get_unit()
    }

    pub fn trace_point(
        &self,
        trace_id: Option<TraceId>,
        event_type: EventType,
        status: EventStatus,
        causes: &[EventReference],
        tags: TagMap,
    ) -> TraceResult<EventReference> {
        self.unit()?
            .trace_point(trace_id, event_type, status, causes, tags)
    }

    pub fn peek(&self) -> TraceResult<EventReference> {
        Ok(self.unit()?.peek())
    }

    pub fn get_trace_context(&self) -> TraceResult<EventReference> {
        Ok(self.unit()?.get_trace_context())
    }

    pub fn add_tags(&self, tags: TagMap) -> TraceResult<()> {
        self.unit()?.add_tags(tags)
    }

    /// Finish the calling context's unit, if one is bound, and release the
    /// binding.
    pub fn finish_unit(&self) -> TraceResult<()> {
        if let Some(handle) = self.model.release() {
            handle.finish()?;
        }
        Ok(())
    }
}

pub struct TracerBuilder {
    reporter: Box<dyn Reporter>,
    model_factory: Option<Box<dyn FnOnce(SharedTraceBuilder) -> Box<dyn ConcurrencyModel>>>,
}

impl TracerBuilder {
    /// Replace the default one-unit-per-thread policy.
    pub fn with_concurrency_model(
        mut self,
        factory: impl FnOnce(SharedTraceBuilder) -> Box<dyn ConcurrencyModel> + 'static,
    ) -> Self {
        self.model_factory = Some(Box::new(factory));
        self
    }

    pub fn build(self) -> Tracer {
        let builder = SimpleTraceBuilder::shared(self.reporter);
        let model = match self.model_factory {
            Some(factory) => factory(builder.clone()),
            None => Box::new(ThreadBoundModel::new(builder.clone())),
        };
        Tracer { builder, model }
    }
}
