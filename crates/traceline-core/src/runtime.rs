//! Binding execution units to threads of control.
//!
//! A concurrency model answers "what is my acting unit right now". The
//! default policy binds one lazily created unit per OS thread; other
//! policies (per task, per fiber) implement the same trait. The binding and
//! the unit's lifecycle are separable: releasing a binding does not finish
//! the unit.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::builder::SharedTraceBuilder;
use crate::error::TraceResult;
use crate::eu::ExecutionUnit;
use crate::ids::{EuId, EventReference, TraceId};
use crate::tags::TagMap;
use crate::wire::{EuType, EventStatus, EventType};

/// A handle to the calling context's execution unit.
///
/// Deliberately `!Send` (`Rc` inside): a unit belongs to exactly one thread
/// of control, and the handle cannot leave it.
#[derive(Clone)]
pub struct UnitHandle {
    inner: Rc<RefCell<ExecutionUnit>>,
}

impl UnitHandle {
    pub fn new(unit: ExecutionUnit) -> Self {
        Self {
            inner: Rc::new(RefCell::new(unit)),
        }
    }

    pub fn id(&self) -> EuId {
        self.inner.borrow().id()
    }

    pub fn trace_id(&self) -> TraceId {
        self.inner.borrow().trace_id()
    }

    pub fn trace_point(
        &self,
        trace_id: Option<TraceId>,
        event_type: EventType,
        status: EventStatus,
        causes: &[EventReference],
        tags: TagMap,
    ) -> TraceResult<EventReference> {
        self.inner
            .borrow_mut()
            .trace_point(trace_id, event_type, status, causes, tags)
    }

    pub fn peek(&self) -> EventReference {
        self.inner.borrow().peek()
    }

    pub fn get_trace_context(&self) -> EventReference {
        self.inner.borrow().get_trace_context()
    }

    pub fn add_tags(&self, tags: TagMap) -> TraceResult<()> {
        self.inner.borrow_mut().add_tags(tags)
    }

    pub fn finish(&self) -> TraceResult<()> {
        self.inner.borrow_mut().finish()
    }
}

/// Maps "current thread of control" to exactly one execution unit.
pub trait ConcurrencyModel: Send + Sync {
    /// The unit bound to the calling context, created lazily on first use.
    fn get_unit(&self) -> TraceResult<UnitHandle>;

    /// Release the calling context's binding, returning the unit handle if
    /// one was bound. Does not finish the unit; callers that want the
    /// terminal event call [`UnitHandle::finish`] on the returned handle.
    fn release(&self) -> Option<UnitHandle>;
}

static NEXT_MODEL_ID: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    /// Units bound to this thread, keyed by model instance.
    static BOUND_UNITS: RefCell<HashMap<usize, UnitHandle>> = RefCell::new(HashMap::new());
}

/// The default policy: one execution unit per OS thread, type `Thread`,
/// created on first use.
pub struct ThreadBoundModel {
    builder: SharedTraceBuilder,
    model_id: usize,
}

impl ThreadBoundModel {
    pub fn new(builder: SharedTraceBuilder) -> Self {
        Self {
            builder,
            model_id: NEXT_MODEL_ID.fetch_add(1, Ordering::Relaxed),
        }
    }
}

impl ConcurrencyModel for ThreadBoundModel {
    fn get_unit(&self) -> TraceResult<UnitHandle> {
        BOUND_UNITS.with(|bound| {
            let mut bound = bound.borrow_mut();
            if let Some(handle) = bound.get(&self.model_id) {
                return Ok(handle.clone());
            }
            let unit = ExecutionUnit::new(self.builder.clone(), EuType::Thread, TagMap::new())?;
            let handle = UnitHandle::new(unit);
            bound.insert(self.model_id, handle.clone());
            Ok(handle)
        })
    }

    fn release(&self) -> Option<UnitHandle> {
        BOUND_UNITS.with(|bound| bound.borrow_mut().remove(&self.model_id))
    }
}
