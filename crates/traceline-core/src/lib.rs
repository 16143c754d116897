//! Traceline core - causality-aware tracing instrumentation
//!
//! The producer side of a distributed-tracing system: execution units record
//! ordered events, link them across unit and process boundaries through
//! explicit causal references, and the trace builder serializes the result
//! into compact PDUs for a trace collector.
//!
//! - **Execution units** ([`ExecutionUnit`]): per-unit event sequencing
//! - **Trace builder** ([`TraceBuilder`], [`SimpleTraceBuilder`]): turns unit
//!   calls into wire-ready PDUs
//! - **String table** ([`strings::StringTable`]): name interning with
//!   detectable collisions
//! - **Concurrency model** ([`ConcurrencyModel`]): binds units to threads of
//!   control
//! - **Reporter** ([`Reporter`]): the delivery seam; implementations live
//!   with the embedder or in `traceline-export`
//!
//! Sampling, network I/O, batching, and aggregation are collector or
//! reporter concerns, not this crate's.

pub mod builder;
pub mod error;
pub mod eu;
pub mod hash;
pub mod ids;
pub mod reporter;
pub mod runtime;
pub mod strings;
pub mod tags;
pub mod tracer;
pub mod wire;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use builder::{SharedTraceBuilder, SimpleTraceBuilder, TraceBuilder};
pub use error::{HashCollision, TraceError, TraceResult};
pub use eu::ExecutionUnit;
pub use ids::{EuId, EventId, EventReference, TraceId};
pub use reporter::Reporter;
pub use runtime::{ConcurrencyModel, ThreadBoundModel, UnitHandle};
pub use tags::{TagMap, TagValue};
pub use tracer::{Tracer, TracerBuilder};
pub use wire::{EuType, EventStatus, EventType, TracingData, TracingDataHeader};
