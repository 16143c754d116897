//! Error types.
//!
//! Precondition violations indicate an inconsistent instrumentation call
//! sequence. They are surfaced loudly as typed errors and must not be
//! swallowed; continuing after one would corrupt the event stream.

use thiserror::Error;

use crate::ids::{EuId, EventId, TraceId};

pub type TraceResult<T> = Result<T, TraceError>;

#[derive(Error, Debug)]
pub enum TraceError {
    #[error("execution unit {0} is already registered")]
    EuAlreadyRegistered(EuId),

    #[error("execution unit {0} is not registered")]
    UnknownEu(EuId),

    #[error("a trace is already open on execution unit {0}")]
    TraceAlreadyOpen(EuId),

    #[error("no trace is open on execution unit {0}")]
    NoOpenTrace(EuId),

    #[error("closing trace {closing} on execution unit {eu}, but trace {open} is open")]
    TraceIdMismatch {
        eu: EuId,
        open: TraceId,
        closing: TraceId,
    },

    #[error("a trace is still open on execution unit {0}; finish it before unregistering")]
    TraceStillOpen(EuId),

    #[error("no event to attach tags to on execution unit {0}")]
    NoPendingEvent(EuId),

    #[error("tags target event {target} on execution unit {eu}, but the most recent event is {latest}")]
    StaleTagTarget {
        eu: EuId,
        target: EventId,
        latest: EventId,
    },

    #[error("execution unit {0} was finished and can no longer record events")]
    EuFinished(EuId),
}

/// Two distinct strings hashed to the same 32-bit alias.
///
/// Expected to be rare but not a bug: the caller falls back to transmitting
/// the literal string inline instead of an alias for the affected tag.
#[derive(Error, Debug)]
#[error("alias {alias} of new string {new:?} collides with existing string {existing:?}")]
pub struct HashCollision {
    pub alias: u32,
    pub new: String,
    pub existing: String,
}
