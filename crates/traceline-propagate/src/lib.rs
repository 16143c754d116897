//! Trace-context propagation codecs.
//!
//! Three interchange forms for an [`EventReference`]:
//!
//! - [`binary`]: compact fixed-length binary form (version byte, 16-byte
//!   trace id, 8-byte event id, flags byte)
//! - [`text`]: key/value form for header-based transports; the only form
//!   that carries baggage
//! - [`w3c`]: W3C trace-context compatible `traceparent` dashed hex form
//!
//! All three round-trip the reference losslessly; the originating unit id is
//! not propagated. Extraction distinguishes a carrier that does not speak
//! the format at all ([`PropagationError::UnsupportedCarrier`]) from a
//! tampered or truncated context ([`PropagationError::ContextCorrupted`]).

pub mod binary;
pub mod text;
pub mod w3c;

use std::collections::HashMap;

use thiserror::Error;
use uuid::Uuid;

pub use traceline_core::{EventReference, TraceId};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PropagationError {
    /// The carrier does not contain this propagation format at all.
    #[error("carrier does not contain a trace context in this format")]
    UnsupportedCarrier,

    /// The carrier speaks the format but the context is malformed.
    #[error("trace context corrupted: {0}")]
    ContextCorrupted(&'static str),
}

/// An extracted trace context: the event reference plus any baggage the
/// carrier format supports.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Baggage(pub HashMap<String, String>);

/// Validate a trace id parsed from a carrier.
///
/// Trace ids minted by this library are RFC 4122 time-ordered UUIDs
/// (version 7; version 1 accepted for ids minted by older producers).
/// Anything else indicates a truncated or tampered context.
fn check_trace_id(uuid: Uuid) -> Result<TraceId, PropagationError> {
    if uuid.get_variant() != uuid::Variant::RFC4122 {
        return Err(PropagationError::ContextCorrupted("invalid trace id variant"));
    }
    if !matches!(uuid.get_version_num(), 1 | 7) {
        return Err(PropagationError::ContextCorrupted("invalid trace id version"));
    }
    Ok(TraceId::from_uuid(uuid))
}
