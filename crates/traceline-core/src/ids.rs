//! Identifiers for traces, execution units, and events.
//!
//! Trace ids are time-ordered UUIDs (v7) so that independent causal chains
//! sort roughly by creation time at the collector. Execution-unit ids are
//! eight random bytes, unique within a process with high probability. Event
//! ids are derived deterministically from `(sequence_number, unit_id)`, which
//! lets one unit refer to another unit's event purely by value.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::hash::fnv1a_64;

/// Identifies one trace: a causally connected set of events, potentially
/// spanning multiple execution units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TraceId(Uuid);

impl TraceId {
    /// Mint a fresh, time-ordered trace id.
    pub fn mint() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Big-endian byte representation, as carried on the wire.
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// Identifies one execution unit: a logical thread of control producing its
/// own ordered event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EuId([u8; 8]);

impl EuId {
    /// Eight random bytes; process-unique with high probability.
    pub fn random() -> Self {
        Self(rand::random::<u64>().to_le_bytes())
    }

    pub fn from_bytes(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }
}

impl fmt::Display for EuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Identifies one event, derived from its sequence number and the producing
/// unit's id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId([u8; 8]);

impl EventId {
    /// Derive the id of the event with `sequence_number` on unit `eu_id`.
    ///
    /// FNV-1a 64 over the little-endian sequence number followed by the raw
    /// unit id bytes. Deterministic, so a reference to a future event can be
    /// computed before the event exists.
    pub fn derive(sequence_number: u64, eu_id: EuId) -> Self {
        let mut input = [0u8; 16];
        input[..8].copy_from_slice(&sequence_number.to_le_bytes());
        input[8..].copy_from_slice(eu_id.as_bytes());
        Self(fnv1a_64(&input).to_le_bytes())
    }

    pub fn from_bytes(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// A reference to one event: the trace context.
///
/// Immutable value identifying `(trace_id, event_id)` plus, when known, the
/// unit that produced the event. References extracted from a propagation
/// carrier have no unit id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventReference {
    pub trace_id: TraceId,
    pub event_id: EventId,
    pub unit_id: Option<EuId>,
}

impl EventReference {
    pub fn new(trace_id: TraceId, event_id: EventId, unit_id: Option<EuId>) -> Self {
        Self {
            trace_id,
            event_id,
            unit_id,
        }
    }
}
