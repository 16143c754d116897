//! Compact fixed-length binary propagation form.
//!
//! Layout (26 bytes): version byte (0x00), 16-byte trace id, 8-byte event
//! id, flags byte (0x01 = sampled). No baggage.

use uuid::Uuid;

use traceline_core::{EventId, EventReference};

use crate::{check_trace_id, PropagationError};

pub const BINARY_LENGTH: usize = 26;

const VERSION: u8 = 0x00;
const FLAG_SAMPLED: u8 = 0x01;

/// Append the binary form of `reference` to `carrier`.
pub fn inject(reference: &EventReference, carrier: &mut Vec<u8>) {
    carrier.reserve(BINARY_LENGTH);
    carrier.push(VERSION);
    carrier.extend_from_slice(reference.trace_id.as_bytes());
    carrier.extend_from_slice(reference.event_id.as_bytes());
    carrier.push(FLAG_SAMPLED);
}

/// Parse the binary form from `carrier`.
pub fn extract(carrier: &[u8]) -> Result<EventReference, PropagationError> {
    if carrier.len() < BINARY_LENGTH {
        return Err(PropagationError::ContextCorrupted("carrier too short"));
    }

    let version = carrier[0];
    if version == 0xff {
        return Err(PropagationError::ContextCorrupted("invalid version byte"));
    }

    let mut trace_bytes = [0u8; 16];
    trace_bytes.copy_from_slice(&carrier[1..17]);
    let trace_id = check_trace_id(Uuid::from_bytes(trace_bytes))?;

    let mut event_bytes = [0u8; 8];
    event_bytes.copy_from_slice(&carrier[17..25]);

    Ok(EventReference::new(
        trace_id,
        EventId::from_bytes(event_bytes),
        None,
    ))
}
