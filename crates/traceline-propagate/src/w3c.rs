//! W3C trace-context compatible propagation form.
//!
//! Only the `traceparent` header is implemented:
//! `00-<32 hex trace id>-<16 hex event id>-01`. Trace state (and therefore
//! baggage) is not carried in this form.

use std::collections::HashMap;

use uuid::Uuid;

use traceline_core::{EventId, EventReference};

use crate::{check_trace_id, PropagationError};

pub const TRACEPARENT_HEADER: &str = "traceparent";

const FIELD_SEPARATOR: char = '-';

/// Write the `traceparent` header for `reference` into `carrier`.
pub fn inject(reference: &EventReference, carrier: &mut HashMap<String, String>) {
    let value = format!(
        "00-{}-{}-01",
        reference.trace_id.as_uuid().simple(),
        hex::encode(reference.event_id.as_bytes()),
    );
    carrier.insert(TRACEPARENT_HEADER.to_string(), value);
}

/// Parse the `traceparent` header from `carrier`.
pub fn extract(carrier: &HashMap<String, String>) -> Result<EventReference, PropagationError> {
    let header = carrier
        .get(TRACEPARENT_HEADER)
        .ok_or(PropagationError::UnsupportedCarrier)?;

    let fields: Vec<&str> = header.split(FIELD_SEPARATOR).collect();
    let (version_str, trace_id_str, event_id_str, flags_str) = match fields.as_slice() {
        [version, trace_id, event_id, flags] => (*version, *trace_id, *event_id, *flags),
        _ => return Err(PropagationError::ContextCorrupted("wrong field count")),
    };

    let version = u8::from_str_radix(version_str, 16)
        .map_err(|_| PropagationError::ContextCorrupted("unparseable version"))?;
    if version_str.len() != 2 || version == 0xff {
        return Err(PropagationError::ContextCorrupted("invalid version"));
    }

    let uuid = Uuid::try_parse(trace_id_str)
        .map_err(|_| PropagationError::ContextCorrupted("unparseable trace id"))?;
    let trace_id = check_trace_id(uuid)?;

    let event_bytes: [u8; 8] = hex::decode(event_id_str)
        .ok()
        .and_then(|b| b.try_into().ok())
        .ok_or(PropagationError::ContextCorrupted("unparseable event id"))?;

    u8::from_str_radix(flags_str, 16)
        .map_err(|_| PropagationError::ContextCorrupted("unparseable flags"))?;

    Ok(EventReference::new(
        trace_id,
        EventId::from_bytes(event_bytes),
        None,
    ))
}
