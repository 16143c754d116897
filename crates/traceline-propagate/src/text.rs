//! Textual key/value propagation form.
//!
//! Intended for header-based transports that carry string maps. The only
//! form that carries baggage: entries under the `traceline-baggage-` prefix
//! travel with the context. Header lookup is case-insensitive on extract.

use std::collections::HashMap;

use uuid::Uuid;

use traceline_core::{EventId, EventReference};

use crate::{check_trace_id, Baggage, PropagationError};

pub const FIELD_TRACE_ID: &str = "traceline-tracer-traceid";
pub const FIELD_EVENT_ID: &str = "traceline-tracer-eventid";
pub const FIELD_SAMPLED: &str = "traceline-tracer-sampled";
pub const PREFIX_BAGGAGE: &str = "traceline-baggage-";

const FIELD_COUNT: usize = 3;

/// Write `reference` and `baggage` into the string map `carrier`.
pub fn inject(
    reference: &EventReference,
    baggage: &Baggage,
    carrier: &mut HashMap<String, String>,
) {
    carrier.insert(
        FIELD_TRACE_ID.to_string(),
        reference.trace_id.as_uuid().simple().to_string(),
    );
    carrier.insert(
        FIELD_EVENT_ID.to_string(),
        hex::encode(reference.event_id.as_bytes()),
    );
    carrier.insert(FIELD_SAMPLED.to_string(), "true".to_string());
    for (key, value) in &baggage.0 {
        carrier.insert(format!("{PREFIX_BAGGAGE}{key}"), value.clone());
    }
}

/// Parse a context and its baggage from the string map `carrier`.
///
/// All three tracer fields must be present exactly once; a wrong field
/// count means a truncated or tampered context.
pub fn extract(
    carrier: &HashMap<String, String>,
) -> Result<(EventReference, Baggage), PropagationError> {
    let mut count = 0;
    let mut trace_id = None;
    let mut event_id = None;
    let mut baggage = Baggage::default();

    for (key, value) in carrier {
        let key = key.to_ascii_lowercase();
        if key == FIELD_TRACE_ID {
            let uuid = Uuid::try_parse(value)
                .map_err(|_| PropagationError::ContextCorrupted("unparseable trace id"))?;
            trace_id = Some(check_trace_id(uuid)?);
            count += 1;
        } else if key == FIELD_EVENT_ID {
            let bytes: [u8; 8] = hex::decode(value)
                .ok()
                .and_then(|b| b.try_into().ok())
                .ok_or(PropagationError::ContextCorrupted("unparseable event id"))?;
            event_id = Some(EventId::from_bytes(bytes));
            count += 1;
        } else if key == FIELD_SAMPLED {
            match value.as_str() {
                "true" | "1" | "false" | "0" => {}
                _ => {
                    return Err(PropagationError::ContextCorrupted(
                        "unparseable sampled flag",
                    ))
                }
            }
            count += 1;
        } else if let Some(name) = key.strip_prefix(PREFIX_BAGGAGE) {
            baggage.0.insert(name.to_string(), value.clone());
        }
    }

    if count == 0 {
        return Err(PropagationError::UnsupportedCarrier);
    }
    if count != FIELD_COUNT {
        return Err(PropagationError::ContextCorrupted("wrong field count"));
    }

    let trace_id = trace_id.ok_or(PropagationError::ContextCorrupted("missing trace id"))?;
    let event_id = event_id.ok_or(PropagationError::ContextCorrupted("missing event id"))?;
    Ok((EventReference::new(trace_id, event_id, None), baggage))
}
