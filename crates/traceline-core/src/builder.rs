//! The trace builder: stateful translator from unit-level calls to wire
//! PDUs.
//!
//! One builder instance is shared by every execution unit in the process and
//! is the single synchronization bottleneck (callers wrap it in a mutex, see
//! [`SharedTraceBuilder`]). It owns the string table and all per-unit
//! buffering state, and decides when to flush fragments and when to
//! broadcast string-table updates.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{TraceError, TraceResult};
use crate::ids::{EuId, EventId, EventReference, TraceId};
use crate::reporter::Reporter;
use crate::strings::StringTable;
use crate::tags::{TagMap, TagValue};
use crate::wire::{
    BroadcastData, CausingEvent, EuType, EventPdu, EventStatus, EventType, ExecutionUnitPdu,
    RoutedData, TagKey, TagPdu, TagValueWire, TraceFragment, TracingData, WireDuration,
    WireTimestamp,
};

/// Translates execution-unit calls into PDUs.
///
/// All methods are preconditions-checked: events can only be added to
/// registered units with an open trace, and trace ids must match on close.
pub trait TraceBuilder: Send {
    /// Register a unit. Events can only be added to registered units.
    fn start_eu(&mut self, eu_id: EuId, eu_type: EuType, tags: &TagMap) -> TraceResult<()>;

    /// Unregister a unit; its trace must already be finished.
    fn finish_eu(&mut self, eu_id: EuId) -> TraceResult<()>;

    /// Open a new trace fragment on the unit and capture its reference time.
    fn start_trace(&mut self, eu_id: EuId, trace_id: TraceId) -> TraceResult<()>;

    /// Append an event to the unit's open fragment.
    fn add_event(
        &mut self,
        eu_id: EuId,
        trace_id: TraceId,
        sequence_number: u64,
        event_type: EventType,
        status: EventStatus,
        causes: &[EventReference],
    ) -> TraceResult<()>;

    /// Attach tags to the unit's most recent event. `target` must be that
    /// event's id; anything else means the caller lost track of sequencing.
    fn add_tags(&mut self, eu_id: EuId, target: EventId, tags: &TagMap) -> TraceResult<()>;

    /// Close the open fragment and hand the resulting PDUs to the reporter.
    fn finish_trace(&mut self, eu_id: EuId, trace_id: TraceId) -> TraceResult<()>;
}

/// The shared, process-wide builder handle held by every unit.
pub type SharedTraceBuilder = Arc<Mutex<dyn TraceBuilder>>;

/// Per-unit state owned by the builder.
struct EuState {
    /// The unit's accumulated self-descriptor (type + tags), re-sent with
    /// every finished fragment.
    descriptor: ExecutionUnitPdu,
    /// The in-progress fragment, if a trace is open on this unit.
    fragment: Option<OpenFragment>,
    /// Last transmitted value per tag key, for redundancy suppression.
    last_tag_values: HashMap<String, TagValue>,
}

struct OpenFragment {
    trace_id: TraceId,
    time_reference: DateTime<Utc>,
    fragment: TraceFragment,
}

/// The default builder: one routed PDU per finished trace fragment, no
/// cross-fragment batching. Batching is a reporter-layer concern; this
/// policy trades some transport overhead for bounded latency.
pub struct SimpleTraceBuilder {
    string_table: StringTable,
    eu_states: HashMap<EuId, EuState>,
    reporter: Box<dyn Reporter>,
}

impl SimpleTraceBuilder {
    pub fn new(reporter: Box<dyn Reporter>) -> Self {
        Self {
            string_table: StringTable::new(),
            eu_states: HashMap::new(),
            reporter,
        }
    }

    /// Wrap a new builder in the shared handle units hold.
    pub fn shared(reporter: Box<dyn Reporter>) -> SharedTraceBuilder {
        Arc::new(Mutex::new(Self::new(reporter)))
    }

    /// Assemble one wire tag. `value: None` produces a key-only presence
    /// marker. A string-table collision falls back to the literal key.
    fn make_tag(table: &mut StringTable, key: &str, value: Option<&TagValue>) -> TagPdu {
        let tag_key = match table.get_alias(key) {
            Ok(alias) => TagKey::Alias(alias),
            Err(collision) => {
                warn!(%collision, "string table collision, inlining literal tag key");
                TagKey::Literal(key.to_string())
            }
        };
        TagPdu {
            key: Some(tag_key),
            value: value.map(TagValueWire::from),
        }
    }
}

impl TraceBuilder for SimpleTraceBuilder {
    fn start_eu(&mut self, eu_id: EuId, eu_type: EuType, tags: &TagMap) -> TraceResult<()> {
        if self.eu_states.contains_key(&eu_id) {
            return Err(TraceError::EuAlreadyRegistered(eu_id));
        }

        let mut descriptor = ExecutionUnitPdu {
            id: eu_id.as_bytes().to_vec(),
            unit_type: eu_type as i32,
            tags: Vec::with_capacity(tags.len()),
        };
        // Descriptor tags always carry full values; suppression only applies
        // to event tags.
        for (key, value) in tags.iter() {
            descriptor
                .tags
                .push(Self::make_tag(&mut self.string_table, key, Some(value)));
        }

        self.eu_states.insert(
            eu_id,
            EuState {
                descriptor,
                fragment: None,
                last_tag_values: HashMap::new(),
            },
        );
        debug!(eu = %eu_id, ty = ?eu_type, "registered execution unit");
        Ok(())
    }

    fn finish_eu(&mut self, eu_id: EuId) -> TraceResult<()> {
        let state = self
            .eu_states
            .get(&eu_id)
            .ok_or(TraceError::UnknownEu(eu_id))?;
        if state.fragment.is_some() {
            return Err(TraceError::TraceStillOpen(eu_id));
        }
        self.eu_states.remove(&eu_id);
        debug!(eu = %eu_id, "unregistered execution unit");
        Ok(())
    }

    fn start_trace(&mut self, eu_id: EuId, trace_id: TraceId) -> TraceResult<()> {
        let state = self
            .eu_states
            .get_mut(&eu_id)
            .ok_or(TraceError::UnknownEu(eu_id))?;
        if state.fragment.is_some() {
            return Err(TraceError::TraceAlreadyOpen(eu_id));
        }

        let time_reference = Utc::now();
        state.fragment = Some(OpenFragment {
            trace_id,
            time_reference,
            fragment: TraceFragment {
                trace_id: trace_id.as_bytes().to_vec(),
                execution_unit_id: eu_id.as_bytes().to_vec(),
                time_reference: Some(WireTimestamp::from_datetime(time_reference)),
                events: Vec::new(),
            },
        });
        Ok(())
    }

    fn add_event(
        &mut self,
        eu_id: EuId,
        trace_id: TraceId,
        sequence_number: u64,
        event_type: EventType,
        status: EventStatus,
        causes: &[EventReference],
    ) -> TraceResult<()> {
        let state = self
            .eu_states
            .get_mut(&eu_id)
            .ok_or(TraceError::UnknownEu(eu_id))?;
        let open = state
            .fragment
            .as_mut()
            .ok_or(TraceError::NoOpenTrace(eu_id))?;
        if open.trace_id != trace_id {
            return Err(TraceError::TraceIdMismatch {
                eu: eu_id,
                open: open.trace_id,
                closing: trace_id,
            });
        }

        let timestamp =
            WireDuration::from_delta(Utc::now().signed_duration_since(open.time_reference));
        let causing_events = causes
            .iter()
            .map(|cause| CausingEvent {
                // Same-trace causes omit the trace id on the wire.
                trace_id: (cause.trace_id != open.trace_id)
                    .then(|| cause.trace_id.as_bytes().to_vec()),
                event_id: cause.event_id.as_bytes().to_vec(),
            })
            .collect();

        open.fragment.events.push(EventPdu {
            sequence_number,
            timestamp: Some(timestamp),
            event_type: event_type as i32,
            status: status as i32,
            causing_events,
            tags: Vec::new(),
        });
        Ok(())
    }

    fn add_tags(&mut self, eu_id: EuId, target: EventId, tags: &TagMap) -> TraceResult<()> {
        let state = self
            .eu_states
            .get_mut(&eu_id)
            .ok_or(TraceError::UnknownEu(eu_id))?;
        let EuState {
            ref mut fragment,
            ref mut last_tag_values,
            ..
        } = *state;
        let open = fragment.as_mut().ok_or(TraceError::NoOpenTrace(eu_id))?;
        let event = open
            .fragment
            .events
            .last_mut()
            .ok_or(TraceError::NoPendingEvent(eu_id))?;

        let latest = EventId::derive(event.sequence_number, eu_id);
        if latest != target {
            return Err(TraceError::StaleTagTarget {
                eu: eu_id,
                target,
                latest,
            });
        }

        for (key, value) in tags.iter() {
            // Unchanged values become key-only presence markers so the
            // literal is not resent; changed values update the cache.
            let transmit = last_tag_values.get(key) != Some(value);
            if transmit {
                last_tag_values.insert(key.to_string(), value.clone());
            }
            event.tags.push(Self::make_tag(
                &mut self.string_table,
                key,
                transmit.then_some(value),
            ));
        }
        Ok(())
    }

    fn finish_trace(&mut self, eu_id: EuId, trace_id: TraceId) -> TraceResult<()> {
        let state = self
            .eu_states
            .get_mut(&eu_id)
            .ok_or(TraceError::UnknownEu(eu_id))?;
        let open = state
            .fragment
            .take()
            .ok_or(TraceError::NoOpenTrace(eu_id))?;
        if open.trace_id != trace_id {
            let open_id = open.trace_id;
            state.fragment = Some(open);
            return Err(TraceError::TraceIdMismatch {
                eu: eu_id,
                open: open_id,
                closing: trace_id,
            });
        }
        state.last_tag_values.clear();
        let descriptor = state.descriptor.clone();

        // Aliases referenced by the fragment must reach every partition
        // before (or with) the routed PDU that depends on them.
        if self.string_table.is_dirty() {
            let mut strings = Vec::new();
            self.string_table.save_to(&mut strings);
            debug!(entries = strings.len(), "broadcasting string table update");
            let pdu = TracingData::broadcast(BroadcastData { strings });
            self.reporter.broadcast(pdu.encoded());
        }

        let events = open.fragment.events.len();
        let pdu = TracingData::routed(
            trace_id.as_bytes().to_vec(),
            RoutedData {
                trace_fragments: vec![open.fragment],
                execution_units: vec![descriptor],
            },
        );
        debug!(trace = %trace_id, eu = %eu_id, events, "sending trace fragment");
        self.reporter.send(trace_id.as_bytes(), pdu.encoded());
        Ok(())
    }
}
