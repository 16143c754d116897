//! Execution units: per-unit event sequencing.
//!
//! An `ExecutionUnit` produces a causally linked, strictly ordered event
//! stream for one logical thread of control. It is owned, not shared: all
//! calls flow through the thread of control the unit belongs to, and only
//! the shared trace builder behind it is synchronized.

use crate::builder::SharedTraceBuilder;
use crate::error::{TraceError, TraceResult};
use crate::ids::{EuId, EventId, EventReference, TraceId};
use crate::tags::TagMap;
use crate::wire::{EuType, EventStatus, EventType};

pub struct ExecutionUnit {
    id: EuId,
    /// Sequence number the *next* event will get; strictly increasing,
    /// never reused.
    next_sequence: u64,
    trace_id: TraceId,
    /// Tags attached to the most recently produced event but not yet
    /// flushed; flushed just before the next event is cut, or on `finish`.
    pending_tags: TagMap,
    builder: SharedTraceBuilder,
    finished: bool,
}

impl ExecutionUnit {
    /// Create and register a unit.
    ///
    /// Opens a freshly minted trace and appends the unit's implicit initial
    /// idle marker at sequence 0; the first `trace_point` event gets
    /// sequence 1.
    pub fn new(builder: SharedTraceBuilder, eu_type: EuType, tags: TagMap) -> TraceResult<Self> {
        let id = EuId::random();
        let trace_id = TraceId::mint();
        {
            let mut shared = builder.lock();
            shared.start_eu(id, eu_type, &tags)?;
            shared.start_trace(id, trace_id)?;
            shared.add_event(id, trace_id, 0, EventType::CreateEu, EventStatus::Idle, &[])?;
        }
        Ok(Self {
            id,
            next_sequence: 1,
            trace_id,
            pending_tags: TagMap::new(),
            builder,
            finished: false,
        })
    }

    pub fn id(&self) -> EuId {
        self.id
    }

    /// The trace this unit is currently part of.
    pub fn trace_id(&self) -> TraceId {
        self.trace_id
    }

    /// Record an event.
    ///
    /// `trace_id: None` mints a fresh trace id, starting an independent
    /// causal chain; a trace id different from the unit's current one
    /// finishes the current trace first and continues under the given one.
    /// `tags` are buffered against the new event and can still be extended
    /// with `add_tags` until the next event is cut.
    pub fn trace_point(
        &mut self,
        trace_id: Option<TraceId>,
        event_type: EventType,
        status: EventStatus,
        causes: &[EventReference],
        tags: TagMap,
    ) -> TraceResult<EventReference> {
        self.ensure_active()?;
        self.flush_pending_tags()?;

        let target = trace_id.unwrap_or_else(TraceId::mint);
        {
            let mut shared = self.builder.lock();
            if target != self.trace_id {
                shared.finish_trace(self.id, self.trace_id)?;
                shared.start_trace(self.id, target)?;
                self.trace_id = target;
            }
            shared.add_event(
                self.id,
                self.trace_id,
                self.next_sequence,
                event_type,
                status,
                causes,
            )?;
        }
        self.next_sequence += 1;
        self.pending_tags.merge(tags);
        Ok(self.get_trace_context())
    }

    /// Reference to the *next* event, before it is created.
    ///
    /// Lets a caller capture the identity of an event that will only be
    /// materialized after a blocking operation returns (e.g. the send event
    /// of a blocking send). Idempotent until the next `trace_point` or
    /// `finish` advances the sequence.
    pub fn peek(&self) -> EventReference {
        EventReference::new(
            self.trace_id,
            EventId::derive(self.next_sequence, self.id),
            Some(self.id),
        )
    }

    /// Reference to the most recently produced event.
    pub fn get_trace_context(&self) -> EventReference {
        EventReference::new(
            self.trace_id,
            EventId::derive(self.next_sequence - 1, self.id),
            Some(self.id),
        )
    }

    /// Buffer tags for the most recently produced event. Repeated keys keep
    /// the last value; the buffer is flushed before the next event.
    pub fn add_tags(&mut self, tags: TagMap) -> TraceResult<()> {
        self.ensure_active()?;
        self.pending_tags.merge(tags);
        Ok(())
    }

    /// Flush, append the terminal `FinishEu` event, close the current trace,
    /// and unregister the unit. The unit records nothing afterwards; any
    /// further mutating call fails with [`TraceError::EuFinished`].
    pub fn finish(&mut self) -> TraceResult<()> {
        self.ensure_active()?;
        self.flush_pending_tags()?;
        {
            let mut shared = self.builder.lock();
            shared.add_event(
                self.id,
                self.trace_id,
                self.next_sequence,
                EventType::FinishEu,
                EventStatus::Idle,
                &[],
            )?;
            shared.finish_trace(self.id, self.trace_id)?;
            shared.finish_eu(self.id)?;
        }
        self.next_sequence += 1;
        self.finished = true;
        Ok(())
    }

    fn ensure_active(&self) -> TraceResult<()> {
        if self.finished {
            Err(TraceError::EuFinished(self.id))
        } else {
            Ok(())
        }
    }

    fn flush_pending_tags(&mut self) -> TraceResult<()> {
        if self.pending_tags.is_empty() {
            return Ok(());
        }
        let tags = std::mem::take(&mut self.pending_tags);
        let target = EventId::derive(self.next_sequence - 1, self.id);
        self.builder.lock().add_tags(self.id, target, &tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::SimpleTraceBuilder;
    use crate::tags::TagValue;
    use crate::test_support::{RecordingReporter, ReportedPdu};
    use crate::wire::{Payload, TagKey, TagValueWire, TraceFragment};

    fn shared_builder() -> (SharedTraceBuilder, RecordingReporter) {
        let reporter = RecordingReporter::new();
        let builder = SimpleTraceBuilder::shared(Box::new(reporter.clone()));
        (builder, reporter)
    }

    fn only_fragment(pdu: &ReportedPdu) -> &TraceFragment {
        match pdu {
            ReportedPdu::Routed { data, .. } => match data.payload.as_ref().unwrap() {
                Payload::Routed(routed) => {
                    assert_eq!(routed.trace_fragments.len(), 1);
                    &routed.trace_fragments[0]
                }
                Payload::Broadcast(_) => panic!("expected routed payload"),
            },
            ReportedPdu::Broadcast { .. } => panic!("expected routed PDU"),
        }
    }

    #[test]
    fn test_sequence_numbers_increase_by_one() {
        let (builder, reporter) = shared_builder();
        let mut eu = ExecutionUnit::new(builder, EuType::Thread, TagMap::new()).unwrap();
        let trace = eu.trace_id();
        for _ in 0..5 {
            eu.trace_point(
                Some(trace),
                EventType::TracePoint,
                EventStatus::Busy,
                &[],
                TagMap::new(),
            )
            .unwrap();
        }
        eu.finish().unwrap();

        let sent = reporter.items();
        let fragment = only_fragment(sent.last().unwrap());
        let sequences: Vec<u64> = fragment.events.iter().map(|e| e.sequence_number).collect();
        assert_eq!(sequences, vec![0, 1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_peek_matches_next_context() {
        let (builder, _reporter) = shared_builder();
        let mut eu = ExecutionUnit::new(builder, EuType::Thread, TagMap::new()).unwrap();
        let trace = eu.trace_id();

        let peeked = eu.peek();
        // Idempotent until an event is actually produced.
        assert_eq!(peeked, eu.peek());

        let produced = eu
            .trace_point(
                Some(trace),
                EventType::TracePoint,
                EventStatus::Busy,
                &[],
                TagMap::new(),
            )
            .unwrap();
        assert_eq!(peeked, produced);
        assert_eq!(peeked, eu.get_trace_context());
        assert_ne!(peeked, eu.peek());
    }

    #[test]
    fn test_fresh_trace_minted_when_trace_id_omitted() {
        let (builder, _reporter) = shared_builder();
        let mut eu = ExecutionUnit::new(builder, EuType::Thread, TagMap::new()).unwrap();
        let birth_trace = eu.trace_id();

        eu.trace_point(
            None,
            EventType::TracePoint,
            EventStatus::Busy,
            &[],
            TagMap::new(),
        )
        .unwrap();
        assert_ne!(eu.trace_id(), birth_trace);
        eu.finish().unwrap();
    }

    #[test]
    fn test_finished_unit_rejects_calls() {
        let (builder, _reporter) = shared_builder();
        let mut eu = ExecutionUnit::new(builder, EuType::Thread, TagMap::new()).unwrap();
        eu.finish().unwrap();

        let err = eu
            .trace_point(
                None,
                EventType::TracePoint,
                EventStatus::Busy,
                &[],
                TagMap::new(),
            )
            .unwrap_err();
        assert!(matches!(err, TraceError::EuFinished(_)));
        assert!(matches!(
            eu.add_tags(TagMap::new()).unwrap_err(),
            TraceError::EuFinished(_)
        ));
        assert!(matches!(eu.finish().unwrap_err(), TraceError::EuFinished(_)));
    }

    #[test]
    fn test_pending_tags_flush_to_previous_event() {
        let (builder, reporter) = shared_builder();
        let mut eu = ExecutionUnit::new(builder, EuType::Thread, TagMap::new()).unwrap();
        let trace = eu.trace_id();

        let point_tags: TagMap = [("from_point", TagValue::Int(1))].into_iter().collect();
        eu.trace_point(
            Some(trace),
            EventType::TracePoint,
            EventStatus::Busy,
            &[],
            point_tags,
        )
        .unwrap();
        let late_tags: TagMap = [("added_later", TagValue::Bool(true))].into_iter().collect();
        eu.add_tags(late_tags).unwrap();

        // Cutting the next event flushes both onto the previous one.
        eu.trace_point(
            Some(trace),
            EventType::TracePoint,
            EventStatus::Idle,
            &[],
            TagMap::new(),
        )
        .unwrap();
        eu.finish().unwrap();

        let sent = reporter.items();
        let fragment = only_fragment(sent.last().unwrap());
        let tagged = &fragment.events[1];
        assert_eq!(tagged.sequence_number, 1);
        assert_eq!(tagged.tags.len(), 2);
        assert_eq!(fragment.events[2].tags.len(), 0);
    }

    #[test]
    fn test_create_and_destroy_eu_wire_shape() {
        // The end-to-end shape: a PROCESS unit with five scalar tags,
        // finished immediately, yields one broadcast PDU (the five aliases)
        // then one routed PDU with the idle marker and the FinishEu event.
        let (builder, reporter) = shared_builder();
        let tags: TagMap = [
            ("tagBoolean", TagValue::Bool(true)),
            ("tagInt", TagValue::Int(123)),
            ("tagFloat", TagValue::Float(3.14)),
            ("tagString", TagValue::Str("String tag".into())),
            ("tagBytes", TagValue::Bytes(b"bytes tag 7".to_vec())),
        ]
        .into_iter()
        .collect();
        let mut eu = ExecutionUnit::new(builder, EuType::Process, tags).unwrap();
        eu.finish().unwrap();

        let sent = reporter.items();
        assert_eq!(sent.len(), 2);

        let strings = match &sent[0] {
            ReportedPdu::Broadcast { data } => match data.payload.as_ref().unwrap() {
                Payload::Broadcast(b) => b.strings.clone(),
                Payload::Routed(_) => panic!("expected broadcast payload"),
            },
            ReportedPdu::Routed { .. } => panic!("first PDU must be the string broadcast"),
        };
        let aliases: Vec<u32> = strings.iter().map(|e| e.alias).collect();
        assert_eq!(
            aliases,
            vec![3191348081, 3350542684, 465169687, 1042072278, 1660915494]
        );

        let (routing_key, routed) = match &sent[1] {
            ReportedPdu::Routed { routing_key, data } => match data.payload.as_ref().unwrap() {
                Payload::Routed(r) => (routing_key.clone(), r.clone()),
                Payload::Broadcast(_) => panic!("expected routed payload"),
            },
            ReportedPdu::Broadcast { .. } => panic!("second PDU must be routed"),
        };

        let fragment = &routed.trace_fragments[0];
        assert_eq!(routing_key, fragment.trace_id);
        assert_eq!(fragment.events.len(), 2);
        assert_eq!(fragment.events[0].sequence_number, 0);
        assert_eq!(fragment.events[0].event_type, EventType::CreateEu as i32);
        assert_eq!(fragment.events[0].status, EventStatus::Idle as i32);
        assert_eq!(fragment.events[1].sequence_number, 1);
        assert_eq!(fragment.events[1].event_type, EventType::FinishEu as i32);

        let descriptor = &routed.execution_units[0];
        assert_eq!(descriptor.unit_type, EuType::Process as i32);
        assert_eq!(descriptor.tags.len(), 5);
        assert_eq!(descriptor.tags[0].key, Some(TagKey::Alias(3191348081)));
        assert_eq!(descriptor.tags[0].value, Some(TagValueWire::Boolean(true)));
        assert_eq!(descriptor.tags[1].value, Some(TagValueWire::Int(123)));
        assert_eq!(descriptor.tags[2].value, Some(TagValueWire::Float(3.14)));
        assert_eq!(
            descriptor.tags[3].value,
            Some(TagValueWire::Str("String tag".into()))
        );
        assert_eq!(
            descriptor.tags[4].value,
            Some(TagValueWire::Bytes(b"bytes tag 7".to_vec()))
        );
    }

    #[test]
    fn test_cross_unit_causality() {
        let (builder, reporter) = shared_builder();
        let mut a = ExecutionUnit::new(builder.clone(), EuType::Process, TagMap::new()).unwrap();
        let mut b = ExecutionUnit::new(builder, EuType::Process, TagMap::new()).unwrap();

        // A starts a trace and emits one event.
        a.trace_point(
            None,
            EventType::SpanStart,
            EventStatus::Busy,
            &[],
            TagMap::new(),
        )
        .unwrap();
        let trace = a.trace_id();

        // B continues that trace, causally referencing A's event.
        b.trace_point(
            Some(trace),
            EventType::SpanStart,
            EventStatus::Busy,
            &[a.get_trace_context()],
            TagMap::new(),
        )
        .unwrap();

        // B's next event will be a blocking send; capture its identity up
        // front so A's receive event can reference it.
        let send_event = b.peek();
        a.trace_point(
            Some(trace),
            EventType::SpanStart,
            EventStatus::Busy,
            &[send_event],
            TagMap::new(),
        )
        .unwrap();
        let b_send = b
            .trace_point(
                Some(trace),
                EventType::SpanFinish,
                EventStatus::Idle,
                &[],
                TagMap::new(),
            )
            .unwrap();
        assert_eq!(send_event, b_send);
        assert_eq!(send_event, b.get_trace_context());

        b.finish().unwrap();
        a.finish().unwrap();

        // Find A's fragment for the shared trace and check the recorded
        // cause ids.
        let sent = reporter.items();
        let mut same_trace_causes = Vec::new();
        for pdu in &sent {
            if let ReportedPdu::Routed { data, .. } = pdu {
                if let Some(Payload::Routed(routed)) = data.payload.as_ref() {
                    for fragment in &routed.trace_fragments {
                        if fragment.trace_id == trace.as_bytes().to_vec() {
                            for event in &fragment.events {
                                for cause in &event.causing_events {
                                    same_trace_causes.push(cause.clone());
                                }
                            }
                        }
                    }
                }
            }
        }
        // Both recorded causes are same-trace: trace id omitted on the wire.
        assert!(!same_trace_causes.is_empty());
        assert!(same_trace_causes.iter().all(|c| c.trace_id.is_none()));
        // A's receive event references exactly the id B later reported.
        assert!(same_trace_causes
            .iter()
            .any(|c| c.event_id == b_send.event_id.as_bytes().to_vec()));
    }
}
