//! Wire protocol data units.
//!
//! The binary schema is an external contract shared with the collector. The
//! message types are written out by hand with `prost` field attributes; the
//! field numbers below are frozen.
//!
//! A `TracingData` envelope is either *routed* (has a routing key, carries
//! trace fragments plus execution-unit descriptors, destined for a single
//! collector partition) or *broadcast* (carries new string-table entries,
//! destined for all partitions). Exactly one payload kind is populated.

use bytes::Bytes;
use chrono::{DateTime, TimeDelta, Utc};
use prost::Message;

use crate::tags::TagValue;

/// The envelope for everything the producer side emits.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TracingData {
    /// Present exactly when the payload is routed; equals the trace id.
    #[prost(bytes = "vec", optional, tag = "1")]
    pub routing_key: Option<Vec<u8>>,
    #[prost(oneof = "Payload", tags = "2, 3")]
    pub payload: Option<Payload>,
}

#[derive(Clone, PartialEq, ::prost::Oneof)]
pub enum Payload {
    #[prost(message, tag = "2")]
    Routed(RoutedData),
    #[prost(message, tag = "3")]
    Broadcast(BroadcastData),
}

impl TracingData {
    pub fn routed(routing_key: Vec<u8>, data: RoutedData) -> Self {
        Self {
            routing_key: Some(routing_key),
            payload: Some(Payload::Routed(data)),
        }
    }

    pub fn broadcast(data: BroadcastData) -> Self {
        Self {
            routing_key: None,
            payload: Some(Payload::Broadcast(data)),
        }
    }

    pub fn encoded(&self) -> Bytes {
        self.encode_to_vec().into()
    }
}

/// Minimal view of a serialized `TracingData`: just the routing key.
///
/// Transports that partition by key can decode this header without paying
/// for the full payload; unknown fields are skipped during decoding.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TracingDataHeader {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub routing_key: Option<Vec<u8>>,
}

impl TracingDataHeader {
    pub fn peek(payload: &[u8]) -> Result<Self, prost::DecodeError> {
        Self::decode(payload)
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RoutedData {
    #[prost(message, repeated, tag = "1")]
    pub trace_fragments: Vec<TraceFragment>,
    #[prost(message, repeated, tag = "2")]
    pub execution_units: Vec<ExecutionUnitPdu>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct BroadcastData {
    #[prost(message, repeated, tag = "1")]
    pub strings: Vec<StringTableEntry>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct StringTableEntry {
    #[prost(uint32, tag = "1")]
    pub alias: u32,
    #[prost(string, tag = "2")]
    pub value: String,
}

/// The events produced by one execution unit within one trace.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TraceFragment {
    #[prost(bytes = "vec", tag = "1")]
    pub trace_id: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub execution_unit_id: Vec<u8>,
    /// Absolute time of the fragment's first event; event timestamps are
    /// small deltas against this.
    #[prost(message, optional, tag = "3")]
    pub time_reference: Option<WireTimestamp>,
    #[prost(message, repeated, tag = "4")]
    pub events: Vec<EventPdu>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EventPdu {
    #[prost(uint64, tag = "1")]
    pub sequence_number: u64,
    /// Delta against the fragment's time reference.
    #[prost(message, optional, tag = "2")]
    pub timestamp: Option<WireDuration>,
    #[prost(enumeration = "EventType", tag = "3")]
    pub event_type: i32,
    #[prost(enumeration = "EventStatus", tag = "4")]
    pub status: i32,
    #[prost(message, repeated, tag = "5")]
    pub causing_events: Vec<CausingEvent>,
    #[prost(message, repeated, tag = "6")]
    pub tags: Vec<TagPdu>,
}

/// A happened-after edge to another event.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CausingEvent {
    /// Omitted when the causing event is in the same trace as the fragment.
    #[prost(bytes = "vec", optional, tag = "1")]
    pub trace_id: Option<Vec<u8>>,
    #[prost(bytes = "vec", tag = "2")]
    pub event_id: Vec<u8>,
}

/// Self-descriptor of an execution unit, re-sent with every finished
/// fragment so the collector always has a current picture of the unit.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ExecutionUnitPdu {
    #[prost(bytes = "vec", tag = "1")]
    pub id: Vec<u8>,
    #[prost(enumeration = "EuType", tag = "2")]
    pub unit_type: i32,
    #[prost(message, repeated, tag = "3")]
    pub tags: Vec<TagPdu>,
}

/// A key/value tag. The key is either a string-table alias or, after a hash
/// collision, the literal string. A tag with no value oneof populated is a
/// presence marker: the value is unchanged since it was last transmitted for
/// this key on this unit.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TagPdu {
    #[prost(oneof = "TagKey", tags = "1, 2")]
    pub key: Option<TagKey>,
    #[prost(oneof = "TagValueWire", tags = "3, 4, 5, 6, 7")]
    pub value: Option<TagValueWire>,
}

#[derive(Clone, PartialEq, ::prost::Oneof)]
pub enum TagKey {
    #[prost(uint32, tag = "1")]
    Alias(u32),
    #[prost(string, tag = "2")]
    Literal(String),
}

#[derive(Clone, PartialEq, ::prost::Oneof)]
pub enum TagValueWire {
    #[prost(int64, tag = "3")]
    Int(i64),
    #[prost(double, tag = "4")]
    Float(f64),
    #[prost(bool, tag = "5")]
    Boolean(bool),
    #[prost(string, tag = "6")]
    Str(String),
    #[prost(bytes = "vec", tag = "7")]
    Bytes(Vec<u8>),
}

impl From<&TagValue> for TagValueWire {
    fn from(value: &TagValue) -> Self {
        match value {
            TagValue::Bool(v) => TagValueWire::Boolean(*v),
            TagValue::Int(v) => TagValueWire::Int(*v),
            TagValue::Float(v) => TagValueWire::Float(*v),
            TagValue::Str(v) => TagValueWire::Str(v.clone()),
            TagValue::Bytes(v) => TagValueWire::Bytes(v.clone()),
        }
    }
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration,
    serde::Serialize, serde::Deserialize,
)]
#[repr(i32)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Implicit first event of a unit's life.
    CreateEu = 0,
    /// Terminal event appended by `ExecutionUnit::finish`.
    FinishEu = 1,
    /// An ordinary instrumentation point.
    TracePoint = 2,
    SpanStart = 3,
    SpanFinish = 4,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration,
    serde::Serialize, serde::Deserialize,
)]
#[repr(i32)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Unknown = 0,
    Busy = 1,
    Idle = 2,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration,
    serde::Serialize, serde::Deserialize,
)]
#[repr(i32)]
#[serde(rename_all = "snake_case")]
pub enum EuType {
    Thread = 0,
    Process = 1,
    Task = 2,
}

/// Absolute timestamp, shaped like the protobuf well-known type.
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct WireTimestamp {
    #[prost(int64, tag = "1")]
    pub seconds: i64,
    #[prost(int32, tag = "2")]
    pub nanos: i32,
}

impl WireTimestamp {
    pub fn from_datetime(ts: DateTime<Utc>) -> Self {
        Self {
            seconds: ts.timestamp(),
            nanos: ts.timestamp_subsec_nanos() as i32,
        }
    }
}

/// Signed duration, shaped like the protobuf well-known type.
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct WireDuration {
    #[prost(int64, tag = "1")]
    pub seconds: i64,
    #[prost(int32, tag = "2")]
    pub nanos: i32,
}

impl WireDuration {
    pub fn from_delta(delta: TimeDelta) -> Self {
        Self {
            seconds: delta.num_seconds(),
            nanos: delta.subsec_nanos(),
        }
    }
}
