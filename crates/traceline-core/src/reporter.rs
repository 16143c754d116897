//! The delivery seam between the core and the transport.

use bytes::Bytes;

/// A partitioned message stream that delivers serialized PDUs to the
/// collector.
///
/// Both methods receive an already-serialized `TracingData`. Failure
/// handling — retries, backpressure, circuit breaking — is entirely the
/// implementation's responsibility; the core has no retry logic and does
/// not assume the calls return quickly.
pub trait Reporter: Send {
    /// Deliver a routed PDU. All payloads sharing a routing key must end up
    /// at the same destination partition.
    fn send(&mut self, routing_key: &[u8], payload: Bytes);

    /// Deliver a broadcast PDU to every destination partition.
    fn broadcast(&mut self, payload: Bytes);
}
