//! In-memory reporter for tests and demos.

use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use prost::Message;

use traceline_core::{Reporter, TracingData};

/// One delivered PDU, as the transport saw it.
#[derive(Debug, Clone)]
pub enum Delivery {
    Routed {
        routing_key: Vec<u8>,
        payload: Bytes,
    },
    Broadcast {
        payload: Bytes,
    },
}

impl Delivery {
    pub fn payload(&self) -> &Bytes {
        match self {
            Delivery::Routed { payload, .. } => payload,
            Delivery::Broadcast { payload } => payload,
        }
    }
}

/// Records every delivery in arrival order. Clones share the same log, so a
/// handle kept by the test observes what the builder sent.
#[derive(Clone, Default)]
pub struct MemoryReporter {
    deliveries: Arc<Mutex<Vec<Delivery>>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().clone()
    }

    /// Decode every delivered payload back into the PDU model.
    pub fn decoded(&self) -> Result<Vec<TracingData>, prost::DecodeError> {
        self.deliveries
            .lock()
            .iter()
            .map(|delivery| TracingData::decode(delivery.payload().clone()))
            .collect()
    }
}

impl Reporter for MemoryReporter {
    fn send(&mut self, routing_key: &[u8], payload: Bytes) {
        self.deliveries.lock().push(Delivery::Routed {
            routing_key: routing_key.to_vec(),
            payload,
        });
    }

    fn broadcast(&mut self, payload: Bytes) {
        self.deliveries.lock().push(Delivery::Broadcast { payload });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use traceline_core::wire::Payload;
    use traceline_core::{EuType, ExecutionUnit, SimpleTraceBuilder, TagMap, TracingDataHeader};

    #[test]
    fn test_routing_key_matches_header_view() {
        let reporter = MemoryReporter::new();
        let builder = SimpleTraceBuilder::shared(Box::new(reporter.clone()));
        let mut eu = ExecutionUnit::new(builder, EuType::Process, TagMap::new()).unwrap();
        eu.finish().unwrap();

        for delivery in reporter.deliveries() {
            if let Delivery::Routed {
                routing_key,
                payload,
            } = delivery
            {
                let header = TracingDataHeader::peek(&payload).unwrap();
                assert_eq!(header.routing_key.as_deref(), Some(&routing_key[..]));
            }
        }
    }

    #[test]
    fn test_decoded_payloads_have_one_payload_kind() {
        let reporter = MemoryReporter::new();
        let builder = SimpleTraceBuilder::shared(Box::new(reporter.clone()));
        let tags: TagMap = [("component", "worker")].into_iter().collect();
        let mut eu = ExecutionUnit::new(builder, EuType::Thread, tags).unwrap();
        eu.finish().unwrap();

        let decoded = reporter.decoded().unwrap();
        assert!(!decoded.is_empty());
        for pdu in decoded {
            match pdu.payload {
                Some(Payload::Routed(_)) => assert!(pdu.routing_key.is_some()),
                Some(Payload::Broadcast(_)) => assert!(pdu.routing_key.is_none()),
                None => panic!("PDU without payload"),
            }
        }
    }
}
