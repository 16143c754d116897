//! Shared test doubles for unit tests.

use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use prost::Message;

use crate::reporter::Reporter;
use crate::wire::TracingData;

/// What a reporter received, decoded back into the PDU model.
#[derive(Debug, Clone)]
pub enum ReportedPdu {
    Routed {
        routing_key: Vec<u8>,
        data: TracingData,
    },
    Broadcast {
        data: TracingData,
    },
}

/// Records every delivered PDU in memory, in arrival order.
#[derive(Clone, Default)]
pub struct RecordingReporter {
    items: Arc<Mutex<Vec<ReportedPdu>>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> Vec<ReportedPdu> {
        self.items.lock().clone()
    }
}

impl Reporter for RecordingReporter {
    fn send(&mut self, routing_key: &[u8], payload: Bytes) {
        let data = TracingData::decode(payload).expect("reporter received undecodable PDU");
        self.items.lock().push(ReportedPdu::Routed {
            routing_key: routing_key.to_vec(),
            data,
        });
    }

    fn broadcast(&mut self, payload: Bytes) {
        let data = TracingData::decode(payload).expect("reporter received undecodable PDU");
        self.items.lock().push(ReportedPdu::Broadcast { data });
    }
}
