//! Request/response correlation on top of [`crate::frame`]: assigns each
//! outgoing request a correlation id, tracks which schema its response is
//! expected to carry, and flags a response whose id or schema doesn't
//! match anything in flight rather than silently misrouting it.

use crate::error::{ensure, Result};
use crate::frame::{Frame, MessageType};
use std::collections::HashMap;
use uuid::Uuid;

struct InFlight {
    expected_schema_id: Option<Uuid>,
}

/// Tracks in-flight requests for one connection. Not `Sync`; pair one
/// per connection and serialize access the way the provider already
/// does for its own reads/writes.
pub struct Protocol {
    next_id: u64,
    in_flight: HashMap<u64, InFlight>,
}

impl Default for Protocol {
    fn default() -> Self {
        Self::new()
    }
}

impl Protocol {
    pub fn new() -> Self {
        Protocol {
            next_id: 0,
            in_flight: HashMap::new(),
        }
    }

    /// Wrap `payload` as a `Request` frame with a fresh correlation id,
    /// recording that a matching `Response` is expected.
    pub fn begin_request(&mut self, schema_id: Option<Uuid>, payload: Vec<u8>) -> Frame {
        let id = self.next_id;
        self.next_id += 1;
        self.in_flight.insert(
            id,
            InFlight {
                expected_schema_id: schema_id,
            },
        );
        tracing::trace!(correlation_id = id, "request opened");
        Frame::new(MessageType::Request, schema_id, payload).with_correlation_id(id)
    }

    /// Validate an inbound frame as the response to one of our open
    /// requests, consuming the in-flight entry on success.
    pub fn complete_response(&mut self, frame: &Frame) -> Result<()> {
        ensure!(
            frame.header.message_type == MessageType::Response,
            Framing,
            "expected a response frame, got {:?}",
            frame.header.message_type,
        );
        let id = frame.header.correlation_id.ok_or_else(|| {
            crate::error::error!(Framing, "response frame carries no correlation id")
        })?;
        let entry = self.in_flight.remove(&id).ok_or_else(|| {
            crate::error::error!(
                UnexpectedResponse,
                "no in-flight request for correlation id {}",
                id
            )
        })?;
        if let (Some(expected), Some(actual)) = (entry.expected_schema_id, frame.header.schema_id) {
            ensure!(
                expected == actual,
                SchemaMismatch,
                "response schema id {} does not match request's expected {}",
                actual,
                expected,
            );
        }
        tracing::trace!(correlation_id = id, "request closed");
        Ok(())
    }

    /// Wrap `payload` as an `Event` frame (no correlation expected).
    pub fn event(&self, schema_id: Option<Uuid>, payload: Vec<u8>) -> Frame {
        Frame::new(MessageType::Event, schema_id, payload)
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }
}
