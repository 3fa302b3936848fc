//! Framing and transport-agnostic IPC on top of `barewire`: a wire
//! format for whole messages (C9), request/response correlation, and
//! the collaborator interfaces a pipe or shared-memory transport
//! implements to move those messages.
//!
//! `barewire` itself only knows how to encode/decode one value against
//! one schema; this crate adds the envelope (message type, schema id,
//! an optional checksum, an optional correlation id) and two layers of
//! collaborator trait: [`platform`]'s raw named-pipe/shared-memory/
//! memory-mapping primitives, and [`provider`]'s higher-level whole-
//! frame `send`/`recv` built on top of them — following the same split
//! the engine this is patterned on draws between its wire codec and its
//! network layer.

pub mod error;
pub mod frame;
pub mod platform;
pub mod protocol;
pub mod provider;

pub use error::{Error, ErrorKind, Result};
pub use frame::{Compressor, Frame, FrameHeader, Identity, MessageType};
pub use platform::{
    InMemoryPlatform, MemoryAccess, MemoryPlatform, NamedPipePlatform, PipeDirection, PipeMode,
    ResourceKind, ResourcePlatform, SharedMemoryPlatform,
};
pub use protocol::Protocol;
pub use provider::{in_memory::InMemoryProvider, PipeProvider, Provider, SharedMemoryProvider};

#[cfg(test)]
mod tests {
    use super::*;
    use barewire::schema::Schema;
    use barewire::value::Value;
    use uuid::Uuid;

    #[test]
    fn request_response_over_in_memory_provider() {
        let mut schema = Schema::new("Ping");
        schema.define("Ping", barewire::bare_type!(struct { (nonce: u32) }));
        let schema = schema.validate().unwrap();
        let schema_id = Uuid::from_bytes(schema.sha256()[..16].try_into().unwrap());

        let (client, server) = InMemoryProvider::pair();
        let mut protocol = Protocol::new();

        let request_value = Value::strukt([("nonce", Value::U32(7))]);
        let payload = barewire::encode_to_vec(&schema, &request_value).unwrap();
        let request = protocol.begin_request(Some(schema_id), payload);
        client.send(request.clone()).unwrap();

        let received = server.recv().unwrap();
        assert_eq!(received.header.message_type, MessageType::Request);
        let decoded = barewire::decode_from_slice(&schema, &received.payload).unwrap();
        assert_eq!(decoded.struct_field("nonce"), Some(&Value::U32(7)));

        let response = Frame::new(MessageType::Response, Some(schema_id), received.payload)
            .with_correlation_id(request.header.correlation_id.unwrap());
        server.send(response).unwrap();

        let reply = client.recv().unwrap();
        protocol.complete_response(&reply).unwrap();
        assert_eq!(protocol.in_flight_count(), 0);
    }
}
