use barewire::schema::Schema;
use barewire::value::Value;
use barewire_ipc::{Frame, Identity, InMemoryProvider, MessageType, Protocol, Provider};
use uuid::Uuid;

fn ping_schema() -> barewire::schema::Schema<barewire::schema::Validated> {
    let mut schema = Schema::new("Ping");
    schema.define("Ping", barewire::bare_type!(struct { (nonce: u32) }));
    schema.validate().unwrap()
}

#[test]
fn request_response_roundtrip_across_simulated_provider() {
    let schema = ping_schema();
    let schema_id = Uuid::from_bytes(schema.sha256()[..16].try_into().unwrap());

    let (client, server) = InMemoryProvider::pair();
    let mut client_protocol = Protocol::new();

    let value = Value::strukt([("nonce", Value::U32(42))]);
    let payload = barewire::encode_to_vec(&schema, &value).unwrap();
    let request = client_protocol
        .begin_request(Some(schema_id), payload)
        .with_checksum();
    client.send(request.clone()).unwrap();

    let received = server.recv().unwrap();
    assert_eq!(received.header.message_type, MessageType::Request);
    let decoded = barewire::decode_from_slice(&schema, &received.payload).unwrap();
    assert_eq!(decoded.struct_field("nonce"), Some(&Value::U32(42)));

    let reply_value = Value::strukt([("nonce", Value::U32(43))]);
    let reply_payload = barewire::encode_to_vec(&schema, &reply_value).unwrap();
    let response = Frame::new(MessageType::Response, Some(schema_id), reply_payload)
        .with_correlation_id(request.header.correlation_id.unwrap())
        .with_checksum();
    server.send(response).unwrap();

    let reply = client.recv().unwrap();
    client_protocol.complete_response(&reply).unwrap();
    let decoded_reply = barewire::decode_from_slice(&schema, &reply.payload).unwrap();
    assert_eq!(decoded_reply.struct_field("nonce"), Some(&Value::U32(43)));
    assert_eq!(client_protocol.in_flight_count(), 0);
}

#[test]
fn combine_split_recovers_frames_sent_back_to_back() {
    let frames = vec![
        Frame::new(MessageType::Event, None, b"one".to_vec()),
        Frame::new(MessageType::Event, None, b"two".to_vec()),
        Frame::new(MessageType::Event, None, b"three".to_vec()),
    ];
    let bytes = barewire_ipc::frame::combine(&frames, &Identity).unwrap();
    let (recovered, consumed) = barewire_ipc::frame::split(&bytes, &Identity).unwrap();
    let payloads: Vec<_> = recovered.iter().map(|f| f.payload.clone()).collect();
    assert_eq!(payloads, vec![b"one".to_vec(), b"two".to_vec(), b"three".to_vec()]);
    assert_eq!(consumed, bytes.len());
}

#[test]
fn unexpected_response_is_rejected_end_to_end() {
    let (_client, server) = InMemoryProvider::pair();
    let mut protocol = Protocol::new();
    let stray = Frame::new(MessageType::Response, None, vec![]).with_correlation_id(12345);
    server.send(stray).unwrap();
    let received = _client.recv().unwrap();
    assert!(protocol.complete_response(&received).is_err());
}
