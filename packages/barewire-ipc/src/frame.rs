//! Frame header and wire layout (C9): `[flags][message_type][schema_id?]
//! [payload_length][checksum?][payload]`. `schema_id` is a 16-byte UUID,
//! present only when the `HAS_SCHEMA_ID` flag bit is set; the checksum is
//! a single XOR byte over the payload, present only when `HAS_CHECKSUM`
//! is set. Both are optional so a transport that already guarantees
//! message boundaries and payload integrity (most shared-memory ring
//! buffers do) doesn't pay for header fields it doesn't need.

use crate::error::{bail, ensure, Result};
use barewire::primitive::{read_u32, write_u32};
use std::io::{Read, Write};
use uuid::Uuid;

const HAS_SCHEMA_ID: u8 = 0b0000_0001;
const HAS_CHECKSUM: u8 = 0b0000_0010;
const HAS_CORRELATION_ID: u8 = 0b0000_0100;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum MessageType {
    Request,
    Response,
    Event,
}

impl MessageType {
    fn to_byte(self) -> u8 {
        match self {
            MessageType::Request => 0,
            MessageType::Response => 1,
            MessageType::Event => 2,
        }
    }

    fn from_byte(b: u8) -> Result<Self> {
        Ok(match b {
            0 => MessageType::Request,
            1 => MessageType::Response,
            2 => MessageType::Event,
            other => bail!(Framing, "unknown message type byte {:#04x}", other),
        })
    }
}

#[derive(Debug, Clone)]
pub struct FrameHeader {
    pub message_type: MessageType,
    pub schema_id: Option<Uuid>,
    /// Present on requests and their responses; ties a `Response` frame
    /// back to the `Request` that prompted it. See [`crate::protocol`].
    pub correlation_id: Option<u64>,
    pub payload_length: u32,
    pub checksum: Option<u8>,
}

#[derive(Debug, Clone)]
pub struct Frame {
    pub header: FrameHeader,
    pub payload: Vec<u8>,
}

/// A byte-level transform applied to a frame's payload before it is
/// written and after it is read. Defaults to the identity transform;
/// callers with a real compression scheme plug it in here rather than
/// this crate picking one.
pub trait Compressor {
    fn compress(&self, payload: &[u8]) -> Vec<u8>;
    fn decompress(&self, payload: &[u8]) -> Result<Vec<u8>>;
}

pub struct Identity;

impl Compressor for Identity {
    fn compress(&self, payload: &[u8]) -> Vec<u8> {
        payload.to_vec()
    }
    fn decompress(&self, payload: &[u8]) -> Result<Vec<u8>> {
        Ok(payload.to_vec())
    }
}

impl Frame {
    pub fn new(message_type: MessageType, schema_id: Option<Uuid>, payload: Vec<u8>) -> Self {
        Frame {
            header: FrameHeader {
                message_type,
                schema_id,
                correlation_id: None,
                payload_length: payload.len() as u32,
                checksum: None,
            },
            payload,
        }
    }

    pub fn with_checksum(mut self) -> Self {
        self.header.checksum = Some(xor_checksum(&self.payload));
        self
    }

    pub fn with_correlation_id(mut self, id: u64) -> Self {
        self.header.correlation_id = Some(id);
        self
    }

    pub fn write_to<W: Write>(&self, write: &mut W, compressor: &dyn Compressor) -> Result<()> {
        let payload = compressor.compress(&self.payload);

        let mut flags = 0u8;
        if self.header.schema_id.is_some() {
            flags |= HAS_SCHEMA_ID;
        }
        if self.header.checksum.is_some() {
            flags |= HAS_CHECKSUM;
        }
        if self.header.correlation_id.is_some() {
            flags |= HAS_CORRELATION_ID;
        }
        write.write_all(&[flags])?;
        write.write_all(&[self.header.message_type.to_byte()])?;
        if let Some(id) = self.header.schema_id {
            write.write_all(id.as_bytes())?;
        }
        if let Some(id) = self.header.correlation_id {
            write.write_all(&id.to_le_bytes())?;
        }
        write_u32(write, payload.len() as u32)?;
        if let Some(checksum) = self.header.checksum {
            write.write_all(&[checksum])?;
        }
        write.write_all(&payload)?;
        Ok(())
    }

    pub fn read_from<R: Read>(read: &mut R, compressor: &dyn Compressor) -> Result<Self> {
        let mut flags_buf = [0u8; 1];
        read.read_exact(&mut flags_buf)?;
        let flags = flags_buf[0];

        let mut type_buf = [0u8; 1];
        read.read_exact(&mut type_buf)?;
        let message_type = MessageType::from_byte(type_buf[0])?;

        let schema_id = if flags & HAS_SCHEMA_ID != 0 {
            let mut id_buf = [0u8; 16];
            read.read_exact(&mut id_buf)?;
            Some(Uuid::from_bytes(id_buf))
        } else {
            None
        };

        let correlation_id = if flags & HAS_CORRELATION_ID != 0 {
            let mut id_buf = [0u8; 8];
            read.read_exact(&mut id_buf)?;
            Some(u64::from_le_bytes(id_buf))
        } else {
            None
        };

        let (payload_length, _) = read_u32(read)?;

        let checksum = if flags & HAS_CHECKSUM != 0 {
            let mut checksum_buf = [0u8; 1];
            read.read_exact(&mut checksum_buf)?;
            Some(checksum_buf[0])
        } else {
            None
        };

        let mut raw_payload = vec![0u8; payload_length as usize];
        read.read_exact(&mut raw_payload)?;
        let payload = compressor.decompress(&raw_payload)?;

        if let Some(expected) = checksum {
            ensure!(
                xor_checksum(&payload) == expected,
                Framing,
                "payload checksum mismatch: expected {:#04x}",
                expected,
            );
        }

        Ok(Frame {
            header: FrameHeader {
                message_type,
                schema_id,
                correlation_id,
                payload_length: payload.len() as u32,
                checksum,
            },
            payload,
        })
    }
}

fn xor_checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc ^ b)
}

/// Concatenate frames' wire representations into one buffer, e.g. for a
/// transport that batches several frames into a single write.
pub fn combine(frames: &[Frame], compressor: &dyn Compressor) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    for frame in frames {
        frame.write_to(&mut buf, compressor)?;
    }
    Ok(buf)
}

/// Total wire length of the frame starting at `bytes[0]`, or `None` if
/// `bytes` does not yet hold a complete header plus payload. Pure
/// length inspection — never partially consumes `bytes` the way driving
/// `Frame::read_from` over a short slice would, which is what lets
/// [`split`] leave a partial tail frame untouched instead of erroring on
/// it (§5's "a short read is reported as need more bytes rather than an
/// error, so the caller can retry when more data arrives").
fn frame_len(bytes: &[u8]) -> Option<usize> {
    if bytes.len() < 2 {
        return None;
    }
    let flags = bytes[0];
    let mut pos = 2usize;
    if flags & HAS_SCHEMA_ID != 0 {
        pos += 16;
    }
    if flags & HAS_CORRELATION_ID != 0 {
        pos += 8;
    }
    if bytes.len() < pos + 4 {
        return None;
    }
    let payload_length = u32::from_le_bytes(bytes[pos..pos + 4].try_into().unwrap()) as usize;
    pos += 4;
    if flags & HAS_CHECKSUM != 0 {
        pos += 1;
    }
    if bytes.len() < pos {
        return None;
    }
    let total = pos.checked_add(payload_length)?;
    if bytes.len() < total {
        return None;
    }
    Some(total)
}

/// Parse a buffer containing zero or more back-to-back frames. Returns
/// every complete frame found plus the number of bytes they occupied; a
/// trailing partial frame (not enough bytes yet for its declared payload
/// length) is left unconsumed rather than treated as an error, so a
/// caller reading off a byte stream can buffer the remainder and retry
/// once more bytes arrive, per §5's resumable-decoding requirement.
pub fn split(bytes: &[u8], compressor: &dyn Compressor) -> Result<(Vec<Frame>, usize)> {
    let mut frames = Vec::new();
    let mut offset = 0usize;
    while offset < bytes.len() {
        let Some(len) = frame_len(&bytes[offset..]) else {
            break;
        };
        let frame = Frame::read_from(&mut &bytes[offset..offset + len], compressor)?;
        frames.push(frame);
        offset += len;
    }
    Ok((frames, offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_without_schema_id_or_checksum() {
        let frame = Frame::new(MessageType::Event, None, b"hello".to_vec());
        let mut buf = Vec::new();
        frame.write_to(&mut buf, &Identity).unwrap();
        let decoded = Frame::read_from(&mut buf.as_slice(), &Identity).unwrap();
        assert_eq!(decoded.payload, b"hello");
        assert_eq!(decoded.header.schema_id, None);
    }

    #[test]
    fn roundtrip_with_schema_id_and_checksum() {
        let id = Uuid::from_bytes([7u8; 16]);
        let frame = Frame::new(MessageType::Request, Some(id), b"payload".to_vec()).with_checksum();
        let mut buf = Vec::new();
        frame.write_to(&mut buf, &Identity).unwrap();
        let decoded = Frame::read_from(&mut buf.as_slice(), &Identity).unwrap();
        assert_eq!(decoded.header.schema_id, Some(id));
        assert_eq!(decoded.payload, b"payload");
    }

    #[test]
    fn corrupted_checksum_rejected() {
        let frame = Frame::new(MessageType::Response, None, b"xyz".to_vec()).with_checksum();
        let mut buf = Vec::new();
        frame.write_to(&mut buf, &Identity).unwrap();
        let last = buf.len() - 1;
        buf[last] ^= 0xFF;
        assert!(Frame::read_from(&mut buf.as_slice(), &Identity).is_err());
    }

    #[test]
    fn correlation_id_roundtrips() {
        let frame = Frame::new(MessageType::Request, None, b"x".to_vec()).with_correlation_id(42);
        let mut buf = Vec::new();
        frame.write_to(&mut buf, &Identity).unwrap();
        let decoded = Frame::read_from(&mut buf.as_slice(), &Identity).unwrap();
        assert_eq!(decoded.header.correlation_id, Some(42));
    }

    #[test]
    fn combine_then_split_recovers_all_frames() {
        let frames = vec![
            Frame::new(MessageType::Request, None, b"a".to_vec()),
            Frame::new(MessageType::Response, None, b"bb".to_vec()),
            Frame::new(MessageType::Event, None, vec![]),
        ];
        let bytes = combine(&frames, &Identity).unwrap();
        let (recovered, consumed) = split(&bytes, &Identity).unwrap();
        assert_eq!(recovered.len(), 3);
        assert_eq!(recovered[1].payload, b"bb");
        assert_eq!(consumed, bytes.len());
    }

    /// §5: a partial tail frame is buffered, not rejected as an error.
    #[test]
    fn split_leaves_partial_tail_frame_unconsumed() {
        let frames = vec![
            Frame::new(MessageType::Event, None, b"one".to_vec()),
            Frame::new(MessageType::Event, None, b"two".to_vec()),
        ];
        let mut bytes = combine(&frames, &Identity).unwrap();
        let whole_len = bytes.len();
        bytes.truncate(whole_len - 2); // chop the last frame's tail off

        let (recovered, consumed) = split(&bytes, &Identity).unwrap();
        assert_eq!(recovered.len(), 1);
        assert_eq!(recovered[0].payload, b"one");
        assert!(consumed < bytes.len());

        // feeding the rest back in, once it's arrived, completes the frame
        let mut rest = bytes[consumed..].to_vec();
        rest.extend_from_slice(&combine(&frames, &Identity).unwrap()[whole_len - 2..]);
        let (recovered2, consumed2) = split(&rest, &Identity).unwrap();
        assert_eq!(recovered2.len(), 1);
        assert_eq!(recovered2[0].payload, b"two");
        assert_eq!(consumed2, rest.len());
    }

    #[test]
    fn split_empty_buffer_is_empty() {
        let (recovered, consumed) = split(&[], &Identity).unwrap();
        assert!(recovered.is_empty());
        assert_eq!(consumed, 0);
    }
}
