//! Whole-frame collaborator interfaces: a `Provider` moves [`Frame`]s
//! across some transport (a pipe, a shared-memory ring, an in-process
//! queue for tests) without knowing anything about the schema or
//! payload it's carrying. [`provider::in_memory`] is the one concrete
//! implementation this crate ships; an OS-backed `PipeProvider` or
//! `SharedMemoryProvider` is the kind of thing a consumer builds over
//! [`crate::platform::NamedPipePlatform`]/[`crate::platform::SharedMemoryPlatform`]
//! against its own platform primitives.

pub mod in_memory;

use crate::error::Result;
use crate::frame::Frame;

/// A duplex channel that moves whole frames. Implementations are free
/// to block on `send`/`recv`; callers that need non-blocking behavior
/// should pair this with their own polling thread, the way the
/// in-memory provider's tests do.
pub trait Provider {
    fn send(&self, frame: Frame) -> Result<()>;
    fn recv(&self) -> Result<Frame>;
    fn try_recv(&self) -> Result<Option<Frame>>;
}

/// A provider backed by a named pipe or similar byte-stream transport,
/// where frame boundaries are recovered by reading exactly
/// `payload_length` bytes rather than relying on message framing from
/// the OS. A concrete implementation would own the `Read + Write`
/// handle and call [`crate::frame::Frame::read_from`]/`write_to`
/// directly.
pub trait PipeProvider: Provider {
    /// Best-effort hint at how many bytes are currently buffered and
    /// unread, for a caller deciding whether to poll again.
    fn bytes_available(&self) -> Result<usize>;
}

/// A provider backed by a shared-memory region plus some out-of-band
/// signaling (an eventfd, a futex, a condvar over a mapped header).
/// `region_len` is the size of the underlying mapping, useful for a
/// caller sizing [`crate::Schema`]-driven layouts against it.
pub trait SharedMemoryProvider: Provider {
    fn region_len(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::in_memory::InMemoryProvider;
    use super::*;
    use crate::frame::MessageType;

    #[test]
    fn provider_trait_object_is_usable() {
        let (a, _b) = InMemoryProvider::pair();
        let provider: &dyn Provider = &a;
        assert!(provider.try_recv().unwrap().is_none());
        let _ = MessageType::Event;
    }
}
