//! An in-process [`Provider`] pair backed by two `SegQueue`s, one per
//! direction, so both ends live in the same address space without
//! paying for serialization or an OS transport. Useful for tests and
//! for collaborators that happen to share a process.

use crate::error::{bail, Result};
use crate::frame::Frame;
use crate::provider::Provider;
use crossbeam::queue::SegQueue;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct Shared {
    a_to_b: SegQueue<Frame>,
    b_to_a: SegQueue<Frame>,
    closed: AtomicBool,
    // parking_lot's Condvar needs a paired mutex; the mutex guards nothing
    // but the condvar's own wakeups.
    wake: Mutex<()>,
    condvar: Condvar,
}

#[derive(Copy, Clone)]
enum Side {
    A,
    B,
}

/// One end of an in-memory connection. Dropping it marks the pair
/// closed so the other end's blocking `recv` wakes up instead of
/// hanging forever.
pub struct InMemoryProvider {
    shared: Arc<Shared>,
    side: Side,
}

impl InMemoryProvider {
    /// Build a connected pair; frames sent on one are received on the
    /// other.
    pub fn pair() -> (InMemoryProvider, InMemoryProvider) {
        let shared = Arc::new(Shared {
            a_to_b: SegQueue::new(),
            b_to_a: SegQueue::new(),
            closed: AtomicBool::new(false),
            wake: Mutex::new(()),
            condvar: Condvar::new(),
        });
        (
            InMemoryProvider { shared: Arc::clone(&shared), side: Side::A },
            InMemoryProvider { shared, side: Side::B },
        )
    }

    fn closed(&self) -> bool {
        self.shared.closed.load(Ordering::Relaxed)
    }

    fn outgoing(&self) -> &SegQueue<Frame> {
        match self.side {
            Side::A => &self.shared.a_to_b,
            Side::B => &self.shared.b_to_a,
        }
    }

    fn incoming(&self) -> &SegQueue<Frame> {
        match self.side {
            Side::A => &self.shared.b_to_a,
            Side::B => &self.shared.a_to_b,
        }
    }
}

impl Provider for InMemoryProvider {
    fn send(&self, frame: Frame) -> Result<()> {
        if self.closed() {
            bail!(NotConnected, "in-memory provider closed");
        }
        self.outgoing().push(frame);
        let _guard = self.shared.wake.lock();
        self.shared.condvar.notify_all();
        Ok(())
    }

    fn recv(&self) -> Result<Frame> {
        loop {
            if let Some(frame) = self.incoming().pop() {
                return Ok(frame);
            }
            if self.closed() {
                bail!(NotConnected, "in-memory provider closed");
            }
            let mut guard = self.shared.wake.lock();
            self.shared.condvar.wait_for(&mut guard, Duration::from_millis(50));
        }
    }

    fn try_recv(&self) -> Result<Option<Frame>> {
        if let Some(frame) = self.incoming().pop() {
            return Ok(Some(frame));
        }
        if self.closed() {
            bail!(NotConnected, "in-memory provider closed");
        }
        Ok(None)
    }
}

impl Drop for InMemoryProvider {
    fn drop(&mut self) {
        self.shared.closed.store(true, Ordering::Relaxed);
        let _guard = self.shared.wake.lock();
        self.shared.condvar.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::MessageType;

    #[test]
    fn send_from_a_is_received_by_b() {
        let (a, b) = InMemoryProvider::pair();
        a.send(Frame::new(MessageType::Event, None, b"hi".to_vec())).unwrap();
        let received = b.recv().unwrap();
        assert_eq!(received.payload, b"hi");
    }

    #[test]
    fn try_recv_is_none_when_empty() {
        let (a, _b) = InMemoryProvider::pair();
        assert!(a.try_recv().unwrap().is_none());
    }

    #[test]
    fn dropping_peer_unblocks_recv_with_error() {
        let (a, b) = InMemoryProvider::pair();
        drop(a);
        assert!(b.recv().is_err());
    }

    #[test]
    fn roundtrip_both_directions() {
        let (a, b) = InMemoryProvider::pair();
        a.send(Frame::new(MessageType::Request, None, b"ping".to_vec())).unwrap();
        b.send(Frame::new(MessageType::Response, None, b"pong".to_vec())).unwrap();
        assert_eq!(b.recv().unwrap().payload, b"ping");
        assert_eq!(a.recv().unwrap().payload, b"pong");
    }
}
