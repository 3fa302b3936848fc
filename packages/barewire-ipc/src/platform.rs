//! Collaborator interface — platform IPC and memory (§6): the raw named-
//! pipe and shared-memory primitives `barewire-ipc`'s framing layer is
//! built on, plus the platform memory operations (`lock_memory`/
//! `unlock_memory`, and the optional `map_memory`/`map_file` family)
//! higher layers may need when a region is backed by shared memory.
//!
//! This crate does not ship an OS-backed implementation of these traits
//! — that is a consumer's job, against its own named-pipe and
//! shared-memory APIs. [`InMemoryPlatform`] is the implementation this
//! crate is required to carry: an in-process emulation using queued
//! byte arrays for pipes and pinned buffers for shared memory, so tests
//! and same-process collaborators never need a real OS transport.

use crate::error::{bail, ensure, Result};
use parking_lot::{Condvar, Mutex};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PipeDirection {
    In,
    Out,
    InOut,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PipeMode {
    Byte,
    Message,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum MemoryAccess {
    Read,
    Write,
    ReadWrite,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ResourceKind {
    Pipe,
    SharedMemory,
}

/// Opaque handle into a platform implementation's own bookkeeping.
/// Carries no meaning outside the implementation that issued it.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Handle(u64);

/// A named pipe, in the sense of §6: a byte-stream or message-stream
/// resource one side creates and another connects to by name.
pub trait NamedPipePlatform {
    fn create_named_pipe(
        &self,
        name: &str,
        direction: PipeDirection,
        mode: PipeMode,
        buffer_size: usize,
    ) -> Result<Handle>;
    fn connect_named_pipe(&self, name: &str, direction: PipeDirection) -> Result<Handle>;
    fn wait_for_named_pipe_connection(&self, handle: Handle, timeout_ms: Option<u64>) -> Result<()>;
    /// Returns 0 when no data is currently available; safe to call from
    /// a non-blocking poll loop.
    fn read_named_pipe(&self, handle: Handle, buf: &mut [u8]) -> Result<usize>;
    fn write_named_pipe(&self, handle: Handle, buf: &[u8]) -> Result<usize>;
    fn close_named_pipe(&self, handle: Handle) -> Result<()>;
}

/// Shared memory, in the sense of §6: a named region one side creates
/// with a fixed size and another opens, getting back its actual size
/// (which may differ if the creator rounded up to a page boundary).
pub trait SharedMemoryPlatform {
    fn create_shared_memory(&self, name: &str, size: usize, access: MemoryAccess) -> Result<Handle>;
    fn open_shared_memory(&self, name: &str, access: MemoryAccess) -> Result<(Handle, usize)>;
    fn close_shared_memory(&self, handle: Handle) -> Result<()>;
}

pub trait ResourcePlatform {
    fn resource_exists(&self, name: &str, kind: ResourceKind) -> bool;
}

/// Platform memory operations. `lock_memory`/`unlock_memory` pair
/// around a [`crate::frame`]-independent region mutation the way §5's
/// shared-resource policy describes; the `map_*` family is optional and
/// only used by higher layers that map a shared-memory handle directly
/// into the process's address space rather than copying through it.
pub trait MemoryPlatform {
    fn lock_memory(&self, handle: Handle) -> Result<()>;
    fn unlock_memory(&self, handle: Handle) -> Result<()>;

    fn map_memory(&self, _handle: Handle) -> Result<usize> {
        bail!(Framing, "map_memory is not supported by this platform");
    }
    fn unmap_memory(&self, _handle: Handle) -> Result<()> {
        bail!(Framing, "unmap_memory is not supported by this platform");
    }
    fn map_file(&self, _path: &str, _access: MemoryAccess) -> Result<Handle> {
        bail!(Framing, "map_file is not supported by this platform");
    }
    fn flush_mapped_file(&self, _handle: Handle) -> Result<()> {
        bail!(Framing, "flush_mapped_file is not supported by this platform");
    }
}

struct PipeState {
    queue: Mutex<VecDeque<u8>>,
    buffer_size: usize,
    mode: PipeMode,
    connected: AtomicBool,
    wake: Mutex<()>,
    condvar: Condvar,
}

struct SharedMemState {
    buffer: Mutex<Vec<u8>>,
    locked: AtomicBool,
}

enum Target {
    Pipe(Arc<PipeState>),
    SharedMem(Arc<SharedMemState>),
}

/// The in-memory platform required by §6: pipes are queued byte arrays,
/// shared memory regions are pinned (never-reallocated-address) `Vec<u8>`
/// buffers, both keyed by name so `create_*`/`connect_*`/`open_*` calls
/// from different handles can find the same underlying resource.
pub struct InMemoryPlatform {
    pipes: Mutex<HashMap<String, Arc<PipeState>>>,
    shared: Mutex<HashMap<String, Arc<SharedMemState>>>,
    handles: Mutex<HashMap<u64, Target>>,
    next_handle: AtomicU64,
}

impl Default for InMemoryPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryPlatform {
    pub fn new() -> Self {
        InMemoryPlatform {
            pipes: Mutex::new(HashMap::new()),
            shared: Mutex::new(HashMap::new()),
            handles: Mutex::new(HashMap::new()),
            next_handle: AtomicU64::new(1),
        }
    }

    fn issue(&self, target: Target) -> Handle {
        let id = self.next_handle.fetch_add(1, Ordering::Relaxed);
        self.handles.lock().insert(id, target);
        Handle(id)
    }

    fn pipe_for(&self, handle: Handle) -> Result<Arc<PipeState>> {
        match self.handles.lock().get(&handle.0) {
            Some(Target::Pipe(state)) => Ok(Arc::clone(state)),
            Some(Target::SharedMem(_)) => {
                bail!(NotConnected, "handle {:?} is a shared-memory handle, not a pipe", handle)
            }
            None => bail!(NotConnected, "unknown handle {:?}", handle),
        }
    }

    fn shared_for(&self, handle: Handle) -> Result<Arc<SharedMemState>> {
        match self.handles.lock().get(&handle.0) {
            Some(Target::SharedMem(state)) => Ok(Arc::clone(state)),
            Some(Target::Pipe(_)) => {
                bail!(NotConnected, "handle {:?} is a pipe handle, not shared memory", handle)
            }
            None => bail!(NotConnected, "unknown handle {:?}", handle),
        }
    }
}

impl NamedPipePlatform for InMemoryPlatform {
    fn create_named_pipe(
        &self,
        name: &str,
        _direction: PipeDirection,
        mode: PipeMode,
        buffer_size: usize,
    ) -> Result<Handle> {
        let mut pipes = self.pipes.lock();
        ensure!(
            !pipes.contains_key(name),
            NotConnected,
            "named pipe {:?} already exists",
            name,
        );
        let state = Arc::new(PipeState {
            queue: Mutex::new(VecDeque::new()),
            buffer_size,
            mode,
            connected: AtomicBool::new(false),
            wake: Mutex::new(()),
            condvar: Condvar::new(),
        });
        pipes.insert(name.to_string(), Arc::clone(&state));
        drop(pipes);
        Ok(self.issue(Target::Pipe(state)))
    }

    fn connect_named_pipe(&self, name: &str, _direction: PipeDirection) -> Result<Handle> {
        let state = self
            .pipes
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| crate::error::error!(NotConnected, "no such named pipe {:?}", name))?;
        state.connected.store(true, Ordering::Release);
        let _guard = state.wake.lock();
        state.condvar.notify_all();
        drop(_guard);
        Ok(self.issue(Target::Pipe(state)))
    }

    fn wait_for_named_pipe_connection(&self, handle: Handle, timeout_ms: Option<u64>) -> Result<()> {
        let state = self.pipe_for(handle)?;
        let deadline = timeout_ms.map(|ms| Instant::now() + Duration::from_millis(ms));
        loop {
            if state.connected.load(Ordering::Acquire) {
                return Ok(());
            }
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    bail!(NotConnected, "timed out waiting for named pipe connection");
                }
            }
            let mut guard = state.wake.lock();
            state.condvar.wait_for(&mut guard, Duration::from_millis(20));
        }
    }

    fn read_named_pipe(&self, handle: Handle, buf: &mut [u8]) -> Result<usize> {
        let state = self.pipe_for(handle)?;
        let mut queue = state.queue.lock();
        let n = buf.len().min(queue.len());
        for slot in buf.iter_mut().take(n) {
            *slot = queue.pop_front().expect("checked len above");
        }
        Ok(n)
    }

    fn write_named_pipe(&self, handle: Handle, buf: &[u8]) -> Result<usize> {
        let state = self.pipe_for(handle)?;
        let mut queue = state.queue.lock();
        ensure!(
            state.buffer_size == 0 || queue.len() + buf.len() <= state.buffer_size,
            Framing,
            "named pipe buffer of size {} would overflow",
            state.buffer_size,
        );
        if state.mode == PipeMode::Message {
            // Message-mode pipes preserve write boundaries in a real OS
            // implementation; this emulation only carries byte-stream
            // semantics, matching the `Byte` mode in both cases.
        }
        queue.extend(buf.iter().copied());
        drop(queue);
        let _guard = state.wake.lock();
        state.condvar.notify_all();
        Ok(buf.len())
    }

    fn close_named_pipe(&self, handle: Handle) -> Result<()> {
        self.handles
            .lock()
            .remove(&handle.0)
            .map(|_| ())
            .ok_or_else(|| crate::error::error!(NotConnected, "unknown handle {:?}", handle))
    }
}

impl SharedMemoryPlatform for InMemoryPlatform {
    fn create_shared_memory(&self, name: &str, size: usize, _access: MemoryAccess) -> Result<Handle> {
        let mut shared = self.shared.lock();
        ensure!(
            !shared.contains_key(name),
            NotConnected,
            "shared memory {:?} already exists",
            name,
        );
        let state = Arc::new(SharedMemState {
            buffer: Mutex::new(vec![0u8; size]),
            locked: AtomicBool::new(false),
        });
        shared.insert(name.to_string(), Arc::clone(&state));
        drop(shared);
        Ok(self.issue(Target::SharedMem(state)))
    }

    fn open_shared_memory(&self, name: &str, _access: MemoryAccess) -> Result<(Handle, usize)> {
        let state = self
            .shared
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| crate::error::error!(NotConnected, "no such shared memory {:?}", name))?;
        let actual_size = state.buffer.lock().len();
        Ok((self.issue(Target::SharedMem(state)), actual_size))
    }

    fn close_shared_memory(&self, handle: Handle) -> Result<()> {
        self.handles
            .lock()
            .remove(&handle.0)
            .map(|_| ())
            .ok_or_else(|| crate::error::error!(NotConnected, "unknown handle {:?}", handle))
    }
}

impl ResourcePlatform for InMemoryPlatform {
    fn resource_exists(&self, name: &str, kind: ResourceKind) -> bool {
        match kind {
            ResourceKind::Pipe => self.pipes.lock().contains_key(name),
            ResourceKind::SharedMemory => self.shared.lock().contains_key(name),
        }
    }
}

impl MemoryPlatform for InMemoryPlatform {
    fn lock_memory(&self, handle: Handle) -> Result<()> {
        let state = self.shared_for(handle)?;
        ensure!(
            !state.locked.swap(true, Ordering::AcqRel),
            NotConnected,
            "shared memory handle {:?} is already locked",
            handle,
        );
        Ok(())
    }

    fn unlock_memory(&self, handle: Handle) -> Result<()> {
        let state = self.shared_for(handle)?;
        ensure!(
            state.locked.swap(false, Ordering::AcqRel),
            NotConnected,
            "shared memory handle {:?} is not locked",
            handle,
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipe_round_trips_bytes() {
        let platform = InMemoryPlatform::new();
        let writer = platform
            .create_named_pipe("p", PipeDirection::InOut, PipeMode::Byte, 0)
            .unwrap();
        let reader = platform.connect_named_pipe("p", PipeDirection::InOut).unwrap();
        platform.wait_for_named_pipe_connection(writer, Some(1000)).unwrap();

        platform.write_named_pipe(writer, b"hello").unwrap();
        let mut buf = [0u8; 5];
        let n = platform.read_named_pipe(reader, &mut buf).unwrap();
        assert_eq!(n, 5);
        assert_eq!(&buf, b"hello");
    }

    #[test]
    fn read_returns_zero_when_empty() {
        let platform = InMemoryPlatform::new();
        let h = platform
            .create_named_pipe("empty", PipeDirection::In, PipeMode::Byte, 0)
            .unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(platform.read_named_pipe(h, &mut buf).unwrap(), 0);
    }

    #[test]
    fn duplicate_pipe_name_rejected() {
        let platform = InMemoryPlatform::new();
        platform
            .create_named_pipe("dup", PipeDirection::In, PipeMode::Byte, 0)
            .unwrap();
        assert!(platform
            .create_named_pipe("dup", PipeDirection::In, PipeMode::Byte, 0)
            .is_err());
    }

    #[test]
    fn shared_memory_open_reports_actual_size() {
        let platform = InMemoryPlatform::new();
        platform
            .create_shared_memory("region", 128, MemoryAccess::ReadWrite)
            .unwrap();
        let (_handle, size) = platform.open_shared_memory("region", MemoryAccess::Read).unwrap();
        assert_eq!(size, 128);
    }

    #[test]
    fn resource_exists_reflects_created_resources() {
        let platform = InMemoryPlatform::new();
        assert!(!platform.resource_exists("r", ResourceKind::SharedMemory));
        platform
            .create_shared_memory("r", 16, MemoryAccess::ReadWrite)
            .unwrap();
        assert!(platform.resource_exists("r", ResourceKind::SharedMemory));
        assert!(!platform.resource_exists("r", ResourceKind::Pipe));
    }

    #[test]
    fn lock_memory_is_exclusive() {
        let platform = InMemoryPlatform::new();
        let handle = platform
            .create_shared_memory("locked", 16, MemoryAccess::ReadWrite)
            .unwrap();
        platform.lock_memory(handle).unwrap();
        assert!(platform.lock_memory(handle).is_err());
        platform.unlock_memory(handle).unwrap();
        platform.lock_memory(handle).unwrap();
    }

    #[test]
    fn map_memory_is_unsupported_by_default() {
        let platform = InMemoryPlatform::new();
        let handle = platform
            .create_shared_memory("m", 16, MemoryAccess::ReadWrite)
            .unwrap();
        assert!(platform.map_memory(handle).is_err());
    }
}
