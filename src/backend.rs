// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// The contract a reader needs from an OS: open a named semaphore and a named
// segment, map a view, and release all three. `NativeBackend` binds it to
// the platform primitives of this build.

use std::io;
use std::time::Duration;

use crate::{MappedView, NamedSemaphore, SharedSegment};

pub trait SemaphoreHandle {
    /// Take a permit. `Ok(false)` means `timeout` elapsed first.
    fn wait(&self, timeout: Option<Duration>) -> io::Result<bool>;
    /// Return one permit.
    fn post(&self) -> io::Result<()>;
    fn close(&mut self) -> io::Result<()>;
    fn is_open(&self) -> bool;
}

pub trait SegmentHandle {
    type View: ViewHandle;

    fn map(&self, len: usize) -> io::Result<Self::View>;
    fn close(&mut self) -> io::Result<()>;
    fn is_open(&self) -> bool;
}

pub trait ViewHandle {
    fn read_f64(&self) -> io::Result<f64>;
    fn unmap(&mut self) -> io::Result<()>;
    fn is_mapped(&self) -> bool;
}

/// Opens existing named objects. Implementations must never create them.
pub trait IpcBackend {
    type Semaphore: SemaphoreHandle;
    type Segment: SegmentHandle;

    fn open_semaphore(&self, name: &str) -> io::Result<Self::Semaphore>;
    fn open_segment(&self, name: &str) -> io::Result<Self::Segment>;
}

/// POSIX `sem_open`/`shm_open`/`mmap` or Win32 semaphore/file mapping,
/// depending on the target.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeBackend;

impl IpcBackend for NativeBackend {
    type Semaphore = NamedSemaphore;
    type Segment = SharedSegment;

    fn open_semaphore(&self, name: &str) -> io::Result<NamedSemaphore> {
        NamedSemaphore::open(name)
    }

    fn open_segment(&self, name: &str) -> io::Result<SharedSegment> {
        SharedSegment::open(name)
    }
}

fn to_millis(timeout: Option<Duration>) -> Option<u64> {
    timeout.map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

impl SemaphoreHandle for NamedSemaphore {
    fn wait(&self, timeout: Option<Duration>) -> io::Result<bool> {
        NamedSemaphore::wait(self, to_millis(timeout))
    }

    fn post(&self) -> io::Result<()> {
        NamedSemaphore::post(self, 1)
    }

    fn close(&mut self) -> io::Result<()> {
        NamedSemaphore::close(self)
    }

    fn is_open(&self) -> bool {
        NamedSemaphore::is_open(self)
    }
}

impl SegmentHandle for SharedSegment {
    type View = MappedView;

    fn map(&self, len: usize) -> io::Result<MappedView> {
        SharedSegment::map(self, len)
    }

    fn close(&mut self) -> io::Result<()> {
        SharedSegment::close(self)
    }

    fn is_open(&self) -> bool {
        SharedSegment::is_open(self)
    }
}

impl ViewHandle for MappedView {
    fn read_f64(&self) -> io::Result<f64> {
        MappedView::read_f64(self)
    }

    fn unmap(&mut self) -> io::Result<()> {
        MappedView::unmap(self)
    }

    fn is_mapped(&self) -> bool {
        MappedView::is_mapped(self)
    }
}
