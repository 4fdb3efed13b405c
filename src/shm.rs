// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Cross-platform named shared memory segment and its mapped view.
// Delegates to platform::PlatformSegment / platform::PlatformView.

use std::io;
use std::ptr;

use crate::platform::{PlatformSegment, PlatformView};
use crate::shm_name::VALUE_SIZE;

/// A named, inter-process shared memory object.
///
/// Unlike a mapping, the segment handle is only a reference to the named
/// object; bytes are reached through a [`MappedView`] obtained from [`map`].
/// No header or trailer is added: `len` bytes of the view are exactly the
/// first `len` bytes of the object.
///
/// [`map`]: SharedSegment::map
pub struct SharedSegment {
    inner: PlatformSegment,
}

impl SharedSegment {
    /// Open an existing segment for read/write mapping. Never creates.
    pub fn open(name: &str) -> io::Result<Self> {
        let inner = PlatformSegment::open(name)?;
        Ok(Self { inner })
    }

    /// Create a segment of `size` bytes. Fails if it already exists.
    pub fn create(name: &str, size: usize) -> io::Result<Self> {
        let inner = PlatformSegment::create(name, size)?;
        Ok(Self { inner })
    }

    /// Map the first `len` bytes into this process.
    pub fn map(&self, len: usize) -> io::Result<MappedView> {
        let inner = self.inner.map(len)?;
        Ok(MappedView { inner })
    }

    /// Close the handle. Existing views stay valid. Calling it again is a no-op.
    pub fn close(&mut self) -> io::Result<()> {
        self.inner.close()
    }

    pub fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    /// The platform name used to open the segment.
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Remove a named segment by name without needing an open handle.
    pub fn unlink_by_name(name: &str) {
        PlatformSegment::unlink_by_name(name);
    }
}

/// A process-local view of a [`SharedSegment`].
pub struct MappedView {
    inner: PlatformView,
}

impl MappedView {
    /// Mapped length in bytes.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.len() == 0
    }

    pub fn is_mapped(&self) -> bool {
        self.inner.is_mapped()
    }

    fn check(&self, need: usize) -> io::Result<()> {
        if !self.inner.is_mapped() {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "view is unmapped"));
        }
        if self.inner.len() < need {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("view is {} bytes, need {need}", self.inner.len()),
            ));
        }
        Ok(())
    }

    /// Copy the first `N` bytes out of the view.
    pub fn read_bytes<const N: usize>(&self) -> io::Result<[u8; N]> {
        self.check(N)?;
        // Volatile: another process writes this memory behind our back.
        Ok(unsafe { ptr::read_volatile(self.inner.as_ptr() as *const [u8; N]) })
    }

    /// Copy `bytes` into the start of the view.
    pub fn write_bytes<const N: usize>(&self, bytes: [u8; N]) -> io::Result<()> {
        self.check(N)?;
        unsafe { ptr::write_volatile(self.inner.as_mut_ptr() as *mut [u8; N], bytes) };
        Ok(())
    }

    /// Interpret the first 8 bytes as a native-endian `f64`.
    pub fn read_f64(&self) -> io::Result<f64> {
        let bytes = self.read_bytes::<VALUE_SIZE>()?;
        Ok(f64::from_ne_bytes(bytes))
    }

    /// Store `value` native-endian in the first 8 bytes.
    pub fn write_f64(&self, value: f64) -> io::Result<()> {
        self.write_bytes(value.to_ne_bytes())
    }

    /// Unmap the view. Calling it again is a no-op.
    pub fn unmap(&mut self) -> io::Result<()> {
        self.inner.unmap()
    }
}
