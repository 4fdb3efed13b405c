// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Cross-platform named counting semaphore.
// Delegates to platform::PlatformSemaphore (POSIX or Windows).

use std::io;

use crate::platform::PlatformSemaphore;

/// A named, inter-process counting semaphore.
///
/// On POSIX this is a `sem_open` semaphore (name with a leading '/').
/// On Windows this is a kernel semaphore object under the bare name.
pub struct NamedSemaphore {
    inner: PlatformSemaphore,
}

impl NamedSemaphore {
    /// Open an existing named semaphore for wait and post access.
    /// Fails if no such semaphore exists; never creates one.
    pub fn open(name: &str) -> io::Result<Self> {
        let inner = PlatformSemaphore::open(name)?;
        Ok(Self { inner })
    }

    /// Create a named semaphore holding `initial` permits.
    /// Fails if it already exists.
    pub fn create(name: &str, initial: u32) -> io::Result<Self> {
        let inner = PlatformSemaphore::create(name, initial)?;
        Ok(Self { inner })
    }

    /// Wait for a permit.
    ///
    /// `None` blocks indefinitely. Returns `Ok(true)` when a permit was taken,
    /// `Ok(false)` if `timeout_ms` elapsed first.
    pub fn wait(&self, timeout_ms: Option<u64>) -> io::Result<bool> {
        self.inner.wait(timeout_ms)
    }

    /// Release `count` permits.
    pub fn post(&self, count: u32) -> io::Result<()> {
        self.inner.post(count)
    }

    /// Close the handle. Calling it again is a no-op.
    pub fn close(&mut self) -> io::Result<()> {
        self.inner.close()
    }

    pub fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    /// The platform name used to open the semaphore.
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Remove the backing storage for a named semaphore.
    pub fn clear_storage(name: &str) {
        PlatformSemaphore::unlink_by_name(name);
    }
}
