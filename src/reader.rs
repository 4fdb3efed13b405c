// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Shared-state reader: attaches to the publisher's semaphore and segment,
// then runs acquire -> read -> release -> pause until asked to stop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, error, trace, warn};

use crate::backend::{IpcBackend, NativeBackend, SegmentHandle, SemaphoreHandle, ViewHandle};
use crate::config::ReaderConfig;
use crate::error::{AttachError, DetachError, ReadError, Resource};
use crate::shm_name;

type ViewOf<B> = <<B as IpcBackend>::Segment as SegmentHandle>::View;

/// Which resources a reader currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResourceState {
    pub view_mapped: bool,
    pub segment_open: bool,
    pub semaphore_open: bool,
}

impl ResourceState {
    pub fn all_released(&self) -> bool {
        !self.view_mapped && !self.segment_open && !self.semaphore_open
    }
}

/// Reader of the speed value published in shared memory.
///
/// Holds exactly three live resources between a successful [`attach`] and
/// [`detach`]: the semaphore handle, the segment handle and the mapped view.
/// It opens existing objects only and never unlinks them.
///
/// Reads rely on the publisher writing the `f64` in the same byte order,
/// which holds for two processes on one machine.
///
/// [`attach`]: SpeedReader::attach
/// [`detach`]: SpeedReader::detach
pub struct SpeedReader<B: IpcBackend = NativeBackend> {
    config: ReaderConfig,
    semaphore: Option<B::Semaphore>,
    segment: Option<B::Segment>,
    view: Option<ViewOf<B>>,
    holding_permit: bool,
}

impl SpeedReader<NativeBackend> {
    /// Attach to the named objects of `config` using this platform's primitives.
    pub fn attach(config: ReaderConfig) -> Result<Self, AttachError> {
        Self::attach_with(&NativeBackend, config)
    }
}

impl<B: IpcBackend> SpeedReader<B> {
    /// Attach through `backend`.
    ///
    /// Opens the semaphore, then the segment, then maps the view. If any step
    /// fails, whatever was already opened is closed before the error returns.
    pub fn attach_with(backend: &B, config: ReaderConfig) -> Result<Self, AttachError> {
        let mut semaphore = backend.open_semaphore(&config.semaphore_name).map_err(|source| {
            AttachError::SemaphoreNotFound {
                name: shm_name::platform_name(&config.semaphore_name),
                source,
            }
        })?;
        debug!(name = %config.semaphore_name, "semaphore opened");

        let mut segment = match backend.open_segment(&config.segment_name) {
            Ok(segment) => segment,
            Err(source) => {
                release_quietly(Resource::Semaphore, semaphore.close());
                return Err(AttachError::SegmentNotFound {
                    name: shm_name::platform_name(&config.segment_name),
                    source,
                });
            }
        };
        debug!(name = %config.segment_name, "segment opened");

        let view = match segment.map(config.segment_size) {
            Ok(view) => view,
            Err(source) => {
                release_quietly(Resource::Segment, segment.close());
                release_quietly(Resource::Semaphore, semaphore.close());
                return Err(AttachError::MapFailed {
                    name: shm_name::platform_name(&config.segment_name),
                    len: config.segment_size,
                    source,
                });
            }
        };
        debug!(len = config.segment_size, "segment mapped");

        Ok(Self {
            config,
            semaphore: Some(semaphore),
            segment: Some(segment),
            view: Some(view),
            holding_permit: false,
        })
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    pub fn resources(&self) -> ResourceState {
        ResourceState {
            view_mapped: self.view.as_ref().is_some_and(|v| v.is_mapped()),
            segment_open: self.segment.as_ref().is_some_and(|s| s.is_open()),
            semaphore_open: self.semaphore.as_ref().is_some_and(|s| s.is_open()),
        }
    }

    pub fn is_attached(&self) -> bool {
        let state = self.resources();
        state.view_mapped && state.segment_open && state.semaphore_open
    }

    /// Take a semaphore permit. `None` blocks until one is available.
    /// Returns `Ok(false)` on timeout; a permit already held counts as taken.
    pub fn acquire(&mut self, timeout: Option<Duration>) -> Result<bool, ReadError> {
        if self.holding_permit {
            return Ok(true);
        }
        let semaphore = self.semaphore.as_ref().ok_or(ReadError::Detached)?;
        let acquired = semaphore.wait(timeout).map_err(ReadError::from_wait)?;
        self.holding_permit = acquired;
        Ok(acquired)
    }

    /// Acquire, then read the value. On `Ok(Some(_))` the permit is still
    /// held and must be returned with [`release`](Self::release).
    /// `Ok(None)` means the wait timed out and nothing is held.
    pub fn wait_and_read(&mut self, timeout: Option<Duration>) -> Result<Option<f64>, ReadError> {
        if !self.acquire(timeout)? {
            return Ok(None);
        }
        let read = self.view.as_ref().map(|view| view.read_f64());
        match read {
            Some(Ok(speed)) => {
                trace!(speed, "value read");
                Ok(Some(speed))
            }
            Some(Err(err)) => {
                self.release_after_failed_read();
                Err(ReadError::ViewUnavailable(err))
            }
            None => {
                self.release_after_failed_read();
                Err(ReadError::Detached)
            }
        }
    }

    // The read error is what the caller needs; a failed post here leaves the
    // permit marked held so detach retries it.
    fn release_after_failed_read(&mut self) {
        if let Err(err) = self.release() {
            warn!(error = %err, "release after failed read");
        }
    }

    /// Return the held permit. No-op when nothing is held.
    pub fn release(&mut self) -> Result<(), ReadError> {
        if !self.holding_permit {
            return Ok(());
        }
        let semaphore = self.semaphore.as_ref().ok_or(ReadError::Detached)?;
        semaphore.post().map_err(ReadError::ReleaseFailed)?;
        self.holding_permit = false;
        Ok(())
    }

    /// One full acquire/read/release cycle.
    pub fn read_once(&mut self, timeout: Option<Duration>) -> Result<Option<f64>, ReadError> {
        let speed = self.wait_and_read(timeout)?;
        self.release()?;
        Ok(speed)
    }

    /// Read until `stop` is set, handing each value to `on_reading` while the
    /// permit is held. Returns the number of values read.
    ///
    /// Waits are bounded by `wait_slice` and the pause between cycles is
    /// sliced the same way, so `stop` is observed within one slice.
    /// Recoverable errors are logged and the cycle is retried; the first
    /// fatal error ends the loop.
    pub fn run<F>(&mut self, stop: &AtomicBool, mut on_reading: F) -> Result<u64, ReadError>
    where
        F: FnMut(f64),
    {
        let slice = self.config.wait_slice;
        let mut reads = 0u64;

        while !stop.load(Ordering::Acquire) {
            let speed = match self.wait_and_read(Some(slice)) {
                Ok(Some(speed)) => speed,
                Ok(None) => continue,
                Err(err) if err.is_recoverable() => {
                    warn!(error = %err, "read cycle failed, retrying");
                    continue;
                }
                Err(err) => {
                    error!(error = %err, "read loop stopped");
                    return Err(err);
                }
            };

            on_reading(speed);

            if let Err(err) = self.release() {
                error!(error = %err, "read loop stopped");
                return Err(err);
            }
            reads += 1;

            self.pause(stop);
        }

        debug!(reads, "stop requested");
        Ok(reads)
    }

    fn pause(&self, stop: &AtomicBool) {
        let step = self.config.wait_slice.max(Duration::from_millis(1));
        let deadline = Instant::now() + self.config.poll_interval;
        loop {
            if stop.load(Ordering::Acquire) {
                return;
            }
            let now = Instant::now();
            if now >= deadline {
                return;
            }
            thread::sleep((deadline - now).min(step));
        }
    }

    /// Release everything: a held permit, then the view, the segment handle
    /// and the semaphore handle, in that order. A failing step does not stop
    /// the later ones. Calling it on a detached reader is a no-op.
    pub fn detach(&mut self) -> Result<(), DetachError> {
        let mut failures = Vec::new();

        if self.holding_permit {
            if let Some(semaphore) = self.semaphore.as_ref() {
                if let Err(err) = semaphore.post() {
                    failures.push((Resource::Permit, err));
                }
            }
            self.holding_permit = false;
        }
        if let Some(mut view) = self.view.take() {
            if let Err(err) = view.unmap() {
                failures.push((Resource::View, err));
            }
        }
        if let Some(mut segment) = self.segment.take() {
            if let Err(err) = segment.close() {
                failures.push((Resource::Segment, err));
            }
        }
        if let Some(mut semaphore) = self.semaphore.take() {
            if let Err(err) = semaphore.close() {
                failures.push((Resource::Semaphore, err));
            }
        }

        if failures.is_empty() {
            debug!("detached");
            return Ok(());
        }
        for (resource, err) in &failures {
            warn!(%resource, error = %err, "cleanup step failed");
        }
        Err(DetachError { failures })
    }
}

impl<B: IpcBackend> Drop for SpeedReader<B> {
    fn drop(&mut self) {
        // Errors were already logged by detach.
        let _ = self.detach();
    }
}

fn release_quietly(resource: Resource, result: std::io::Result<()>) {
    if let Err(err) = result {
        warn!(%resource, error = %err, "cleanup after failed attach");
    }
}
