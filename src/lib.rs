// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Reader side of a shared-memory speed feed. An external publisher creates a
// named segment holding one `f64` and a named semaphore guarding it; this
// crate opens both, maps the segment and reads the value under the semaphore.
// Same naming conventions and syscalls on POSIX (`sem_open`/`shm_open`) and
// Win32 (`OpenSemaphoreW`/`OpenFileMappingW`).

pub mod shm_name;

mod platform;

mod semaphore;
pub use semaphore::NamedSemaphore;

mod shm;
pub use shm::{MappedView, SharedSegment};

pub mod backend;
pub use backend::{IpcBackend, NativeBackend};

mod config;
pub use config::ReaderConfig;

mod error;
pub use error::{AttachError, DetachError, ReadError, Resource};

mod reader;
pub use reader::{ResourceState, SpeedReader};
