// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors

use std::fmt;
use std::io;

use thiserror::Error;

/// Startup failure. Every variant is fatal and leaves no resource held.
#[derive(Debug, Error)]
pub enum AttachError {
    #[error("failed to open semaphore `{name}`; is the publisher running? ({source})")]
    SemaphoreNotFound {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to open shared memory `{name}`; is the publisher running? ({source})")]
    SegmentNotFound {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to map {len} bytes of shared memory `{name}` ({source})")]
    MapFailed {
        name: String,
        len: usize,
        #[source]
        source: io::Error,
    },
}

impl AttachError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> u8 {
        1
    }
}

/// Failure inside one wait/read/release cycle.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("semaphore wait interrupted by a signal")]
    Interrupted,

    #[error("semaphore wait failed: {0}")]
    WaitFailed(#[source] io::Error),

    #[error("mapped view unavailable: {0}")]
    ViewUnavailable(#[source] io::Error),

    #[error("semaphore release failed: {0}")]
    ReleaseFailed(#[source] io::Error),

    #[error("reader is detached")]
    Detached,
}

impl ReadError {
    /// Classify a failed semaphore wait.
    pub(crate) fn from_wait(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::Interrupted {
            Self::Interrupted
        } else {
            Self::WaitFailed(err)
        }
    }

    /// Whether the read loop may log this and carry on.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Interrupted)
    }
}

/// One of the OS resources a reader holds while attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Permit,
    View,
    Segment,
    Semaphore,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Resource::Permit => "held semaphore permit",
            Resource::View => "mapped view",
            Resource::Segment => "segment handle",
            Resource::Semaphore => "semaphore handle",
        };
        f.write_str(s)
    }
}

/// Cleanup steps that failed during `detach`. Every step was still attempted.
#[derive(Debug, Error)]
#[error("detach failed for {}", describe(.failures))]
pub struct DetachError {
    pub failures: Vec<(Resource, io::Error)>,
}

fn describe(failures: &[(Resource, io::Error)]) -> String {
    failures
        .iter()
        .map(|(res, err)| format!("{res} ({err})"))
        .collect::<Vec<_>>()
        .join(", ")
}
