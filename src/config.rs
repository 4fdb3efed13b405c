// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors

use std::time::Duration;

use crate::shm_name::{SEM_NAME, SHM_NAME, VALUE_SIZE};

/// Compiled-in reader settings. The defaults match the publisher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderConfig {
    /// Logical semaphore name; platform namespacing is applied on open.
    pub semaphore_name: String,
    /// Logical segment name.
    pub segment_name: String,
    /// Bytes to map.
    pub segment_size: usize,
    /// Pause between read cycles.
    pub poll_interval: Duration,
    /// Upper bound on a single blocking wait, so a stop request is noticed.
    pub wait_slice: Duration,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            semaphore_name: SEM_NAME.to_string(),
            segment_name: SHM_NAME.to_string(),
            segment_size: VALUE_SIZE,
            poll_interval: Duration::from_millis(1000),
            wait_slice: Duration::from_millis(100),
        }
    }
}

impl ReaderConfig {
    pub fn with_names(mut self, semaphore: impl Into<String>, segment: impl Into<String>) -> Self {
        self.semaphore_name = semaphore.into();
        self.segment_name = segment.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_wait_slice(mut self, slice: Duration) -> Self {
        self.wait_slice = slice;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_publisher() {
        let cfg = ReaderConfig::default();
        assert_eq!(cfg.semaphore_name, "speed_sem");
        assert_eq!(cfg.segment_name, "speed_shm");
        assert_eq!(cfg.segment_size, 8);
        assert_eq!(cfg.poll_interval, Duration::from_secs(1));
        assert!(cfg.wait_slice < cfg.poll_interval);
    }

    #[test]
    fn builders_override() {
        let cfg = ReaderConfig::default()
            .with_names("a_sem", "a_shm")
            .with_poll_interval(Duration::from_millis(5))
            .with_wait_slice(Duration::from_millis(1));
        assert_eq!(cfg.semaphore_name, "a_sem");
        assert_eq!(cfg.segment_name, "a_shm");
        assert_eq!(cfg.poll_interval, Duration::from_millis(5));
        assert_eq!(cfg.wait_slice, Duration::from_millis(1));
    }
}
