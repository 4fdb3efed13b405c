// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Platform naming of named IPC objects.
// POSIX `shm_open` / `sem_open` want a single leading '/', the Win32
// object namespace takes the bare name.

/// Logical name of the semaphore guarding the speed segment.
pub const SEM_NAME: &str = "speed_sem";

/// Logical name of the speed segment.
pub const SHM_NAME: &str = "speed_shm";

/// Size of the speed segment: one native-endian `f64`.
pub const VALUE_SIZE: usize = std::mem::size_of::<f64>();

/// Produce a POSIX-safe object name (with exactly one leading '/').
pub fn make_posix_name(name: &str) -> String {
    format!("/{}", name.trim_start_matches('/'))
}

/// Produce a Win32 object name (no leading '/').
pub fn make_win32_name(name: &str) -> String {
    name.trim_start_matches('/').to_string()
}

/// Name as the current platform expects it.
pub fn platform_name(name: &str) -> String {
    #[cfg(unix)]
    {
        make_posix_name(name)
    }
    #[cfg(windows)]
    {
        make_win32_name(name)
    }
}
