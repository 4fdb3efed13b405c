// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// POSIX implementation of the named semaphore, shared segment and mapped
// view: `sem_open` / `shm_open` / `mmap`.

use std::ffi::CString;
use std::io;
use std::ptr;

use crate::shm_name;

const PERMS: libc::mode_t = 0o666; // S_IRUSR|S_IWUSR|S_IRGRP|S_IWGRP|S_IROTH|S_IWOTH

fn posix_c_name(name: &str) -> io::Result<(String, CString)> {
    if name.is_empty() {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "name is empty"));
    }
    let posix_name = shm_name::make_posix_name(name);
    let c_name = CString::new(posix_name.as_bytes())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    Ok((posix_name, c_name))
}

fn closed(what: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, format!("{what} is closed"))
}

// ---------------------------------------------------------------------------
// PlatformSemaphore: POSIX named semaphore
// ---------------------------------------------------------------------------

pub struct PlatformSemaphore {
    sem: *mut libc::sem_t, // null once closed
    name: String,          // POSIX name (with leading '/')
}

// Safety: sem_t operations are thread-safe and the handle is process-wide.
unsafe impl Send for PlatformSemaphore {}
unsafe impl Sync for PlatformSemaphore {}

impl PlatformSemaphore {
    /// Open an existing named semaphore. Never creates.
    pub fn open(name: &str) -> io::Result<Self> {
        let (posix_name, c_name) = posix_c_name(name)?;
        let sem = unsafe { libc::sem_open(c_name.as_ptr(), 0) };
        if sem == libc::SEM_FAILED {
            return Err(io::Error::last_os_error());
        }
        Ok(Self {
            sem,
            name: posix_name,
        })
    }

    /// Create a named semaphore exclusively with `initial` permits.
    pub fn create(name: &str, initial: u32) -> io::Result<Self> {
        let (posix_name, c_name) = posix_c_name(name)?;
        let sem = unsafe {
            libc::sem_open(
                c_name.as_ptr(),
                libc::O_CREAT | libc::O_EXCL,
                PERMS as libc::c_uint,
                initial as libc::c_uint,
            )
        };
        if sem == libc::SEM_FAILED {
            return Err(io::Error::last_os_error());
        }
        Ok(Self {
            sem,
            name: posix_name,
        })
    }

    fn raw(&self) -> io::Result<*mut libc::sem_t> {
        if self.sem.is_null() {
            return Err(closed("semaphore"));
        }
        Ok(self.sem)
    }

    /// Wait for a permit. `None` blocks indefinitely.
    /// Returns `Ok(false)` if `timeout_ms` elapsed first.
    ///
    /// An untimed wait interrupted by a signal reports `ErrorKind::Interrupted`.
    pub fn wait(&self, timeout_ms: Option<u64>) -> io::Result<bool> {
        let sem = self.raw()?;
        match timeout_ms {
            None => {
                if unsafe { libc::sem_wait(sem) } != 0 {
                    return Err(io::Error::last_os_error());
                }
                Ok(true)
            }
            Some(ms) => timed_wait(sem, ms),
        }
    }

    /// Release `count` permits.
    pub fn post(&self, count: u32) -> io::Result<()> {
        let sem = self.raw()?;
        for _ in 0..count {
            if unsafe { libc::sem_post(sem) } != 0 {
                return Err(io::Error::last_os_error());
            }
        }
        Ok(())
    }

    /// Close this process's handle. The named object itself survives.
    pub fn close(&mut self) -> io::Result<()> {
        let sem = std::mem::replace(&mut self.sem, ptr::null_mut());
        if sem.is_null() {
            return Ok(());
        }
        if unsafe { libc::sem_close(sem) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        !self.sem.is_null()
    }

    /// POSIX name (with leading '/').
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Remove a named semaphore by name (static helper).
    pub fn unlink_by_name(name: &str) {
        if let Ok((_, c_name)) = posix_c_name(name) {
            unsafe { libc::sem_unlink(c_name.as_ptr()) };
        }
    }
}

impl Drop for PlatformSemaphore {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(not(any(target_os = "macos", target_os = "ios")))]
fn timed_wait(sem: *mut libc::sem_t, timeout_ms: u64) -> io::Result<bool> {
    let mut ts: libc::timespec = unsafe { std::mem::zeroed() };
    unsafe { libc::clock_gettime(libc::CLOCK_REALTIME, &mut ts) };
    let ns_total = ts.tv_nsec as u64 + (timeout_ms % 1000) * 1_000_000;
    ts.tv_sec += (timeout_ms / 1000) as libc::time_t + (ns_total / 1_000_000_000) as libc::time_t;
    ts.tv_nsec = (ns_total % 1_000_000_000) as _;
    loop {
        if unsafe { libc::sem_timedwait(sem, &ts) } == 0 {
            return Ok(true);
        }
        let err = io::Error::last_os_error();
        match err.raw_os_error() {
            Some(libc::ETIMEDOUT) => return Ok(false),
            // absolute deadline, retrying does not extend it
            Some(libc::EINTR) => continue,
            _ => return Err(err),
        }
    }
}

// macOS lacks sem_timedwait: emulate via sem_trywait polling.
#[cfg(any(target_os = "macos", target_os = "ios"))]
fn timed_wait(sem: *mut libc::sem_t, timeout_ms: u64) -> io::Result<bool> {
    use std::time::{Duration, Instant};

    const POLL_STEP: Duration = Duration::from_millis(1);

    let deadline = Instant::now() + Duration::from_millis(timeout_ms);
    loop {
        if unsafe { libc::sem_trywait(sem) } == 0 {
            return Ok(true);
        }
        let err = io::Error::last_os_error();
        match err.raw_os_error() {
            Some(libc::EAGAIN) => {}
            Some(libc::EINTR) => continue,
            _ => return Err(err),
        }
        if Instant::now() >= deadline {
            return Ok(false);
        }
        std::thread::sleep(POLL_STEP);
    }
}

// ---------------------------------------------------------------------------
// PlatformSegment: POSIX shared memory object (file descriptor)
// ---------------------------------------------------------------------------

pub struct PlatformSegment {
    fd: libc::c_int, // -1 once closed
    name: String,    // POSIX name (with leading '/')
}

impl PlatformSegment {
    /// Open an existing shared memory object read/write. Never creates.
    pub fn open(name: &str) -> io::Result<Self> {
        let (posix_name, c_name) = posix_c_name(name)?;
        let fd = unsafe { libc::shm_open(c_name.as_ptr(), libc::O_RDWR, PERMS as libc::c_uint) };
        if fd == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(Self {
            fd,
            name: posix_name,
        })
    }

    /// Create a shared memory object exclusively and size it to `size` bytes.
    pub fn create(name: &str, size: usize) -> io::Result<Self> {
        if size == 0 {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "size is 0"));
        }
        let (posix_name, c_name) = posix_c_name(name)?;
        let fd = unsafe {
            libc::shm_open(
                c_name.as_ptr(),
                libc::O_RDWR | libc::O_CREAT | libc::O_EXCL,
                PERMS as libc::c_uint,
            )
        };
        if fd == -1 {
            return Err(io::Error::last_os_error());
        }

        // Ensure permissions regardless of umask
        unsafe { libc::fchmod(fd, PERMS) };

        if unsafe { libc::ftruncate(fd, size as libc::off_t) } != 0 {
            let err = io::Error::last_os_error();
            unsafe {
                libc::close(fd);
                libc::shm_unlink(c_name.as_ptr());
            }
            return Err(err);
        }

        Ok(Self {
            fd,
            name: posix_name,
        })
    }

    fn raw(&self) -> io::Result<libc::c_int> {
        if self.fd == -1 {
            return Err(closed("segment"));
        }
        Ok(self.fd)
    }

    /// Current size of the object in bytes.
    pub fn size(&self) -> io::Result<usize> {
        let fd = self.raw()?;
        let mut st: libc::stat = unsafe { std::mem::zeroed() };
        if unsafe { libc::fstat(fd, &mut st) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(st.st_size as usize)
    }

    /// Map the first `len` bytes read/write, shared with other processes.
    ///
    /// Fails with `InvalidData` when the object is smaller than `len`:
    /// touching pages past the end would raise SIGBUS.
    pub fn map(&self, len: usize) -> io::Result<PlatformView> {
        if len == 0 {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "size is 0"));
        }
        let fd = self.raw()?;
        let size = self.size()?;
        if size < len {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("segment {} is {size} bytes, need {len}", self.name),
            ));
        }

        let mem = unsafe {
            libc::mmap(
                ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd,
                0,
            )
        };
        if mem == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }

        Ok(PlatformView {
            mem: mem as *mut u8,
            len,
        })
    }

    /// Close the descriptor. The named object itself survives.
    pub fn close(&mut self) -> io::Result<()> {
        let fd = std::mem::replace(&mut self.fd, -1);
        if fd == -1 {
            return Ok(());
        }
        if unsafe { libc::close(fd) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.fd != -1
    }

    /// POSIX name (with leading '/').
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Remove a named shm object by name (static helper).
    pub fn unlink_by_name(name: &str) {
        if let Ok((_, c_name)) = posix_c_name(name) {
            unsafe { libc::shm_unlink(c_name.as_ptr()) };
        }
    }
}

impl Drop for PlatformSegment {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

// ---------------------------------------------------------------------------
// PlatformView: mmap'd range of a segment
// ---------------------------------------------------------------------------

pub struct PlatformView {
    mem: *mut u8, // null once unmapped
    len: usize,
}

// Safety: the mapping is process-shared; access is serialized by the caller.
unsafe impl Send for PlatformView {}
unsafe impl Sync for PlatformView {}

impl PlatformView {
    pub fn as_ptr(&self) -> *const u8 {
        self.mem
    }

    pub fn as_mut_ptr(&self) -> *mut u8 {
        self.mem
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_mapped(&self) -> bool {
        !self.mem.is_null()
    }

    pub fn unmap(&mut self) -> io::Result<()> {
        let mem = std::mem::replace(&mut self.mem, ptr::null_mut());
        if mem.is_null() {
            return Ok(());
        }
        if unsafe { libc::munmap(mem as *mut libc::c_void, self.len) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

impl Drop for PlatformView {
    fn drop(&mut self) {
        let _ = self.unmap();
    }
}
