// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Windows implementation of the named semaphore, shared segment and mapped
// view: kernel semaphore objects and pagefile-backed file mappings.

use std::io;
use std::ptr;

use windows_sys::Win32::Foundation::{CloseHandle, HANDLE};

use crate::shm_name;

/// Encode a name as a null-terminated wide string for Win32 APIs.
fn to_wide(name: &str) -> io::Result<Vec<u16>> {
    let name = shm_name::make_win32_name(name);
    if name.is_empty() {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "name is empty"));
    }
    Ok(name.encode_utf16().chain(std::iter::once(0)).collect())
}

fn closed(what: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, format!("{what} is closed"))
}

fn close_handle(handle: &mut HANDLE) -> io::Result<()> {
    let h = std::mem::replace(handle, ptr::null_mut());
    if h.is_null() {
        return Ok(());
    }
    if unsafe { CloseHandle(h) } == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// PlatformSemaphore: Windows named semaphore
// ---------------------------------------------------------------------------

pub struct PlatformSemaphore {
    handle: HANDLE, // null once closed
    name: String,
}

unsafe impl Send for PlatformSemaphore {}
unsafe impl Sync for PlatformSemaphore {}

impl PlatformSemaphore {
    /// Open an existing named semaphore. Never creates.
    pub fn open(name: &str) -> io::Result<Self> {
        use windows_sys::Win32::Foundation::FALSE;
        use windows_sys::Win32::System::Threading::{OpenSemaphoreW, SEMAPHORE_ALL_ACCESS};

        let wide_name = to_wide(name)?;
        let handle = unsafe { OpenSemaphoreW(SEMAPHORE_ALL_ACCESS, FALSE, wide_name.as_ptr()) };
        if handle.is_null() {
            return Err(io::Error::last_os_error());
        }
        Ok(Self {
            handle,
            name: shm_name::make_win32_name(name),
        })
    }

    /// Create a named semaphore exclusively with `initial` permits.
    pub fn create(name: &str, initial: u32) -> io::Result<Self> {
        use windows_sys::Win32::Foundation::{GetLastError, ERROR_ALREADY_EXISTS};
        use windows_sys::Win32::System::Threading::CreateSemaphoreW;

        let wide_name = to_wide(name)?;
        let initial = i32::try_from(initial)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let handle =
            unsafe { CreateSemaphoreW(ptr::null(), initial, i32::MAX, wide_name.as_ptr()) };
        if handle.is_null() {
            return Err(io::Error::last_os_error());
        }
        if unsafe { GetLastError() } == ERROR_ALREADY_EXISTS {
            unsafe { CloseHandle(handle) };
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                "semaphore already exists",
            ));
        }
        Ok(Self {
            handle,
            name: shm_name::make_win32_name(name),
        })
    }

    fn raw(&self) -> io::Result<HANDLE> {
        if self.handle.is_null() {
            return Err(closed("semaphore"));
        }
        Ok(self.handle)
    }

    /// Wait for a permit. `None` blocks indefinitely.
    /// Returns `Ok(false)` if `timeout_ms` elapsed first.
    pub fn wait(&self, timeout_ms: Option<u64>) -> io::Result<bool> {
        use windows_sys::Win32::Foundation::{WAIT_OBJECT_0, WAIT_TIMEOUT};
        use windows_sys::Win32::System::Threading::{WaitForSingleObject, INFINITE};

        let handle = self.raw()?;
        let ms = match timeout_ms {
            None => INFINITE,
            Some(ms) => ms.min(u64::from(INFINITE - 1)) as u32,
        };
        match unsafe { WaitForSingleObject(handle, ms) } {
            WAIT_OBJECT_0 => Ok(true),
            WAIT_TIMEOUT => Ok(false),
            _ => Err(io::Error::last_os_error()),
        }
    }

    /// Release `count` permits.
    pub fn post(&self, count: u32) -> io::Result<()> {
        use windows_sys::Win32::System::Threading::ReleaseSemaphore;

        let handle = self.raw()?;
        let count =
            i32::try_from(count).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        if unsafe { ReleaseSemaphore(handle, count, ptr::null_mut()) } == 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// Close this process's handle. The kernel object lives on while any
    /// other process holds a handle.
    pub fn close(&mut self) -> io::Result<()> {
        close_handle(&mut self.handle)
    }

    pub fn is_open(&self) -> bool {
        !self.handle.is_null()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unlink_by_name(_name: &str) {
        // No-op on Windows: the object disappears with its last handle.
    }
}

impl Drop for PlatformSemaphore {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

// ---------------------------------------------------------------------------
// PlatformSegment: Windows file mapping object
// ---------------------------------------------------------------------------

pub struct PlatformSegment {
    handle: HANDLE, // null once closed
    name: String,
}

unsafe impl Send for PlatformSegment {}
unsafe impl Sync for PlatformSegment {}

impl PlatformSegment {
    /// Open an existing file mapping read/write. Never creates.
    pub fn open(name: &str) -> io::Result<Self> {
        use windows_sys::Win32::Foundation::FALSE;
        use windows_sys::Win32::System::Memory::{OpenFileMappingW, FILE_MAP_ALL_ACCESS};

        let wide_name = to_wide(name)?;
        let handle = unsafe { OpenFileMappingW(FILE_MAP_ALL_ACCESS, FALSE, wide_name.as_ptr()) };
        if handle.is_null() {
            return Err(io::Error::last_os_error());
        }
        Ok(Self {
            handle,
            name: shm_name::make_win32_name(name),
        })
    }

    /// Create a pagefile-backed mapping of `size` bytes exclusively.
    pub fn create(name: &str, size: usize) -> io::Result<Self> {
        use windows_sys::Win32::Foundation::{GetLastError, ERROR_ALREADY_EXISTS, INVALID_HANDLE_VALUE};
        use windows_sys::Win32::System::Memory::{CreateFileMappingW, PAGE_READWRITE, SEC_COMMIT};

        if size == 0 {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "size is 0"));
        }
        let wide_name = to_wide(name)?;
        let size = size as u64;
        let handle = unsafe {
            CreateFileMappingW(
                INVALID_HANDLE_VALUE,
                ptr::null(),
                PAGE_READWRITE | SEC_COMMIT,
                (size >> 32) as u32,
                size as u32,
                wide_name.as_ptr(),
            )
        };
        if handle.is_null() {
            return Err(io::Error::last_os_error());
        }
        if unsafe { GetLastError() } == ERROR_ALREADY_EXISTS {
            unsafe { CloseHandle(handle) };
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                "shm already exists",
            ));
        }
        Ok(Self {
            handle,
            name: shm_name::make_win32_name(name),
        })
    }

    /// Map the first `len` bytes read/write. The view keeps the mapping
    /// object alive on its own, so the handle may be closed independently.
    pub fn map(&self, len: usize) -> io::Result<PlatformView> {
        use windows_sys::Win32::System::Memory::{MapViewOfFile, FILE_MAP_ALL_ACCESS};

        if len == 0 {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "size is 0"));
        }
        if self.handle.is_null() {
            return Err(closed("segment"));
        }
        let view = unsafe { MapViewOfFile(self.handle, FILE_MAP_ALL_ACCESS, 0, 0, len) };
        if view.Value.is_null() {
            return Err(io::Error::last_os_error());
        }
        Ok(PlatformView {
            mem: view.Value as *mut u8,
            len,
        })
    }

    pub fn close(&mut self) -> io::Result<()> {
        close_handle(&mut self.handle)
    }

    pub fn is_open(&self) -> bool {
        !self.handle.is_null()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unlink_by_name(_name: &str) {
        // No-op on Windows: shm is backed by the pagefile.
    }
}

impl Drop for PlatformSegment {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

// ---------------------------------------------------------------------------
// PlatformView: MapViewOfFile range
// ---------------------------------------------------------------------------

pub struct PlatformView {
    mem: *mut u8, // null once unmapped
    len: usize,
}

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
        use windows_sys::Win32::System::Memory::{UnmapViewOfFile, MEMORY_MAPPED_VIEW_ADDRESS};

        let mem = std::mem::replace(&mut self.mem, ptr::null_mut());
        if mem.is_null() {
            return Ok(());
        }
        let addr = MEMORY_MAPPED_VIEW_ADDRESS {
            Value: mem as *mut core::ffi::c_void,
        };
        if unsafe { UnmapViewOfFile(addr) } == 0 {
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
