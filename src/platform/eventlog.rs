// EventReport - platform/eventlog.rs
//
// Native event-log source over the Windows legacy event-log API
// (OpenEventLogW / ReadEventLogW / CloseEventLog), local or on a remote
// host via RPC.
//
// Reads are EVENTLOG_SEQUENTIAL_READ | EVENTLOG_FORWARDS_READ: oldest first,
// one buffer-full of EVENTLOGRECORDs per batch. The buffer parser below is
// plain byte handling and is compiled (and tested) on every platform.
//
// # Platform support
// On non-Windows targets `open` always fails with
// `ConnectionFailure::Unsupported` so the rest of the code compiles unchanged.
//
// # Channel validation
// OpenEventLogW silently falls back to the Application log when asked for a
// channel that does not exist. Before opening, the channel's registration key
// under SYSTEM\CurrentControlSet\Services\EventLog is looked up (on the
// target host) and a missing key is reported as `ChannelNotFound`. If the
// registry itself cannot be reached the check is skipped and the open
// proceeds.

use crate::core::model::RawRecord;
use crate::core::source::{LogHandle, LogSource};
use crate::util::constants;
use crate::util::error::{ConnectionError, ReadError};

// =============================================================================
// EVENTLOGRECORD layout
// =============================================================================

/// 'LfLe', stored in the `Reserved` field of every record.
const RECORD_SIGNATURE: u32 = 0x654C_664C;

/// Size of the fixed part of EVENTLOGRECORD; SourceName follows it.
const RECORD_HEADER_LEN: usize = 56;

const OFF_LENGTH: usize = 0;
const OFF_RESERVED: usize = 4;
const OFF_RECORD_NUMBER: usize = 8;
const OFF_TIME_GENERATED: usize = 12;
const OFF_EVENT_ID: usize = 20;
const OFF_EVENT_TYPE: usize = 24;
const OFF_NUM_STRINGS: usize = 26;
const OFF_EVENT_CATEGORY: usize = 28;
const OFF_STRING_OFFSET: usize = 36;

fn read_u16(buf: &[u8], at: usize) -> Option<u16> {
    buf.get(at..at + 2).map(|b| u16::from_le_bytes([b[0], b[1]]))
}

fn read_u32(buf: &[u8], at: usize) -> Option<u32> {
    buf.get(at..at + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

/// Read a NUL-terminated UTF-16LE string starting at `at`.
/// Returns the string and the offset just past its terminator.
fn read_wide_str(buf: &[u8], at: usize) -> Option<(String, usize)> {
    let mut units = Vec::new();
    let mut pos = at;
    loop {
        let unit = read_u16(buf, pos)?;
        pos += 2;
        if unit == 0 {
            break;
        }
        units.push(unit);
    }
    Some((String::from_utf16_lossy(&units), pos))
}

fn corrupt(offset: usize, what: &str) -> ReadError {
    ReadError::new(format!("malformed event record at byte {offset}: {what}"))
}

/// Parse one ReadEventLogW buffer into raw records, in buffer order.
///
/// A structurally broken record (bad signature, length past the end of the
/// buffer) fails the whole batch: the read cursor has already moved past it
/// and there is no way to resynchronise.
pub fn parse_record_buffer(buf: &[u8]) -> Result<Vec<RawRecord>, ReadError> {
    let mut records = Vec::new();
    let mut offset = 0;

    while offset < buf.len() {
        let length = read_u32(buf, offset + OFF_LENGTH)
            .ok_or_else(|| corrupt(offset, "truncated length"))? as usize;
        if length < RECORD_HEADER_LEN || offset + length > buf.len() {
            return Err(corrupt(offset, "record length out of bounds"));
        }
        let rec = &buf[offset..offset + length];

        if read_u32(rec, OFF_RESERVED) != Some(RECORD_SIGNATURE) {
            return Err(corrupt(offset, "missing record signature"));
        }

        let header = |at: usize| read_u32(rec, at).ok_or_else(|| corrupt(offset, "truncated header"));
        let header16 =
            |at: usize| read_u16(rec, at).ok_or_else(|| corrupt(offset, "truncated header"));

        let record_number = header(OFF_RECORD_NUMBER)?;
        let time_generated = header(OFF_TIME_GENERATED)?;
        let event_code = header(OFF_EVENT_ID)?;
        let event_type = header16(OFF_EVENT_TYPE)?;
        let num_strings = header16(OFF_NUM_STRINGS)?;
        let category = header16(OFF_EVENT_CATEGORY)?;
        let string_offset = header(OFF_STRING_OFFSET)? as usize;

        let (source, _) = read_wide_str(rec, RECORD_HEADER_LEN)
            .ok_or_else(|| corrupt(offset, "unterminated source name"))?;

        let mut inserts = Vec::with_capacity(usize::from(num_strings));
        let mut pos = string_offset;
        for _ in 0..num_strings {
            let (insert, next) = read_wide_str(rec, pos)
                .ok_or_else(|| corrupt(offset, "unterminated string insert"))?;
            inserts.push(insert);
            pos = next;
        }

        records.push(RawRecord {
            record_number,
            time_generated: i64::from(time_generated),
            event_code,
            event_type,
            category,
            source,
            inserts,
        });

        offset += length;
    }

    Ok(records)
}

// =============================================================================
// NativeEventLog
// =============================================================================

/// The operating system's event log.
#[derive(Debug, Clone)]
pub struct NativeEventLog {
    read_buffer_bytes: usize,
}

impl NativeEventLog {
    pub fn new(read_buffer_bytes: usize) -> Self {
        Self {
            read_buffer_bytes: read_buffer_bytes
                .clamp(constants::MIN_READ_BUFFER_BYTES, constants::MAX_READ_BUFFER_BYTES),
        }
    }
}

impl Default for NativeEventLog {
    fn default() -> Self {
        Self::new(constants::DEFAULT_READ_BUFFER_BYTES)
    }
}

/// Open handle on a native event log.
#[derive(Debug)]
pub struct NativeHandle {
    #[cfg(target_os = "windows")]
    raw: ffi::Handle,
    #[cfg_attr(not(target_os = "windows"), allow(dead_code))]
    buffer: Vec<u8>,
}

// =============================================================================
// Windows FFI declarations
// =============================================================================

/// Windows-only FFI block for the event-log and registry calls we need.
/// Everything in this block is `unsafe` by nature.
#[cfg(target_os = "windows")]
mod ffi {
    pub type Handle = *mut std::ffi::c_void;
    pub type Hkey = *mut std::ffi::c_void;

    pub const EVENTLOG_SEQUENTIAL_READ: u32 = 0x0001;
    pub const EVENTLOG_FORWARDS_READ: u32 = 0x0004;

    pub const ERROR_FILE_NOT_FOUND: u32 = 2;
    pub const ERROR_HANDLE_EOF: u32 = 38;
    pub const ERROR_INSUFFICIENT_BUFFER: u32 = 122;

    // (HKEY)(ULONG_PTR)(LONG)0x80000002, sign-extended.
    pub const HKEY_LOCAL_MACHINE: Hkey = 0x8000_0002_u32 as i32 as isize as Hkey;
    pub const KEY_READ: u32 = 0x2_0019;

    #[link(name = "Advapi32")]
    extern "system" {
        pub fn OpenEventLogW(lp_unc_server_name: *const u16, lp_source_name: *const u16) -> Handle;

        pub fn ReadEventLogW(
            h_event_log: Handle,
            dw_read_flags: u32,
            dw_record_offset: u32,
            lp_buffer: *mut std::ffi::c_void,
            n_number_of_bytes_to_read: u32,
            pn_bytes_read: *mut u32,
            pn_min_number_of_bytes_needed: *mut u32,
        ) -> i32;

        pub fn CloseEventLog(h_event_log: Handle) -> i32;

        pub fn RegConnectRegistryW(lp_machine_name: *const u16, h_key: Hkey, phk_result: *mut Hkey) -> i32;

        pub fn RegOpenKeyExW(
            h_key: Hkey,
            lp_sub_key: *const u16,
            ul_options: u32,
            sam_desired: u32,
            phk_result: *mut Hkey,
        ) -> i32;

        pub fn RegCloseKey(h_key: Hkey) -> i32;
    }

    #[link(name = "Kernel32")]
    extern "system" {
        pub fn GetLastError() -> u32;

        pub fn FormatMessageW(
            dw_flags: u32,
            lp_source: *const std::ffi::c_void,
            dw_message_id: u32,
            dw_language_id: u32,
            lp_buffer: *mut u16,
            n_size: u32,
            arguments: *mut std::ffi::c_void,
        ) -> u32;

        pub fn LocalFree(h_mem: *mut std::ffi::c_void) -> *mut std::ffi::c_void;
    }
}

/// NUL-terminated UTF-16 copy of `s`.
#[cfg(target_os = "windows")]
fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

/// `None` means the local machine.
#[cfg(target_os = "windows")]
fn server_name(host: &str) -> Option<Vec<u16>> {
    let host = host.trim();
    if host.is_empty()
        || host.eq_ignore_ascii_case("localhost")
        || host == "."
        || host == "127.0.0.1"
    {
        None
    } else if host.starts_with("\\\\") {
        Some(wide(host))
    } else {
        Some(wide(&format!("\\\\{host}")))
    }
}

/// Translate a Win32 error code to a human-readable string.
#[cfg(target_os = "windows")]
fn win32_error_message(code: u32) -> String {
    // FORMAT_MESSAGE_ALLOCATE_BUFFER | FORMAT_MESSAGE_FROM_SYSTEM | FORMAT_MESSAGE_IGNORE_INSERTS
    const FLAGS: u32 = 0x0000_0100 | 0x0000_1000 | 0x0000_0200;

    let mut buf: *mut u16 = std::ptr::null_mut();
    // SAFETY: with ALLOCATE_BUFFER, lp_buffer receives a LocalAlloc'd pointer
    // which we free below.
    let len = unsafe {
        ffi::FormatMessageW(
            FLAGS,
            std::ptr::null(),
            code,
            0,
            std::ptr::addr_of_mut!(buf) as *mut u16,
            0,
            std::ptr::null_mut(),
        )
    };
    if len == 0 || buf.is_null() {
        return String::new();
    }
    // SAFETY: FormatMessageW wrote `len` UTF-16 units at `buf`.
    let text = unsafe { String::from_utf16_lossy(std::slice::from_raw_parts(buf, len as usize)) };
    unsafe {
        ffi::LocalFree(buf as *mut std::ffi::c_void);
    }
    text.trim().to_string()
}

/// Map an open-time Win32 error to a connection failure kind.
#[cfg(target_os = "windows")]
fn classify_open_error(code: u32) -> crate::util::error::ConnectionFailure {
    use crate::util::error::ConnectionFailure;
    match code {
        5 => ConnectionFailure::AccessDenied,
        // ERROR_BAD_NETPATH, ERROR_NETWORK_UNREACHABLE, ERROR_HOST_UNREACHABLE,
        // RPC_S_SERVER_UNAVAILABLE, RPC_S_CALL_FAILED_DNE, EPT_S_NOT_REGISTERED
        53 | 1231 | 1232 | 1722 | 1727 | 1753 => ConnectionFailure::HostUnreachable,
        2 | 1076 => ConnectionFailure::ChannelNotFound,
        _ => ConnectionFailure::Other {
            code,
            message: win32_error_message(code),
        },
    }
}

/// Look up the channel's registration key on `host`.
/// `Ok(false)` only when the key is definitely absent.
#[cfg(target_os = "windows")]
fn channel_registered(host: &str, channel: &str) -> Result<bool, u32> {
    let server = server_name(host);
    let mut root: ffi::Hkey = std::ptr::null_mut();
    // SAFETY: pointers are valid NUL-terminated buffers or null (local).
    let status = unsafe {
        ffi::RegConnectRegistryW(
            server.as_ref().map_or(std::ptr::null(), |s| s.as_ptr()),
            ffi::HKEY_LOCAL_MACHINE,
            &mut root,
        )
    };
    if status != 0 {
        return Err(status as u32);
    }

    let path = wide(&format!(
        "SYSTEM\\CurrentControlSet\\Services\\EventLog\\{channel}"
    ));
    let mut key: ffi::Hkey = std::ptr::null_mut();
    // SAFETY: `root` is an open key; `path` is NUL-terminated.
    let status = unsafe { ffi::RegOpenKeyExW(root, path.as_ptr(), 0, ffi::KEY_READ, &mut key) };
    unsafe {
        if status == 0 {
            ffi::RegCloseKey(key);
        }
        ffi::RegCloseKey(root);
    }

    match status as u32 {
        0 => Ok(true),
        ffi::ERROR_FILE_NOT_FOUND => Ok(false),
        other => Err(other),
    }
}

#[cfg(target_os = "windows")]
impl LogSource for NativeEventLog {
    type Handle = NativeHandle;

    fn open(&self, host: &str, channel: &str) -> Result<NativeHandle, ConnectionError> {
        use crate::util::error::ConnectionFailure;

        match channel_registered(host, channel) {
            Ok(true) => {}
            Ok(false) => {
                return Err(ConnectionError::new(host, channel, ConnectionFailure::ChannelNotFound))
            }
            Err(code) => {
                tracing::debug!(host, channel, code, "Channel registry check skipped");
            }
        }

        let server = server_name(host);
        let source = wide(channel);
        // SAFETY: both pointers are NUL-terminated buffers (or null for the
        // local machine) that outlive the call.
        let raw = unsafe {
            ffi::OpenEventLogW(
                server.as_ref().map_or(std::ptr::null(), |s| s.as_ptr()),
                source.as_ptr(),
            )
        };
        if raw.is_null() {
            let code = unsafe { ffi::GetLastError() };
            tracing::debug!(host, channel, code, "OpenEventLogW failed");
            return Err(ConnectionError::new(host, channel, classify_open_error(code)));
        }

        Ok(NativeHandle {
            raw,
            buffer: vec![0u8; self.read_buffer_bytes],
        })
    }
}

#[cfg(target_os = "windows")]
impl LogHandle for NativeHandle {
    fn read_next_batch(&mut self) -> Result<Vec<RawRecord>, ReadError> {
        loop {
            let mut read: u32 = 0;
            let mut needed: u32 = 0;
            // SAFETY: `raw` is an open event-log handle; the buffer pointer and
            // length describe `self.buffer` exactly.
            let ok = unsafe {
                ffi::ReadEventLogW(
                    self.raw,
                    ffi::EVENTLOG_SEQUENTIAL_READ | ffi::EVENTLOG_FORWARDS_READ,
                    0,
                    self.buffer.as_mut_ptr() as *mut std::ffi::c_void,
                    self.buffer.len() as u32,
                    &mut read,
                    &mut needed,
                )
            };

            if ok != 0 {
                return parse_record_buffer(&self.buffer[..read as usize]);
            }

            let code = unsafe { ffi::GetLastError() };
            match code {
                ffi::ERROR_HANDLE_EOF => return Ok(Vec::new()),
                // A single record larger than the buffer: grow and retry.
                ffi::ERROR_INSUFFICIENT_BUFFER if needed as usize > self.buffer.len() => {
                    tracing::debug!(needed, "Growing event-log read buffer");
                    self.buffer.resize(needed as usize, 0);
                }
                _ => return Err(ReadError::with_code(code, win32_error_message(code))),
            }
        }
    }

    fn close(&mut self) {
        if self.raw.is_null() {
            return;
        }
        // SAFETY: `raw` came from OpenEventLogW and is closed exactly once.
        let ok = unsafe { ffi::CloseEventLog(self.raw) };
        if ok == 0 {
            let code = unsafe { ffi::GetLastError() };
            tracing::warn!(code, "CloseEventLog failed");
        }
        self.raw = std::ptr::null_mut();
    }
}

// =============================================================================
// Non-Windows stubs
// =============================================================================

#[cfg(not(target_os = "windows"))]
impl LogSource for NativeEventLog {
    type Handle = NativeHandle;

    fn open(&self, host: &str, channel: &str) -> Result<NativeHandle, ConnectionError> {
        use crate::util::error::ConnectionFailure;
        Err(ConnectionError::new(host, channel, ConnectionFailure::Unsupported))
    }
}

#[cfg(not(target_os = "windows"))]
impl LogHandle for NativeHandle {
    fn read_next_batch(&mut self) -> Result<Vec<RawRecord>, ReadError> {
        Err(ReadError::new("native event log access is only supported on Windows"))
    }

    fn close(&mut self) {}
}
