//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core type but uses C-compatible representations:
//! `*mut c_char` instead of `String`, raw pointers instead of `Vec`, and
//! tagged enums with explicit discriminants. Conversion functions live here
//! to keep `lib.rs` focused on the `extern "C"` surface.

use std::ffi::{c_void, CString};
use std::os::raw::c_char;

use comet_core::{ApiError, CompletedRequest, Exchange, HttpRequest, Payload};

/// Opaque handle to one in-flight `Exchange`.
pub struct FfiExchange {
    pub(crate) inner: Exchange,
}

/// Host callback receiving each delivered comet line as a NUL-terminated
/// string, valid only for the duration of the call.
pub type FfiCometCallback = Option<extern "C" fn(line: *const c_char, user_data: *mut c_void)>;

/// A C callback plus its opaque context pointer.
pub(crate) struct HostCallback {
    func: extern "C" fn(*const c_char, *mut c_void),
    user_data: *mut c_void,
}

// The callback only runs inside `comet_exchange_tick`, on whichever thread
// the host calls that from; the pointer is never dereferenced on our side.
unsafe impl Send for HostCallback {}
unsafe impl Sync for HostCallback {}

impl HostCallback {
    pub(crate) fn new(func: extern "C" fn(*const c_char, *mut c_void), user_data: *mut c_void) -> Self {
        Self { func, user_data }
    }

    /// Lines containing an interior NUL cannot be represented and are dropped.
    pub(crate) fn call(&self, line: &str) {
        if let Ok(line) = CString::new(line) {
            (self.func)(line.as_ptr(), self.user_data);
        }
    }
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// A single HTTP header as a key-value pair of C strings.
#[repr(C)]
pub struct FfiHeader {
    pub key: *mut c_char,
    pub value: *mut c_char,
}

/// The request the host must execute, as C-compatible plain data.
///
/// `body` is null when no payload is sent. `user`/`password` are null when no
/// credentials were given. `poll_rate_ms` is 0 unless the exchange runs in
/// comet mode, in which case the host should call `comet_exchange_tick` at
/// that interval while the response streams in.
#[repr(C)]
pub struct FfiHttpRequest {
    pub method: *mut c_char,
    pub url: *mut c_char,
    pub headers: *mut FfiHeader,
    pub headers_len: u32,
    pub body: *mut c_char,
    pub is_async: bool,
    pub user: *mut c_char,
    pub password: *mut c_char,
    pub poll_rate_ms: u64,
}

impl FfiHttpRequest {
    /// Convert a core `HttpRequest` into a heap-allocated `FfiHttpRequest`.
    pub(crate) fn from_core(req: &HttpRequest, poll_rate_ms: u64) -> *mut Self {
        let body = match &req.body {
            Some(Payload::Text(text)) => to_c_string(text),
            Some(Payload::Form(_)) | None => std::ptr::null_mut(),
        };
        let (user, password) = match &req.credentials {
            Some(credentials) => (
                to_c_string(&credentials.user),
                credentials
                    .password
                    .as_deref()
                    .map_or(std::ptr::null_mut(), to_c_string),
            ),
            None => (std::ptr::null_mut(), std::ptr::null_mut()),
        };

        let (headers, headers_len) = headers_to_ffi(&req.headers);

        Box::into_raw(Box::new(FfiHttpRequest {
            method: to_c_string(req.method.as_str()),
            url: to_c_string(&req.url),
            headers,
            headers_len,
            body,
            is_async: req.async_mode,
            user,
            password,
            poll_rate_ms,
        }))
    }
}

// ---------------------------------------------------------------------------
// Response input (caller-provided, not heap-allocated by us)
// ---------------------------------------------------------------------------

/// The final response, built by the host once the transaction is done.
///
/// Any string pointer may be null and is then treated as empty; `headers` may
/// be null when `headers_len` is 0. The FFI layer reads but does not free
/// these fields.
#[repr(C)]
pub struct FfiHttpResponse {
    pub status: u16,
    pub status_text: *const c_char,
    pub headers: *const FfiHeader,
    pub headers_len: u32,
    pub body: *const c_char,
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Error category carried by `FfiCometResult`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorKind {
    None = 0,
    Status = 1,
    InvalidJson = 2,
    Serialization = 3,
    InvalidDescriptor = 4,
    Transport = 5,
    NullArgument = 6,
    Panic = 7,
}

/// Settlement outcome. On success `error_kind` is `None` and `status_text`,
/// `headers` and `body` describe the completed response; `json` (the parsed
/// body re-serialized) and `comet_tail` may be null. On failure
/// `error_message` is set and `status` holds the received status, or 0 if
/// none was received.
#[repr(C)]
pub struct FfiCometResult {
    pub error_kind: FfiErrorKind,
    pub error_message: *mut c_char,
    pub status: u16,
    pub status_text: *mut c_char,
    pub headers: *mut FfiHeader,
    pub headers_len: u32,
    pub body: *mut c_char,
    pub json: *mut c_char,
    pub comet_tail: *mut c_char,
}

impl FfiCometResult {
    fn empty(error_kind: FfiErrorKind, error_message: *mut c_char) -> *mut Self {
        Box::into_raw(Box::new(FfiCometResult {
            error_kind,
            error_message,
            status: 0,
            status_text: std::ptr::null_mut(),
            headers: std::ptr::null_mut(),
            headers_len: 0,
            body: std::ptr::null_mut(),
            json: std::ptr::null_mut(),
            comet_tail: std::ptr::null_mut(),
        }))
    }

    pub(crate) fn ok(done: CompletedRequest) -> *mut Self {
        let json = done
            .json
            .as_ref()
            .map_or(std::ptr::null_mut(), |value| to_c_string(&value.to_string()));
        let (headers, headers_len) = headers_to_ffi(&done.headers);
        Box::into_raw(Box::new(FfiCometResult {
            error_kind: FfiErrorKind::None,
            error_message: std::ptr::null_mut(),
            status: done.status,
            status_text: to_c_string(&done.status_text),
            headers,
            headers_len,
            body: to_c_string(&done.body),
            json,
            comet_tail: done
                .comet_tail
                .as_deref()
                .map_or(std::ptr::null_mut(), to_c_string),
        }))
    }

    pub(crate) fn from_error(err: ApiError) -> *mut Self {
        let kind = match &err {
            ApiError::Status { .. } => FfiErrorKind::Status,
            ApiError::InvalidJson(_) => FfiErrorKind::InvalidJson,
            ApiError::Serialization(_) => FfiErrorKind::Serialization,
            ApiError::InvalidDescriptor(_) => FfiErrorKind::InvalidDescriptor,
            ApiError::Transport(_) => FfiErrorKind::Transport,
        };
        let result = Self::empty(kind, to_c_string(&err.to_string()));
        if let Some(status) = err.status() {
            unsafe { (*result).status = status };
        }
        result
    }

    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Self::empty(
            FfiErrorKind::NullArgument,
            to_c_string(&format!("null argument: {name}")),
        )
    }

    pub(crate) fn panic(message: &str) -> *mut Self {
        Self::empty(FfiErrorKind::Panic, to_c_string(message))
    }
}

/// Copy headers into a heap-allocated `FfiHeader` array. An empty list yields
/// a null pointer. Released with `free_headers`.
pub(crate) fn headers_to_ffi(headers: &[(String, String)]) -> (*mut FfiHeader, u32) {
    if headers.is_empty() {
        return (std::ptr::null_mut(), 0);
    }
    let ffi_headers: Box<[FfiHeader]> = headers
        .iter()
        .map(|(k, v)| FfiHeader {
            key: to_c_string(k),
            value: to_c_string(v),
        })
        .collect();
    let len = u32::try_from(ffi_headers.len()).unwrap_or(u32::MAX);
    (Box::into_raw(ffi_headers) as *mut FfiHeader, len)
}

/// Allocate a C string; interior NULs truncate at the first NUL.
pub(crate) fn to_c_string(s: &str) -> *mut c_char {
    let bytes = s.split('\0').next().unwrap_or("");
    CString::new(bytes).unwrap_or_default().into_raw()
}
