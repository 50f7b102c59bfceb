//! C-ABI wrapper around `comet-core`.
//!
//! # Overview
//! Exposes the I/O-free `Exchange` through `extern "C"` functions so a host
//! with its own network stack and timer (a browser shim, an embedded event
//! loop) can reuse descriptor normalization, body encoding, comet polling and
//! settlement without linking an async runtime.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - Lifecycle: `comet_exchange_open` → `comet_exchange_request` → host sends
//!   it, calling `comet_exchange_tick` every `poll_rate_ms` while the body
//!   grows → `comet_exchange_settle`, which consumes the handle.
//! - Descriptors arrive as JSON text: a JSON string is a bare URL, an object
//!   uses camelCase option keys.
//! - The C caller owns all returned pointers and must call the matching
//!   `comet_free_*` function to release them.

pub mod types;

use std::ffi::{c_void, CStr, CString};
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use comet_core::{Exchange, HttpResponse, RequestDescriptor};

use types::*;

/// Read a possibly-null C string; null and invalid UTF-8 read as empty.
fn read_c_str<'a>(ptr: *const c_char) -> &'a str {
    if ptr.is_null() {
        return "";
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().unwrap_or("")
}

/// Copy a host-owned header array; a null pointer reads as no headers.
fn read_headers(ptr: *const FfiHeader, len: u32) -> Vec<(String, String)> {
    if ptr.is_null() || len == 0 {
        return Vec::new();
    }
    let headers = unsafe { std::slice::from_raw_parts(ptr, len as usize) };
    headers
        .iter()
        .map(|h| (read_c_str(h.key).to_string(), read_c_str(h.value).to_string()))
        .collect()
}

// ---------------------------------------------------------------------------
// Exchange lifecycle
// ---------------------------------------------------------------------------

/// Open an exchange from a JSON descriptor.
///
/// `callback` may be null; when set, the exchange runs in comet mode and the
/// callback receives each delivered line with `user_data`.
/// Returns null if `descriptor_json` is null, unparsable or rejected.
/// The caller must settle the handle or free it with `comet_exchange_free`.
#[unsafe(no_mangle)]
pub extern "C" fn comet_exchange_open(
    descriptor_json: *const c_char,
    callback: FfiCometCallback,
    user_data: *mut c_void,
) -> *mut FfiExchange {
    catch_unwind(AssertUnwindSafe(|| {
        if descriptor_json.is_null() {
            return std::ptr::null_mut();
        }
        let descriptor = match RequestDescriptor::from_json(read_c_str(descriptor_json)) {
            Ok(d) => d,
            Err(_) => return std::ptr::null_mut(),
        };
        let mut options = descriptor.into_options();
        if let Some(func) = callback {
            let host = HostCallback::new(func, user_data);
            options.comet = Some(Arc::new(move |line: &str| host.call(line)));
        }
        match Exchange::open(options) {
            Ok(inner) => Box::into_raw(Box::new(FfiExchange { inner })),
            Err(_) => std::ptr::null_mut(),
        }
    }))
    .unwrap_or(std::ptr::null_mut())
}

/// Free an exchange without settling it. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn comet_exchange_free(exchange: *mut FfiExchange) {
    if !exchange.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(exchange) });
        }));
    }
}

/// The request the host must execute for this exchange.
///
/// Returns null if `exchange` is null.
/// The caller must free the returned pointer with `comet_free_request`.
#[unsafe(no_mangle)]
pub extern "C" fn comet_exchange_request(exchange: *const FfiExchange) -> *mut FfiHttpRequest {
    catch_unwind(AssertUnwindSafe(|| {
        if exchange.is_null() {
            return std::ptr::null_mut();
        }
        let exchange = unsafe { &*exchange };
        let poll_rate_ms = exchange
            .inner
            .poll_rate()
            .map_or(0, |rate| u64::try_from(rate.as_millis()).unwrap_or(u64::MAX));
        FfiHttpRequest::from_core(exchange.inner.request(), poll_rate_ms)
    }))
    .unwrap_or(std::ptr::null_mut())
}

/// Run one polling tick against the response text received so far.
///
/// Returns 1 if the callback was invoked, 0 if not, -1 on a null argument
/// or an internal panic.
#[unsafe(no_mangle)]
pub extern "C" fn comet_exchange_tick(exchange: *mut FfiExchange, partial: *const c_char) -> i32 {
    catch_unwind(AssertUnwindSafe(|| {
        if exchange.is_null() || partial.is_null() {
            return -1;
        }
        let exchange = unsafe { &mut *exchange };
        i32::from(exchange.inner.tick(read_c_str(partial)))
    }))
    .unwrap_or(-1)
}

/// Settle the exchange with the final response.
///
/// Consumes `exchange`: the handle is freed and must not be used again, even
/// when the result reports an error. If `response` is null the handle is
/// still freed and a `NullArgument` result is returned.
/// The caller must free the returned pointer with `comet_free_result`.
#[unsafe(no_mangle)]
pub extern "C" fn comet_exchange_settle(
    exchange: *mut FfiExchange,
    response: *const FfiHttpResponse,
) -> *mut FfiCometResult {
    catch_unwind(AssertUnwindSafe(|| {
        if exchange.is_null() {
            return FfiCometResult::null_arg("exchange");
        }
        let exchange = unsafe { Box::from_raw(exchange) };
        if response.is_null() {
            return FfiCometResult::null_arg("response");
        }
        let resp = unsafe { &*response };
        let core_resp = HttpResponse {
            status: resp.status,
            status_text: read_c_str(resp.status_text).to_string(),
            headers: read_headers(resp.headers, resp.headers_len),
            body: read_c_str(resp.body).to_string(),
        };
        match exchange.inner.settle(core_resp) {
            Ok(done) => FfiCometResult::ok(done),
            Err(e) => FfiCometResult::from_error(e),
        }
    }))
    .unwrap_or_else(|_| FfiCometResult::panic("panic in comet_exchange_settle"))
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

fn free_c_string(s: *mut c_char) {
    if !s.is_null() {
        drop(unsafe { CString::from_raw(s) });
    }
}

/// Release an array built by `headers_to_ffi`.
fn free_headers(ptr: *mut FfiHeader, len: u32) {
    if ptr.is_null() || len == 0 {
        return;
    }
    let headers = unsafe { Box::from_raw(std::ptr::slice_from_raw_parts_mut(ptr, len as usize)) };
    for h in headers.iter() {
        free_c_string(h.key);
        free_c_string(h.value);
    }
}

/// Free an `FfiHttpRequest` returned by `comet_exchange_request`.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn comet_free_request(req: *mut FfiHttpRequest) {
    if req.is_null() {
        return;
    }
    let _ = catch_unwind(AssertUnwindSafe(|| {
        let req = unsafe { Box::from_raw(req) };
        free_c_string(req.method);
        free_c_string(req.url);
        free_c_string(req.body);
        free_c_string(req.user);
        free_c_string(req.password);
        free_headers(req.headers, req.headers_len);
    }));
}

/// Free an `FfiCometResult` returned by `comet_exchange_settle`.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn comet_free_result(result: *mut FfiCometResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(AssertUnwindSafe(|| {
        let result = unsafe { Box::from_raw(result) };
        free_c_string(result.error_message);
        free_c_string(result.status_text);
        free_headers(result.headers, result.headers_len);
        free_c_string(result.body);
        free_c_string(result.json);
        free_c_string(result.comet_tail);
    }));
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
