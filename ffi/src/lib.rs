//! C-ABI wrapper around `tasklist-core`.
//!
//! # Overview
//! Exposes the auth and todo request builders and response parsers through
//! `extern "C"` functions so a host app with a C FFI can drive the API
//! without linking to Rust's async runtime or serde directly. The host owns
//! the HTTP stack and the PUT→PATCH / by-id→delete-path fallback order.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - Per-operation `build_*` / `parse_*` mirrors the core API 1:1.
//! - A single `FfiResult` envelope with `FfiDataTag` + `void* data`
//!   conveys success payloads and errors uniformly.
//! - The C caller owns all returned pointers and must call the matching
//!   `tasklist_free_*` function to release them.

pub mod types;

use std::ffi::CStr;
use std::os::raw::c_char;
use std::panic::catch_unwind;

use tasklist_core::http::HttpResponse;
use tasklist_core::types::{LoginRequest, NewTodo, TodoPatch};

use types::*;

/// Borrow a C string as UTF-8. Null and invalid UTF-8 both yield `None`.
fn read_str<'a>(s: *const c_char) -> Option<&'a str> {
    if s.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(s) }.to_str().ok()
}

// ---------------------------------------------------------------------------
// Client lifecycle
// ---------------------------------------------------------------------------

/// Create a new `ApiClient` bound to `base_url`.
///
/// Returns null if `base_url` is null or if an internal panic occurs.
/// The caller must free the returned pointer with `tasklist_client_free`.
#[unsafe(no_mangle)]
pub extern "C" fn tasklist_client_new(base_url: *const c_char) -> *mut FfiApiClient {
    catch_unwind(|| {
        if base_url.is_null() {
            return std::ptr::null_mut();
        }
        let url = read_str(base_url).unwrap_or("");
        let client = tasklist_core::ApiClient::new(url);
        Box::into_raw(Box::new(FfiApiClient { inner: client }))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free an `ApiClient` created by `tasklist_client_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn tasklist_client_free(client: *mut FfiApiClient) {
    if !client.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { Box::from_raw(client) });
        });
    }
}

// ---------------------------------------------------------------------------
// Build request functions
// ---------------------------------------------------------------------------

/// Build the `POST /auth/login` request.
///
/// Returns null if any pointer argument is null or not UTF-8.
/// The caller must free the returned pointer with `tasklist_free_request`.
#[unsafe(no_mangle)]
pub extern "C" fn tasklist_build_login(
    client: *const FfiApiClient,
    username: *const c_char,
    password: *const c_char,
    expires_in_mins: u32,
) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let (Some(username), Some(password)) = (read_str(username), read_str(password)) else {
            return std::ptr::null_mut();
        };
        let client = unsafe { &*client };
        let input = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
            expires_in_mins,
        };
        match client.inner.build_login(&input) {
            Ok(req) => FfiHttpRequest::from_core(req),
            Err(_) => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Build the request that lists the todos of `user_id`.
///
/// Returns null if `client` or `token` is null.
#[unsafe(no_mangle)]
pub extern "C" fn tasklist_build_fetch_todos(
    client: *const FfiApiClient,
    token: *const c_char,
    user_id: i64,
) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let Some(token) = read_str(token) else {
            return std::ptr::null_mut();
        };
        let client = unsafe { &*client };
        FfiHttpRequest::from_core(client.inner.build_fetch_todos(token, user_id))
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Build the `POST /todos/add` request.
///
/// Returns null if `client`, `token` or `todo` is null.
#[unsafe(no_mangle)]
pub extern "C" fn tasklist_build_add_todo(
    client: *const FfiApiClient,
    token: *const c_char,
    todo: *const c_char,
    completed: bool,
    user_id: i64,
) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let (Some(token), Some(todo)) = (read_str(token), read_str(todo)) else {
            return std::ptr::null_mut();
        };
        let client = unsafe { &*client };
        let input = NewTodo {
            todo: todo.to_string(),
            completed,
            user_id,
        };
        match client.inner.build_add_todo(token, &input) {
            Ok(req) => FfiHttpRequest::from_core(req),
            Err(_) => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Build an update request for todo `id` on the given route.
///
/// `todo` may be null to leave the text unchanged. `completed` is
/// tri-state: negative means unchanged, 0 means false, positive means true.
/// Returns null if `client` or `token` is null.
#[unsafe(no_mangle)]
pub extern "C" fn tasklist_build_update_todo(
    client: *const FfiApiClient,
    route: FfiUpdateRoute,
    token: *const c_char,
    id: i64,
    todo: *const c_char,
    completed: i32,
) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let Some(token) = read_str(token) else {
            return std::ptr::null_mut();
        };
        let client = unsafe { &*client };
        let patch = TodoPatch {
            todo: read_str(todo).map(str::to_string),
            completed: if completed < 0 { None } else { Some(completed != 0) },
            ..TodoPatch::default()
        };
        match client.inner.build_update_todo(route.into(), token, id, &patch) {
            Ok(req) => FfiHttpRequest::from_core(req),
            Err(_) => std::ptr::null_mut(),
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Build a delete request for todo `id` on the given route.
///
/// Returns null if `client` or `token` is null.
#[unsafe(no_mangle)]
pub extern "C" fn tasklist_build_delete_todo(
    client: *const FfiApiClient,
    route: FfiDeleteRoute,
    token: *const c_char,
    id: i64,
) -> *mut FfiHttpRequest {
    catch_unwind(|| {
        if client.is_null() {
            return std::ptr::null_mut();
        }
        let Some(token) = read_str(token) else {
            return std::ptr::null_mut();
        };
        let client = unsafe { &*client };
        FfiHttpRequest::from_core(client.inner.build_delete_todo(route.into(), token, id))
    })
    .unwrap_or(std::ptr::null_mut())
}

// ---------------------------------------------------------------------------
// Parse response functions
// ---------------------------------------------------------------------------

/// Convert a C-side `FfiHttpResponse` into a core `HttpResponse`.
fn ffi_response_to_core(resp: &FfiHttpResponse) -> HttpResponse {
    HttpResponse::new(resp.status, read_str(resp.body).unwrap_or(""))
}

/// Shared null checks and panic guard for every `tasklist_parse_*`.
fn parse_with(
    name: &str,
    client: *const FfiApiClient,
    response: *const FfiHttpResponse,
    parse: impl FnOnce(&tasklist_core::ApiClient, HttpResponse) -> *mut FfiResult
        + std::panic::UnwindSafe,
) -> *mut FfiResult {
    catch_unwind(|| {
        if client.is_null() {
            return FfiResult::null_arg("client");
        }
        if response.is_null() {
            return FfiResult::null_arg("response");
        }
        let client = unsafe { &*client };
        let resp = unsafe { &*response };
        parse(&client.inner, ffi_response_to_core(resp))
    })
    .unwrap_or_else(|_| FfiResult::panic(&format!("panic in {name}")))
}

/// Parse a login response.
///
/// Returns a result with `data_tag = Login` on success. A rejected login
/// yields `Unauthorized` with the server's message when it sent one.
#[unsafe(no_mangle)]
pub extern "C" fn tasklist_parse_login(
    client: *const FfiApiClient,
    response: *const FfiHttpResponse,
) -> *mut FfiResult {
    parse_with("tasklist_parse_login", client, response, |c, resp| {
        match c.parse_login(resp) {
            Ok(login) => FfiResult::ok_login(login),
            Err(e) => FfiResult::from_error(e),
        }
    })
}

/// Parse a list-todos response.
///
/// Returns a result with `data_tag = TodoList` on success.
#[unsafe(no_mangle)]
pub extern "C" fn tasklist_parse_fetch_todos(
    client: *const FfiApiClient,
    response: *const FfiHttpResponse,
) -> *mut FfiResult {
    parse_with("tasklist_parse_fetch_todos", client, response, |c, resp| {
        match c.parse_fetch_todos(resp) {
            Ok(page) => FfiResult::ok_todo_list(page),
            Err(e) => FfiResult::from_error(e),
        }
    })
}

/// Parse an add-todo response.
///
/// Returns a result with `data_tag = Todo` on success.
#[unsafe(no_mangle)]
pub extern "C" fn tasklist_parse_add_todo(
    client: *const FfiApiClient,
    response: *const FfiHttpResponse,
) -> *mut FfiResult {
    parse_with("tasklist_parse_add_todo", client, response, |c, resp| {
        match c.parse_add_todo(resp) {
            Ok(todo) => FfiResult::ok_todo(todo),
            Err(e) => FfiResult::from_error(e),
        }
    })
}

/// Parse an update response.
///
/// Returns a result with `data_tag = TodoPatch` on success: only the fields
/// the server echoed back are present.
#[unsafe(no_mangle)]
pub extern "C" fn tasklist_parse_update_todo(
    client: *const FfiApiClient,
    response: *const FfiHttpResponse,
) -> *mut FfiResult {
    parse_with("tasklist_parse_update_todo", client, response, |c, resp| {
        match c.parse_update_todo(resp) {
            Ok(patch) => FfiResult::ok_todo_patch(patch),
            Err(e) => FfiResult::from_error(e),
        }
    })
}

/// Parse a delete response from either delete route.
///
/// Returns a result with `data_tag = None` on any 2xx status.
#[unsafe(no_mangle)]
pub extern "C" fn tasklist_parse_delete_todo(
    client: *const FfiApiClient,
    response: *const FfiHttpResponse,
) -> *mut FfiResult {
    parse_with("tasklist_parse_delete_todo", client, response, |c, resp| {
        match c.parse_delete_todo(resp) {
            Ok(()) => FfiResult::ok_empty(),
            Err(e) => FfiResult::from_error(e),
        }
    })
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiHttpRequest` returned by any `tasklist_build_*` function.
/// Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn tasklist_free_request(req: *mut FfiHttpRequest) {
    if req.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let req = unsafe { Box::from_raw(req) };
        free_c_string(req.path);
        free_c_string(req.body);
        for h in from_raw_parts(req.headers, req.headers_len) {
            free_c_string(h.key);
            free_c_string(h.value);
        }
    });
}

/// Free an `FfiResult` returned by any `tasklist_parse_*` function.
/// Safe to call with null. Uses `data_tag` to determine what `data` points to.
#[unsafe(no_mangle)]
pub extern "C" fn tasklist_free_result(result: *mut FfiResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let result = unsafe { Box::from_raw(result) };
        free_c_string(result.error_message);
        if result.data.is_null() {
            return;
        }
        match result.data_tag {
            FfiDataTag::Login => {
                let login = unsafe { Box::from_raw(result.data as *mut FfiLogin) };
                login.free_fields();
            }
            FfiDataTag::Todo => {
                let todo = unsafe { Box::from_raw(result.data as *mut FfiTodo) };
                todo.free_fields();
            }
            FfiDataTag::TodoList => {
                let list = unsafe { Box::from_raw(result.data as *mut FfiTodoList) };
                for item in from_raw_parts(list.items, list.len) {
                    item.free_fields();
                }
            }
            FfiDataTag::TodoPatch => {
                let patch = unsafe { Box::from_raw(result.data as *mut FfiTodoPatch) };
                free_c_string(patch.todo);
            }
            FfiDataTag::None => {}
        }
    });
}

/// Free a C string allocated by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn tasklist_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = catch_unwind(|| free_c_string(s));
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
