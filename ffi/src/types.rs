//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Each type mirrors a core type but uses C-compatible representations:
//! `*mut c_char` instead of `String`, raw pointers instead of `Vec`, and
//! tagged enums with explicit discriminants. Optional fields become a
//! `has_*` flag or a tri-state integer. Conversion functions live here to
//! keep `lib.rs` focused on the `extern "C"` surface.

use std::ffi::{c_void, CString};
use std::os::raw::c_char;

use tasklist_core::error::ApiError;
use tasklist_core::http::HttpMethod;
use tasklist_core::{DeleteRoute, LoginResponse, Todo, TodoPatch, UpdateRoute, User};

/// Opaque handle to an `ApiClient`. C callers receive a pointer to this
/// and pass it back into every FFI function.
pub struct FfiApiClient {
    pub(crate) inner: tasklist_core::ApiClient,
}

/// Move `s` onto the C heap. Interior NUL bytes are dropped so the
/// conversion cannot fail.
pub(crate) fn into_c_string(s: String) -> *mut c_char {
    let mut bytes = s.into_bytes();
    bytes.retain(|b| *b != 0);
    CString::new(bytes).unwrap_or_default().into_raw()
}

/// Release a string created by `into_c_string`. Null is ignored.
pub(crate) fn free_c_string(s: *mut c_char) {
    if !s.is_null() {
        drop(unsafe { CString::from_raw(s) });
    }
}

/// Hand a `Vec` to C as a pointer/length pair. Empty vectors become null.
fn into_raw_parts<T>(items: Vec<T>) -> (*mut T, u32) {
    if items.is_empty() {
        return (std::ptr::null_mut(), 0);
    }
    let len = items.len() as u32;
    let boxed = items.into_boxed_slice();
    (Box::into_raw(boxed) as *mut T, len)
}

/// Take back a pointer/length pair produced by `into_raw_parts`.
pub(crate) fn from_raw_parts<T>(ptr: *mut T, len: u32) -> Vec<T> {
    if ptr.is_null() || len == 0 {
        return Vec::new();
    }
    let slice = std::ptr::slice_from_raw_parts_mut(ptr, len as usize);
    unsafe { Box::from_raw(slice) }.into_vec()
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// HTTP method as a C enum.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiHttpMethod {
    Get = 0,
    Post = 1,
    Put = 2,
    Patch = 3,
    Delete = 4,
}

impl From<HttpMethod> for FfiHttpMethod {
    fn from(m: HttpMethod) -> Self {
        match m {
            HttpMethod::Get => FfiHttpMethod::Get,
            HttpMethod::Post => FfiHttpMethod::Post,
            HttpMethod::Put => FfiHttpMethod::Put,
            HttpMethod::Patch => FfiHttpMethod::Patch,
            HttpMethod::Delete => FfiHttpMethod::Delete,
        }
    }
}

/// Endpoint used for an update. Hosts try `Put` first and fall back to
/// `Patch` when it fails.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiUpdateRoute {
    Put = 0,
    Patch = 1,
}

impl From<FfiUpdateRoute> for UpdateRoute {
    fn from(r: FfiUpdateRoute) -> Self {
        match r {
            FfiUpdateRoute::Put => UpdateRoute::Put,
            FfiUpdateRoute::Patch => UpdateRoute::Patch,
        }
    }
}

/// Endpoint used for a delete. Hosts try `ById` first and fall back to
/// `DeletePath` when it fails.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiDeleteRoute {
    ById = 0,
    DeletePath = 1,
}

impl From<FfiDeleteRoute> for DeleteRoute {
    fn from(r: FfiDeleteRoute) -> Self {
        match r {
            FfiDeleteRoute::ById => DeleteRoute::ById,
            FfiDeleteRoute::DeletePath => DeleteRoute::DeletePath,
        }
    }
}

/// A single HTTP header as a key-value pair of C strings.
#[repr(C)]
pub struct FfiHeader {
    pub key: *mut c_char,
    pub value: *mut c_char,
}

/// An HTTP request described as C-compatible plain data.
///
/// Built by `tasklist_build_*` functions. The C caller executes the request
/// and passes the response back through `tasklist_parse_*`.
#[repr(C)]
pub struct FfiHttpRequest {
    pub method: FfiHttpMethod,
    pub path: *mut c_char,
    pub headers: *mut FfiHeader,
    pub headers_len: u32,
    pub body: *mut c_char,
}

impl FfiHttpRequest {
    /// Convert a core `HttpRequest` into a heap-allocated `FfiHttpRequest`.
    pub(crate) fn from_core(req: tasklist_core::HttpRequest) -> *mut Self {
        let headers: Vec<FfiHeader> = req
            .headers
            .into_iter()
            .map(|(k, v)| FfiHeader {
                key: into_c_string(k),
                value: into_c_string(v),
            })
            .collect();
        let (headers, headers_len) = into_raw_parts(headers);

        Box::into_raw(Box::new(FfiHttpRequest {
            method: req.method.into(),
            path: into_c_string(req.path),
            headers,
            headers_len,
            body: req.body.map_or(std::ptr::null_mut(), into_c_string),
        }))
    }
}

// ---------------------------------------------------------------------------
// Response input (caller-provided, not heap-allocated by us)
// ---------------------------------------------------------------------------

/// An HTTP response described as C-compatible plain data.
///
/// The C caller constructs this on the stack after executing an HTTP request,
/// then passes a pointer to a `tasklist_parse_*` function. The FFI layer
/// reads but does not free these fields.
#[repr(C)]
pub struct FfiHttpResponse {
    pub status: u16,
    pub body: *const c_char,
}

// ---------------------------------------------------------------------------
// Payload types
// ---------------------------------------------------------------------------

/// A single todo item exposed to C.
#[repr(C)]
pub struct FfiTodo {
    pub id: i64,
    pub todo: *mut c_char,
    pub completed: bool,
    pub user_id: i64,
}

impl FfiTodo {
    fn from_core(t: Todo) -> Self {
        FfiTodo {
            id: t.id,
            todo: into_c_string(t.todo),
            completed: t.completed,
            user_id: t.user_id,
        }
    }

    /// Free the C-string fields (but not the struct itself).
    pub(crate) fn free_fields(&self) {
        free_c_string(self.todo);
    }
}

/// A list of todo items exposed to C, with the server's paging counters.
#[repr(C)]
pub struct FfiTodoList {
    pub items: *mut FfiTodo,
    pub len: u32,
    pub total: u64,
}

/// Fields returned by an update. `has_id`/`has_user_id` say whether the
/// numeric fields are present, `todo` is null when absent, and `completed`
/// is -1 (absent), 0 or 1.
#[repr(C)]
pub struct FfiTodoPatch {
    pub has_id: bool,
    pub id: i64,
    pub todo: *mut c_char,
    pub completed: i32,
    pub has_user_id: bool,
    pub user_id: i64,
}

impl FfiTodoPatch {
    fn from_core(p: TodoPatch) -> Self {
        FfiTodoPatch {
            has_id: p.id.is_some(),
            id: p.id.unwrap_or_default(),
            todo: p.todo.map_or(std::ptr::null_mut(), into_c_string),
            completed: p.completed.map_or(-1, i32::from),
            has_user_id: p.user_id.is_some(),
            user_id: p.user_id.unwrap_or_default(),
        }
    }
}

/// Profile of the signed-in user.
#[repr(C)]
pub struct FfiUser {
    pub id: i64,
    pub username: *mut c_char,
    pub email: *mut c_char,
    pub first_name: *mut c_char,
    pub last_name: *mut c_char,
    pub gender: *mut c_char,
    pub image: *mut c_char,
}

impl FfiUser {
    fn from_core(u: User) -> Self {
        FfiUser {
            id: u.id,
            username: into_c_string(u.username),
            email: into_c_string(u.email),
            first_name: into_c_string(u.first_name),
            last_name: into_c_string(u.last_name),
            gender: into_c_string(u.gender),
            image: into_c_string(u.image),
        }
    }

    fn free_fields(&self) {
        for s in [
            self.username,
            self.email,
            self.first_name,
            self.last_name,
            self.gender,
            self.image,
        ] {
            free_c_string(s);
        }
    }
}

/// Successful login: profile plus both tokens.
#[repr(C)]
pub struct FfiLogin {
    pub user: FfiUser,
    pub access_token: *mut c_char,
    pub refresh_token: *mut c_char,
}

impl FfiLogin {
    pub(crate) fn free_fields(&self) {
        self.user.free_fields();
        free_c_string(self.access_token);
        free_c_string(self.refresh_token);
    }
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Error codes returned in `FfiResult`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    NotFound = 1,
    Http = 2,
    Deserialization = 3,
    Serialization = 4,
    Panic = 5,
    NullArg = 6,
    Unauthorized = 7,
    Transport = 8,
    Storage = 9,
}

/// Tag that tells `tasklist_free_result` what `FfiResult::data` points to.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiDataTag {
    None = 0,
    Login = 1,
    Todo = 2,
    TodoList = 3,
    TodoPatch = 4,
}

/// Result envelope for all parse operations.
///
/// On success `error_code` is `Ok`, `error_message` is null, and `data`
/// points to the parsed payload (tagged by `data_tag`).
/// On failure `error_code` describes the category, `error_message` is a
/// human-readable C string, and `data` is null. For `Unauthorized` the
/// message is the server's own text when it sent one.
#[repr(C)]
pub struct FfiResult {
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub http_status: u16,
    pub data_tag: FfiDataTag,
    pub data: *mut c_void,
}

impl FfiResult {
    fn ok<T>(data_tag: FfiDataTag, data: T) -> *mut Self {
        Box::into_raw(Box::new(FfiResult {
            error_code: FfiErrorCode::Ok,
            error_message: std::ptr::null_mut(),
            http_status: 0,
            data_tag,
            data: Box::into_raw(Box::new(data)) as *mut c_void,
        }))
    }

    fn err(error_code: FfiErrorCode, http_status: u16, msg: String) -> *mut Self {
        Box::into_raw(Box::new(FfiResult {
            error_code,
            error_message: into_c_string(msg),
            http_status,
            data_tag: FfiDataTag::None,
            data: std::ptr::null_mut(),
        }))
    }

    pub(crate) fn ok_login(login: LoginResponse) -> *mut Self {
        Self::ok(
            FfiDataTag::Login,
            FfiLogin {
                user: FfiUser::from_core(login.user),
                access_token: into_c_string(login.access_token),
                refresh_token: into_c_string(login.refresh_token),
            },
        )
    }

    pub(crate) fn ok_todo(todo: Todo) -> *mut Self {
        Self::ok(FfiDataTag::Todo, FfiTodo::from_core(todo))
    }

    pub(crate) fn ok_todo_list(page: tasklist_core::TodosPage) -> *mut Self {
        let todos: Vec<FfiTodo> = page.todos.into_iter().map(FfiTodo::from_core).collect();
        let (items, len) = into_raw_parts(todos);
        Self::ok(
            FfiDataTag::TodoList,
            FfiTodoList {
                items,
                len,
                total: page.total,
            },
        )
    }

    pub(crate) fn ok_todo_patch(patch: TodoPatch) -> *mut Self {
        Self::ok(FfiDataTag::TodoPatch, FfiTodoPatch::from_core(patch))
    }

    /// Build a success result with no data payload (e.g. delete).
    pub(crate) fn ok_empty() -> *mut Self {
        Box::into_raw(Box::new(FfiResult {
            error_code: FfiErrorCode::Ok,
            error_message: std::ptr::null_mut(),
            http_status: 0,
            data_tag: FfiDataTag::None,
            data: std::ptr::null_mut(),
        }))
    }

    /// Build an error result from an `ApiError`.
    pub(crate) fn from_error(err: ApiError) -> *mut Self {
        let status = err.status().unwrap_or(0);
        let code = match &err {
            ApiError::Transport(_) => FfiErrorCode::Transport,
            ApiError::Unauthorized { .. } => FfiErrorCode::Unauthorized,
            ApiError::NotFound => FfiErrorCode::NotFound,
            ApiError::Http { .. } => FfiErrorCode::Http,
            ApiError::Deserialization(_) => FfiErrorCode::Deserialization,
            ApiError::Serialization(_) => FfiErrorCode::Serialization,
            ApiError::Storage(_) => FfiErrorCode::Storage,
        };
        let msg = match err {
            ApiError::Unauthorized {
                message: Some(message),
                ..
            } => message,
            other => other.to_string(),
        };
        Self::err(code, status, msg)
    }

    /// Build an error result for a null argument.
    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Self::err(FfiErrorCode::NullArg, 0, format!("null argument: {name}"))
    }

    /// Build an error result for a caught panic.
    pub(crate) fn panic(msg: &str) -> *mut Self {
        Self::err(FfiErrorCode::Panic, 0, msg.to_string())
    }
}
