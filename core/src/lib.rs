//! Synchronization core for the task-list app.
//!
//! # Overview
//! Keeps the signed-in user's session and todo list in sync with the
//! DummyJSON REST API. Screens observe store state and call store
//! operations; they never touch the network or the collections directly.
//!
//! # Design
//! - `ApiClient` is stateless: `build_*` produces an `HttpRequest`,
//!   `parse_*` consumes an `HttpResponse`. The same client backs the async
//!   stores and the C ABI in `tasklist-ffi`.
//! - `Transport` executes requests; `ReqwestTransport` in production,
//!   scripted transports in tests.
//! - `SessionStore` and `TodoStore` own their state in `watch` channels and
//!   catch every remote failure at their boundary.
//! - `App` owns both stores; there is no global state.

pub mod app;
pub mod client;
pub mod config;
pub mod error;
pub mod fallback;
pub mod http;
pub mod session;
pub mod storage;
pub mod todos;
pub mod transport;
pub mod types;

#[cfg(test)]
mod testing;

pub use app::App;
pub use client::ApiClient;
pub use config::{Config, ConfigError};
pub use error::{ApiError, ApiResult};
pub use fallback::{DeleteRoute, UpdateRoute};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use session::{Session, SessionState, SessionStore};
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage};
pub use todos::{TodoState, TodoStore};
pub use transport::{ReqwestTransport, Transport};
pub use types::{LoginRequest, LoginResponse, NewTodo, Todo, TodoPatch, TodosPage, User};
