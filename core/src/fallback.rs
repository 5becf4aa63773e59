//! Ordered fallback routes for update and delete.
//!
//! The demo API does not consistently accept mutations on one path/verb, so
//! each mutation has a short list of candidate routes tried in order until
//! one succeeds. This is not a retry policy: there is no backoff and no
//! attempt beyond the last candidate. Shrinking a `CANDIDATES` list to one
//! entry removes the workaround.

use std::future::Future;

use log::warn;

use crate::error::ApiError;

/// Where an update request is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateRoute {
    /// `PUT /todos/{id}`
    Put,
    /// `PATCH /todos/{id}`
    Patch,
}

impl UpdateRoute {
    pub const CANDIDATES: &'static [UpdateRoute] = &[UpdateRoute::Put, UpdateRoute::Patch];
}

/// Where a delete request is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteRoute {
    /// `DELETE /todos/{id}`
    ById,
    /// `DELETE /todos/delete/{id}`
    DeletePath,
}

impl DeleteRoute {
    pub const CANDIDATES: &'static [DeleteRoute] = &[DeleteRoute::ById, DeleteRoute::DeletePath];
}

/// Await `attempt` for each candidate in order and return the first success.
///
/// Returns the last candidate's error when every attempt fails. An empty
/// candidate list is a programming error and reports a transport error.
pub async fn first_success<C, T, F, Fut>(candidates: &[C], mut attempt: F) -> Result<T, ApiError>
where
    C: Copy + std::fmt::Debug,
    F: FnMut(C) -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let mut last_err = ApiError::Transport("no candidate routes".to_string());
    for &candidate in candidates {
        match attempt(candidate).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!("{candidate:?} route failed: {e}");
                last_err = e;
            }
        }
    }
    Err(last_err)
}
