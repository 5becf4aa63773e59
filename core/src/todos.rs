//! Todo Store: the current user's todo list, kept in sync with the API.
//!
//! # Design
//! - Every operation reads the session on entry and is a no-op without one.
//! - `update_todo` and `delete_todo` are optimistic: the local change is
//!   applied before any request, then either reconciled with the server or
//!   rolled back. The rollback snapshot belongs to the call and covers only
//!   the item that call touched, so interleaved calls on other items are
//!   never clobbered.
//! - Mutations go through the fallback route lists in `crate::fallback`.
//! - A generation counter is bumped whenever the session changes. Results of
//!   requests started under an older generation are dropped, which is how
//!   in-flight work is cancelled.
//! - State is only mutated inside synchronous `watch` closures, never across
//!   an `.await`.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, error, warn};
use tokio::sync::watch;

use crate::client::ApiClient;
use crate::error::ApiResult;
use crate::fallback::{self, DeleteRoute, UpdateRoute};
use crate::session::SessionState;
use crate::transport::Transport;
use crate::types::{NewTodo, Todo, TodoPatch};

pub const FETCH_FAILED: &str = "Failed to fetch todos. Please try again.";
pub const ADD_FAILED: &str = "Failed to add todo. Please try again.";
pub const UPDATE_FAILED: &str = "Failed to update todo. Please try again.";
pub const DELETE_FAILED: &str = "Failed to delete todo. Please try again.";

/// Observable state of the todo store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoState {
    pub todos: Vec<Todo>,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl TodoState {
    pub fn get(&self, id: i64) -> Option<&Todo> {
        self.todos.iter().find(|t| t.id == id)
    }

    pub fn completed_count(&self) -> usize {
        self.todos.iter().filter(|t| t.completed).count()
    }

    pub fn active_count(&self) -> usize {
        self.todos.len() - self.completed_count()
    }

    fn get_mut(&mut self, id: i64) -> Option<&mut Todo> {
        self.todos.iter_mut().find(|t| t.id == id)
    }

    /// Replace the entry with the same id, or append.
    fn upsert(&mut self, todo: Todo) {
        match self.get_mut(todo.id) {
            Some(existing) => *existing = todo,
            None => self.todos.push(todo),
        }
    }
}

/// What an operation captured from the session when it started.
struct Context {
    token: String,
    user_id: i64,
    generation: u64,
}

pub struct TodoStore<T> {
    client: ApiClient,
    transport: T,
    session: watch::Receiver<SessionState>,
    state: watch::Sender<TodoState>,
    generation: AtomicU64,
}

impl<T: Transport> TodoStore<T> {
    pub fn new(client: ApiClient, transport: T, session: watch::Receiver<SessionState>) -> Self {
        let (state, _) = watch::channel(TodoState::default());
        Self {
            client,
            transport,
            session,
            state,
            generation: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<TodoState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> TodoState {
        self.state.borrow().clone()
    }

    /// Drop the collection and cancel in-flight work, then load the list of
    /// the new session if there is one.
    pub async fn on_session_changed(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.state.send_modify(|s| *s = TodoState::default());
        self.fetch_todos().await;
    }

    /// Replace the local list with the server's. A failure keeps the
    /// previous list.
    pub async fn fetch_todos(&self) {
        let Some(ctx) = self.context() else {
            debug!("fetch_todos: no session");
            return;
        };
        self.commit(ctx.generation, |s| {
            s.is_loading = true;
            s.error = None;
        });

        let result = self.try_fetch(&ctx).await;

        self.commit(ctx.generation, |s| {
            s.is_loading = false;
            match result {
                Ok(todos) => s.todos = todos,
                Err(e) => {
                    warn!("fetching todos failed: {e}");
                    s.error = Some(FETCH_FAILED.to_string());
                }
            }
        });
    }

    /// Create a todo. Nothing is inserted locally until the server answers.
    pub async fn add_todo(&self, title: &str) {
        let Some(ctx) = self.context() else {
            debug!("add_todo: no session");
            return;
        };
        self.commit(ctx.generation, |s| {
            s.is_loading = true;
            s.error = None;
        });

        let input = NewTodo {
            todo: title.to_string(),
            completed: false,
            user_id: ctx.user_id,
        };
        let result = self.try_add(&ctx, &input).await;

        self.commit(ctx.generation, |s| {
            s.is_loading = false;
            match result {
                Ok(todo) => s.upsert(todo),
                Err(e) => {
                    warn!("adding todo failed: {e}");
                    s.error = Some(ADD_FAILED.to_string());
                }
            }
        });
    }

    /// Merge `patch` into the local item now, then confirm with the server.
    pub async fn update_todo(&self, id: i64, patch: TodoPatch) {
        let Some(ctx) = self.context() else {
            debug!("update_todo: no session");
            return;
        };

        let mut snapshot = None;
        self.commit(ctx.generation, |s| {
            s.is_loading = true;
            s.error = None;
            if let Some(item) = s.get_mut(id) {
                snapshot = Some(item.clone());
                item.apply(&patch);
            }
        });

        let token = ctx.token.as_str();
        let patch_ref = &patch;
        let result = fallback::first_success(UpdateRoute::CANDIDATES, move |route| {
            self.try_update(route, token, id, patch_ref)
        })
        .await;

        self.commit(ctx.generation, |s| {
            s.is_loading = false;
            match result {
                Ok(server) => {
                    if let Some(item) = s.get_mut(id) {
                        item.apply(&server);
                    }
                }
                Err(e) => {
                    error!("updating todo {id} failed on every route, rolling back: {e}");
                    if let (Some(previous), Some(item)) = (snapshot, s.get_mut(id)) {
                        *item = previous;
                    }
                    s.error = Some(UPDATE_FAILED.to_string());
                }
            }
        });
    }

    /// Remove the local item now, then confirm with the server.
    pub async fn delete_todo(&self, id: i64) {
        let Some(ctx) = self.context() else {
            debug!("delete_todo: no session");
            return;
        };

        let mut snapshot = None;
        self.commit(ctx.generation, |s| {
            if let Some(index) = s.todos.iter().position(|t| t.id == id) {
                snapshot = Some((index, s.todos.remove(index)));
            }
        });

        let token = ctx.token.as_str();
        let result = fallback::first_success(DeleteRoute::CANDIDATES, move |route| {
            self.try_delete(route, token, id)
        })
        .await;

        if let Err(e) = result {
            self.commit(ctx.generation, |s| {
                error!("deleting todo {id} failed on every route, rolling back: {e}");
                if let Some((index, todo)) = snapshot {
                    if s.get(id).is_none() {
                        let index = index.min(s.todos.len());
                        s.todos.insert(index, todo);
                    }
                }
                s.error = Some(DELETE_FAILED.to_string());
            });
        }
    }

    fn context(&self) -> Option<Context> {
        let state = self.session.borrow();
        let session = state.session.as_ref()?;
        Some(Context {
            token: session.token.clone(),
            user_id: session.user.id,
            generation: self.generation.load(Ordering::SeqCst),
        })
    }

    /// Apply `f` unless the session changed since `generation` was taken.
    fn commit(&self, generation: u64, f: impl FnOnce(&mut TodoState)) -> bool {
        self.state.send_if_modified(|s| {
            if self.generation.load(Ordering::SeqCst) != generation {
                debug!("dropping result from a previous session");
                return false;
            }
            f(s);
            true
        })
    }

    async fn try_fetch(&self, ctx: &Context) -> ApiResult<Vec<Todo>> {
        let request = self.client.build_fetch_todos(&ctx.token, ctx.user_id);
        let response = self.transport.execute(request).await?;
        let mut page = self.client.parse_fetch_todos(response)?;

        let mut seen = HashSet::new();
        page.todos.retain(|t| seen.insert(t.id));
        Ok(page.todos)
    }

    async fn try_add(&self, ctx: &Context, input: &NewTodo) -> ApiResult<Todo> {
        let request = self.client.build_add_todo(&ctx.token, input)?;
        let response = self.transport.execute(request).await?;
        self.client.parse_add_todo(response)
    }

    async fn try_update(
        &self,
        route: UpdateRoute,
        token: &str,
        id: i64,
        patch: &TodoPatch,
    ) -> ApiResult<TodoPatch> {
        let request = self.client.build_update_todo(route, token, id, patch)?;
        let response = self.transport.execute(request).await?;
        self.client.parse_update_todo(response)
    }

    async fn try_delete(&self, route: DeleteRoute, token: &str, id: i64) -> ApiResult {
        let request = self.client.build_delete_todo(route, token, id);
        let response = self.transport.execute(request).await?;
        self.client.parse_delete_todo(response)
    }
}
