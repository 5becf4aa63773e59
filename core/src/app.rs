//! Application state: owns both stores for the lifetime of the app.
//!
//! Screens receive a reference to `App` instead of reaching for globals.
//! Session changes made through `App` are forwarded to the todo store, so
//! the list is always the current user's.

use log::info;

use crate::client::ApiClient;
use crate::config::Config;
use crate::session::SessionStore;
use crate::storage::{FileStorage, KeyValueStorage, MemoryStorage};
use crate::todos::TodoStore;
use crate::transport::{ReqwestTransport, Transport};

pub struct App<T, S> {
    session: SessionStore<T, S>,
    todos: TodoStore<T>,
}

impl App<ReqwestTransport, Box<dyn KeyValueStorage>> {
    /// Production wiring: reqwest transport, file storage when configured.
    pub fn from_config(config: &Config) -> Self {
        let storage: Box<dyn KeyValueStorage> = match &config.state_file {
            Some(path) => Box::new(FileStorage::new(path)),
            None => Box::new(MemoryStorage::new()),
        };
        App::new(config, ReqwestTransport::new(), storage)
    }
}

impl<T: Transport + Clone, S: KeyValueStorage> App<T, S> {
    pub fn new(config: &Config, transport: T, storage: S) -> Self {
        let client = ApiClient::new(&config.api_url);
        let session = SessionStore::new(
            client.clone(),
            transport.clone(),
            storage,
            config.token_ttl_mins,
        );
        let todos = TodoStore::new(client, transport, session.subscribe());
        Self { session, todos }
    }

    pub fn session(&self) -> &SessionStore<T, S> {
        &self.session
    }

    pub fn todos(&self) -> &TodoStore<T> {
        &self.todos
    }

    /// Restore the persisted session and load its todos.
    pub async fn start(&self) {
        self.session.bootstrap();
        info!(
            "started, session {}",
            if self.session.snapshot().session.is_some() { "restored" } else { "empty" }
        );
        self.todos.on_session_changed().await;
    }

    pub async fn login(&self, username: &str, password: &str) {
        let before = self.current_token();
        self.session.login(username, password).await;
        if self.current_token() != before {
            self.todos.on_session_changed().await;
        }
    }

    pub async fn logout(&self) {
        let before = self.current_token();
        self.session.logout();
        if self.current_token() != before {
            self.todos.on_session_changed().await;
        }
    }

    fn current_token(&self) -> Option<String> {
        self.session.snapshot().token().map(str::to_string)
    }
}
