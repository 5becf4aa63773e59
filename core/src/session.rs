//! Session Store: the authenticated user's token and profile.
//!
//! # Design
//! State lives in a `watch` channel so screens can observe it; the store is
//! the only writer. The session is an `Option<Session>`, so a token without
//! a profile (or the reverse) cannot be represented. Failures never escape:
//! they are logged and land in the single `error` slot.

use log::{info, warn};
use tokio::sync::watch;

use crate::client::ApiClient;
use crate::error::{ApiError, ApiResult};
use crate::storage::{KeyValueStorage, REFRESH_TOKEN, USER_DATA, USER_TOKEN};
use crate::transport::Transport;
use crate::types::{LoginRequest, LoginResponse, User};

pub const NETWORK_ERROR: &str = "Network error during authentication";
pub const AUTH_FAILED: &str = "Authentication failed. Please check your credentials.";
pub const UNEXPECTED_ERROR: &str = "An unexpected error occurred";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub refresh_token: Option<String>,
    pub user: User,
}

/// Observable state of the session store.
///
/// `is_loading` starts out `true` and drops once `bootstrap` has run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub is_loading: bool,
    pub session: Option<Session>,
    pub error: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            is_loading: true,
            session: None,
            error: None,
        }
    }
}

impl SessionState {
    pub fn token(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.token.as_str())
    }

    pub fn user(&self) -> Option<&User> {
        self.session.as_ref().map(|s| &s.user)
    }
}

pub struct SessionStore<T, S> {
    client: ApiClient,
    transport: T,
    storage: S,
    token_ttl_mins: u32,
    state: watch::Sender<SessionState>,
}

impl<T: Transport, S: KeyValueStorage> SessionStore<T, S> {
    pub fn new(client: ApiClient, transport: T, storage: S, token_ttl_mins: u32) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            client,
            transport,
            storage,
            token_ttl_mins,
            state,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Restore a persisted session, if any. Never fails.
    pub fn bootstrap(&self) {
        let restored = match self.restore() {
            Ok(session) => session,
            Err(e) => {
                warn!("failed to load persisted session: {e}");
                None
            }
        };
        if let Some(session) = &restored {
            info!("restored session for {}", session.user.username);
        }
        self.state.send_modify(|s| {
            if restored.is_some() {
                s.session = restored;
            }
            s.is_loading = false;
        });
    }

    /// Authenticate and persist the session. A failure keeps whatever
    /// session was already held and sets `error`.
    pub async fn login(&self, username: &str, password: &str) {
        self.state.send_modify(|s| {
            s.is_loading = true;
            s.error = None;
        });

        let result = self.try_login(username, password).await;

        self.state.send_modify(|s| {
            s.is_loading = false;
            match result {
                Ok(session) => {
                    info!("logged in as {}", session.user.username);
                    s.session = Some(session);
                }
                Err(e) => {
                    warn!("login failed: {e}");
                    s.error = Some(login_error_message(e));
                }
            }
        });
    }

    /// Forget the session, in memory and on disk. Idempotent.
    pub fn logout(&self) {
        self.clear_persisted();
        self.state.send_modify(|s| {
            s.session = None;
            s.is_loading = false;
        });
    }

    async fn try_login(&self, username: &str, password: &str) -> ApiResult<Session> {
        let request = self.client.build_login(&LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
            expires_in_mins: self.token_ttl_mins,
        })?;
        let response = self.transport.execute(request).await?;
        let login = self.client.parse_login(response)?;
        self.persist(&login)?;
        Ok(Session {
            token: login.access_token,
            refresh_token: Some(login.refresh_token),
            user: login.user,
        })
    }

    /// Write all three keys or none: if any write fails, the previous
    /// values are put back. If even that fails, the persisted session is
    /// cleared so a token is never stored next to another user's profile.
    fn persist(&self, login: &LoginResponse) -> ApiResult {
        let user_data = serde_json::to_string(&login.user)
            .map_err(|e| ApiError::Serialization(e.to_string()))?;
        let entries = [
            (USER_TOKEN, login.access_token.as_str()),
            (REFRESH_TOKEN, login.refresh_token.as_str()),
            (USER_DATA, user_data.as_str()),
        ];
        let previous = entries
            .iter()
            .map(|(key, _)| Ok((*key, self.storage.get(key)?)))
            .collect::<ApiResult<Vec<_>>>()?;

        for (key, value) in entries {
            if let Err(e) = self.storage.set(key, value) {
                warn!("failed to persist {key}, restoring previous session: {e}");
                self.restore_entries(&previous);
                return Err(e);
            }
        }
        Ok(())
    }

    fn restore_entries(&self, previous: &[(&str, Option<String>)]) {
        for (key, value) in previous {
            let restored = match value {
                Some(value) => self.storage.set(key, value),
                None => self.storage.remove(key),
            };
            if let Err(e) = restored {
                warn!("failed to restore {key}, clearing persisted session: {e}");
                self.clear_persisted();
                return;
            }
        }
    }

    fn clear_persisted(&self) {
        for key in [USER_TOKEN, REFRESH_TOKEN, USER_DATA] {
            if let Err(e) = self.storage.remove(key) {
                warn!("failed to clear {key}: {e}");
            }
        }
    }

    fn restore(&self) -> ApiResult<Option<Session>> {
        let token = self.storage.get(USER_TOKEN)?.filter(|t| !t.is_empty());
        let user_data = self.storage.get(USER_DATA)?.filter(|u| !u.is_empty());
        let (Some(token), Some(user_data)) = (token, user_data) else {
            return Ok(None);
        };
        let user: User = serde_json::from_str(&user_data)
            .map_err(|e| ApiError::Deserialization(e.to_string()))?;
        Ok(Some(Session {
            token,
            refresh_token: self.storage.get(REFRESH_TOKEN)?,
            user,
        }))
    }
}

fn login_error_message(err: ApiError) -> String {
    match err {
        ApiError::Transport(_) => NETWORK_ERROR.to_string(),
        ApiError::Unauthorized {
            message: Some(message),
            ..
        } => message,
        ApiError::Unauthorized { .. } | ApiError::NotFound | ApiError::Http { .. } => {
            AUTH_FAILED.to_string()
        }
        ApiError::Deserialization(_) | ApiError::Serialization(_) | ApiError::Storage(_) => {
            UNEXPECTED_ERROR.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpMethod;
    use crate::storage::{FileStorage, MemoryStorage};
    use crate::testing::{ScriptedTransport, BASE_URL};

    const LOGIN_OK: &str = r#"{
        "id": 1, "username": "emilys", "email": "emily.johnson@x.dummyjson.com",
        "firstName": "Emily", "lastName": "Johnson", "gender": "female",
        "image": "https://dummyjson.com/icon/emilys/128",
        "accessToken": "access-1", "refreshToken": "refresh-1"
    }"#;

    fn store(transport: &ScriptedTransport) -> SessionStore<ScriptedTransport, MemoryStorage> {
        SessionStore::new(
            ApiClient::new(BASE_URL),
            transport.clone(),
            MemoryStorage::new(),
            60,
        )
    }

    fn assert_invariant(state: &SessionState) {
        assert_eq!(state.token().is_some(), state.user().is_some());
    }

    #[test]
    fn starts_loading_until_bootstrap() {
        let transport = ScriptedTransport::new();
        let store = store(&transport);
        assert!(store.snapshot().is_loading);

        store.bootstrap();
        let state = store.snapshot();
        assert!(!state.is_loading);
        assert!(state.session.is_none());
        assert_invariant(&state);
    }

    #[tokio::test]
    async fn login_success_sets_session_and_persists_it() {
        let transport = ScriptedTransport::new();
        transport.reply(HttpMethod::Post, "/auth/login", 200, LOGIN_OK);
        let store = store(&transport);
        store.bootstrap();

        store.login("emilys", "emilyspass").await;

        let state = store.snapshot();
        assert!(!state.is_loading);
        assert_eq!(state.error, None);
        assert_eq!(state.token(), Some("access-1"));
        assert_eq!(state.user().unwrap().id, 1);
        assert_invariant(&state);

        assert_eq!(store.storage.get(USER_TOKEN).unwrap().as_deref(), Some("access-1"));
        assert_eq!(store.storage.get(REFRESH_TOKEN).unwrap().as_deref(), Some("refresh-1"));
        let stored: serde_json::Value =
            serde_json::from_str(&store.storage.get(USER_DATA).unwrap().unwrap()).unwrap();
        assert_eq!(stored["username"], "emilys");
        assert!(stored.get("accessToken").is_none());

        let body: serde_json::Value =
            serde_json::from_str(transport.requests()[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(body["expiresInMins"], 60);
    }

    #[tokio::test]
    async fn rejected_login_surfaces_server_message() {
        let transport = ScriptedTransport::new();
        transport.reply(
            HttpMethod::Post,
            "/auth/login",
            400,
            r#"{"message":"Invalid credentials"}"#,
        );
        let store = store(&transport);
        store.bootstrap();

        store.login("emilys", "wrong").await;

        let state = store.snapshot();
        assert_eq!(state.error.as_deref(), Some("Invalid credentials"));
        assert!(state.session.is_none());
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn rejected_login_without_message_is_generic() {
        let transport = ScriptedTransport::new();
        transport.reply(HttpMethod::Post, "/auth/login", 500, "oops");
        let store = store(&transport);

        store.login("emilys", "emilyspass").await;
        assert_eq!(store.snapshot().error.as_deref(), Some(AUTH_FAILED));
    }

    #[tokio::test]
    async fn network_failure_keeps_existing_session() {
        let transport = ScriptedTransport::new();
        transport
            .reply(HttpMethod::Post, "/auth/login", 200, LOGIN_OK)
            .fail(HttpMethod::Post, "/auth/login");
        let store = store(&transport);
        store.bootstrap();
        store.login("emilys", "emilyspass").await;

        store.login("emilys", "emilyspass").await;

        let state = store.snapshot();
        assert_eq!(state.error.as_deref(), Some(NETWORK_ERROR));
        assert_eq!(state.token(), Some("access-1"));
        assert!(!state.is_loading);
        assert_invariant(&state);
    }

    #[tokio::test]
    async fn failed_persist_keeps_previous_user_on_disk() {
        let path = std::env::temp_dir().join(format!(
            "tasklist-{}-partial-persist.txt",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);

        let transport = ScriptedTransport::new();
        transport
            .reply(
                HttpMethod::Post,
                "/auth/login",
                200,
                r#"{"id":2,"username":"michaelw","email":"m@x","firstName":"Michael",
                    "lastName":"Williams","gender":"male","image":"",
                    "accessToken":"tok-user2","refreshToken":"ref-user2"}"#,
            )
            .reply(
                HttpMethod::Post,
                "/auth/login",
                200,
                r#"{"id":1,"username":"emilys","email":"e@x","firstName":"Emily",
                    "lastName":"Johnson","gender":"female","image":"",
                    "accessToken":"tok-user1","refreshToken":"bad\nrefresh"}"#,
            );
        let store = SessionStore::new(
            ApiClient::new(BASE_URL),
            transport.clone(),
            FileStorage::new(&path),
            60,
        );
        store.bootstrap();
        store.login("michaelw", "michaelwpass").await;

        store.login("emilys", "emilyspass").await;

        let state = store.snapshot();
        assert_eq!(state.error.as_deref(), Some(UNEXPECTED_ERROR));
        assert_eq!(state.token(), Some("tok-user2"));
        assert_eq!(state.user().unwrap().id, 2);

        let restarted = SessionStore::new(
            ApiClient::new(BASE_URL),
            transport,
            FileStorage::new(&path),
            60,
        );
        restarted.bootstrap();
        let state = restarted.snapshot();
        assert_eq!(state.token(), Some("tok-user2"));
        assert_eq!(state.user().unwrap().id, 2);
        assert_eq!(
            state.session.unwrap().refresh_token.as_deref(),
            Some("ref-user2")
        );

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn bootstrap_restores_persisted_session() {
        let transport = ScriptedTransport::new();
        transport.reply(HttpMethod::Post, "/auth/login", 200, LOGIN_OK);
        let first = store(&transport);
        first.login("emilys", "emilyspass").await;

        let restarted = SessionStore::new(
            ApiClient::new(BASE_URL),
            transport.clone(),
            first.storage,
            60,
        );
        restarted.bootstrap();

        let state = restarted.snapshot();
        assert_eq!(state.token(), Some("access-1"));
        assert_eq!(state.user().unwrap().username, "emilys");
        assert_eq!(
            state.session.unwrap().refresh_token.as_deref(),
            Some("refresh-1")
        );
    }

    #[test]
    fn bootstrap_ignores_token_without_profile() {
        let transport = ScriptedTransport::new();
        let store = store(&transport);
        store.storage.set(USER_TOKEN, "orphan").unwrap();

        store.bootstrap();
        let state = store.snapshot();
        assert!(state.session.is_none());
        assert!(!state.is_loading);
        assert_invariant(&state);
    }

    #[test]
    fn bootstrap_treats_corrupt_profile_as_no_session() {
        let transport = ScriptedTransport::new();
        let store = store(&transport);
        store.storage.set(USER_TOKEN, "tok").unwrap();
        store.storage.set(USER_DATA, "{not json").unwrap();

        store.bootstrap();
        let state = store.snapshot();
        assert!(state.session.is_none());
        assert_eq!(state.error, None);
    }

    #[tokio::test]
    async fn logout_twice_is_same_as_once() {
        let transport = ScriptedTransport::new();
        transport.reply(HttpMethod::Post, "/auth/login", 200, LOGIN_OK);
        let store = store(&transport);
        store.bootstrap();
        store.login("emilys", "emilyspass").await;

        store.logout();
        let once = store.snapshot();
        store.logout();
        let twice = store.snapshot();

        assert_eq!(once, twice);
        assert!(twice.session.is_none());
        assert_invariant(&twice);
        for key in [USER_TOKEN, REFRESH_TOKEN, USER_DATA] {
            assert_eq!(store.storage.get(key).unwrap(), None);
        }
    }

    #[tokio::test]
    async fn subscribers_see_login() {
        let transport = ScriptedTransport::new();
        transport.reply(HttpMethod::Post, "/auth/login", 200, LOGIN_OK);
        let store = store(&transport);
        let mut rx = store.subscribe();
        let _ = rx.borrow_and_update();

        store.login("emilys", "emilyspass").await;

        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().token(), Some("access-1"));
    }
}
