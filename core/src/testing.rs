//! Scripted transport for store unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use tokio::sync::Semaphore;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::transport::Transport;

pub const BASE_URL: &str = "http://api.test";

type Reply = Result<HttpResponse, ApiError>;

/// Replies are queued per (method, path); the last reply of a queue repeats.
/// Unscripted routes answer 404. With a gate, every request first waits for
/// a permit, so tests can observe state while requests are in flight.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    routes: Arc<Mutex<HashMap<(HttpMethod, String), VecDeque<Reply>>>>,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gated() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let transport = Self {
            gate: Some(gate.clone()),
            ..Self::default()
        };
        (transport, gate)
    }

    pub fn reply(&self, method: HttpMethod, path: &str, status: u16, body: &str) -> &Self {
        self.push(method, path, Ok(HttpResponse::new(status, body)))
    }

    pub fn fail(&self, method: HttpMethod, path: &str) -> &Self {
        self.push(method, path, Err(ApiError::Transport("connection refused".to_string())))
    }

    fn push(&self, method: HttpMethod, path: &str, reply: Reply) -> &Self {
        self.routes
            .lock()
            .unwrap()
            .entry((method, format!("{BASE_URL}{path}")))
            .or_default()
            .push_back(reply);
        self
    }

    /// Every request executed so far, as (method, path relative to the base).
    pub fn calls(&self) -> Vec<(HttpMethod, String)> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| (r.method, r.path.trim_start_matches(BASE_URL).to_string()))
            .collect()
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Transport for ScriptedTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|e| ApiError::Transport(e.to_string()))?
                .forget();
        }
        let key = (request.method, request.path.clone());
        self.requests.lock().unwrap().push(request);

        let mut routes = self.routes.lock().unwrap();
        match routes.get_mut(&key) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) if !queue.is_empty() => queue[0].clone(),
            _ => Ok(HttpResponse::new(404, r#"{"message":"not scripted"}"#)),
        }
    }
}
