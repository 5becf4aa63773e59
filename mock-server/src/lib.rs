//! In-memory stand-in for the parts of the DummyJSON API the app consumes.
//!
//! Two demo users are seeded (`emilys`/`emilyspass` with id 1 and
//! `michaelw`/`michaelwpass` with id 2). Todo routes require a bearer token
//! issued by `/auth/login`. `Faults` makes individual mutation routes answer
//! 500 so the client's fallback routes can be exercised.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: i64,
    pub todo: String,
    pub completed: bool,
    pub user_id: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub image: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginInput {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub expires_in_mins: Option<u32>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginOutput {
    #[serde(flatten)]
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Serialize, Deserialize)]
pub struct TodosPage {
    pub todos: Vec<Todo>,
    pub total: usize,
    pub skip: usize,
    pub limit: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTodo {
    pub todo: String,
    #[serde(default)]
    pub completed: bool,
    pub user_id: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTodo {
    pub todo: Option<String>,
    pub completed: Option<bool>,
    pub user_id: Option<i64>,
}

/// Routes that should answer 500 instead of doing their work.
#[derive(Clone, Copy, Debug, Default)]
pub struct Faults {
    pub put: bool,
    pub patch: bool,
    pub delete_by_id: bool,
    pub delete_path: bool,
}

struct Account {
    user: User,
    password: &'static str,
}

struct Db {
    accounts: Vec<Account>,
    tokens: HashMap<String, i64>,
    todos: BTreeMap<i64, Todo>,
    next_id: i64,
}

#[derive(Clone)]
pub struct AppState {
    db: Arc<RwLock<Db>>,
    faults: Faults,
}

fn account(id: i64, username: &str, password: &'static str, first: &str, last: &str, gender: &str) -> Account {
    Account {
        user: User {
            id,
            username: username.to_string(),
            email: format!("{first}.{last}@x.dummyjson.com").to_lowercase(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            gender: gender.to_string(),
            image: format!("https://dummyjson.com/icon/{username}/128"),
        },
        password,
    }
}

fn seed() -> Db {
    let todos = [
        (1, "Buy milk", false, 1),
        (2, "Walk the dog", true, 1),
        (3, "Read a book", false, 2),
    ]
    .into_iter()
    .map(|(id, todo, completed, user_id)| {
        (
            id,
            Todo {
                id,
                todo: todo.to_string(),
                completed,
                user_id,
            },
        )
    })
    .collect();

    Db {
        accounts: vec![
            account(1, "emilys", "emilyspass", "Emily", "Johnson", "female"),
            account(2, "michaelw", "michaelwpass", "Michael", "Williams", "male"),
        ],
        tokens: HashMap::new(),
        todos,
        next_id: 4,
    }
}

pub fn app() -> Router {
    app_with(Faults::default())
}

pub fn app_with(faults: Faults) -> Router {
    let state = AppState {
        db: Arc::new(RwLock::new(seed())),
        faults,
    };
    Router::new()
        .route("/auth/login", post(login))
        .route("/todos/user/{user_id}", get(list_user_todos))
        .route("/todos/add", post(add_todo))
        .route(
            "/todos/{id}",
            put(put_todo).patch(patch_todo).delete(delete_by_id),
        )
        .route("/todos/delete/{id}", delete(delete_by_path))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with(listener: TcpListener, faults: Faults) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(faults)).await
}

fn message(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<i64, Response> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| message(StatusCode::UNAUTHORIZED, "Access Token is required"))?;
    state
        .db
        .read()
        .await
        .tokens
        .get(token)
        .copied()
        .ok_or_else(|| message(StatusCode::UNAUTHORIZED, "Invalid/Expired Token!"))
}

async fn login(State(state): State<AppState>, Json(input): Json<LoginInput>) -> Response {
    let mut db = state.db.write().await;
    let Some(user) = db
        .accounts
        .iter()
        .find(|a| a.user.username == input.username && a.password == input.password)
        .map(|a| a.user.clone())
    else {
        return message(StatusCode::BAD_REQUEST, "Invalid credentials");
    };

    let access_token = Uuid::new_v4().to_string();
    db.tokens.insert(access_token.clone(), user.id);
    info!(
        "login {} (expires in {} mins)",
        user.username,
        input.expires_in_mins.unwrap_or(60)
    );

    Json(LoginOutput {
        user,
        access_token,
        refresh_token: Uuid::new_v4().to_string(),
    })
    .into_response()
}

async fn list_user_todos(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<i64>,
) -> Response {
    if let Err(rejection) = authenticate(&state, &headers).await {
        return rejection;
    }
    let db = state.db.read().await;
    let todos: Vec<Todo> = db
        .todos
        .values()
        .filter(|t| t.user_id == user_id)
        .cloned()
        .collect();
    let total = todos.len();
    Json(TodosPage {
        todos,
        total,
        skip: 0,
        limit: total,
    })
    .into_response()
}

async fn add_todo(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<NewTodo>,
) -> Response {
    if let Err(rejection) = authenticate(&state, &headers).await {
        return rejection;
    }
    let mut db = state.db.write().await;
    let todo = Todo {
        id: db.next_id,
        todo: input.todo,
        completed: input.completed,
        user_id: input.user_id,
    };
    db.next_id += 1;
    db.todos.insert(todo.id, todo.clone());
    (StatusCode::CREATED, Json(todo)).into_response()
}

async fn update(state: &AppState, headers: &HeaderMap, id: i64, input: UpdateTodo) -> Response {
    if let Err(rejection) = authenticate(state, headers).await {
        return rejection;
    }
    let mut db = state.db.write().await;
    let Some(todo) = db.todos.get_mut(&id) else {
        return message(StatusCode::NOT_FOUND, &format!("Todo with id '{id}' not found"));
    };
    if let Some(text) = input.todo {
        todo.todo = text;
    }
    if let Some(completed) = input.completed {
        todo.completed = completed;
    }
    if let Some(user_id) = input.user_id {
        todo.user_id = user_id;
    }
    Json(todo.clone()).into_response()
}

async fn put_todo(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(input): Json<UpdateTodo>,
) -> Response {
    if state.faults.put {
        debug!("PUT /todos/{id}: injected failure");
        return message(StatusCode::INTERNAL_SERVER_ERROR, "injected failure");
    }
    update(&state, &headers, id, input).await
}

async fn patch_todo(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(input): Json<UpdateTodo>,
) -> Response {
    if state.faults.patch {
        debug!("PATCH /todos/{id}: injected failure");
        return message(StatusCode::INTERNAL_SERVER_ERROR, "injected failure");
    }
    update(&state, &headers, id, input).await
}

async fn remove(state: &AppState, headers: &HeaderMap, id: i64) -> Response {
    if let Err(rejection) = authenticate(state, headers).await {
        return rejection;
    }
    let mut db = state.db.write().await;
    match db.todos.remove(&id) {
        Some(todo) => Json(json!({
            "id": todo.id,
            "todo": todo.todo,
            "completed": todo.completed,
            "userId": todo.user_id,
            "isDeleted": true,
        }))
        .into_response(),
        None => message(StatusCode::NOT_FOUND, &format!("Todo with id '{id}' not found")),
    }
}

async fn delete_by_id(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    if state.faults.delete_by_id {
        debug!("DELETE /todos/{id}: injected failure");
        return message(StatusCode::INTERNAL_SERVER_ERROR, "injected failure");
    }
    remove(&state, &headers, id).await
}

async fn delete_by_path(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    if state.faults.delete_path {
        debug!("DELETE /todos/delete/{id}: injected failure");
        return message(StatusCode::INTERNAL_SERVER_ERROR, "injected failure");
    }
    remove(&state, &headers, id).await
}
