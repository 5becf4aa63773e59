use axum::http::{self, Request, StatusCode};
use axum::routing::RouterIntoService;
use http_body_util::BodyExt;
use mock_server::{app, app_with, Faults, Todo, TodosPage};
use tower::{Service, ServiceExt};

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: &str) -> Request<String> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(http::header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(body.to_string()).unwrap()
}

fn authed(method: &str, uri: &str, token: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::AUTHORIZATION, format!("Bearer {token}"))
        .body(String::new())
        .unwrap()
}

type App = RouterIntoService<String>;

async fn call(app: &mut App, request: Request<String>) -> axum::response::Response {
    ServiceExt::ready(app)
        .await
        .unwrap()
        .call(request)
        .await
        .unwrap()
}

async fn login(app: &mut App) -> String {
    let resp = call(
        app,
        json_request(
            "POST",
            "/auth/login",
            None,
            r#"{"username":"emilys","password":"emilyspass","expiresInMins":60}"#,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = body_json(resp).await;
    body["accessToken"].as_str().unwrap().to_string()
}

// --- auth ---

#[tokio::test]
async fn login_returns_profile_and_tokens() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/auth/login",
            None,
            r#"{"username":"emilys","password":"emilyspass"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["id"], 1);
    assert_eq!(body["username"], "emilys");
    assert_eq!(body["firstName"], "Emily");
    assert!(body["accessToken"].is_string());
    assert!(body["refreshToken"].is_string());
}

#[tokio::test]
async fn login_with_wrong_password_returns_400_with_message() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/auth/login",
            None,
            r#"{"username":"emilys","password":"nope"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["message"], "Invalid credentials");
}

#[tokio::test]
async fn todos_require_a_token() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/todos/user/1")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app()
        .oneshot(authed("GET", "/todos/user/1", "forged"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// --- list ---

#[tokio::test]
async fn list_returns_only_that_users_todos() {
    let mut app = app().into_service::<String>();
    let token = login(&mut app).await;

    let resp = call(&mut app, authed("GET", "/todos/user/1", &token)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let page: TodosPage = body_json(resp).await;
    assert_eq!(page.total, 2);
    assert_eq!(page.skip, 0);
    assert!(page.todos.iter().all(|t| t.user_id == 1));
}

// --- update ---

#[tokio::test]
async fn update_unknown_todo_returns_404() {
    let mut app = app().into_service::<String>();
    let token = login(&mut app).await;

    let resp = call(
        &mut app,
        json_request("PUT", "/todos/999", Some(&token), r#"{"completed":true}"#),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn bad_id_returns_400() {
    let mut app = app().into_service::<String>();
    let token = login(&mut app).await;

    let resp = call(&mut app, authed("DELETE", "/todos/not-a-number", &token)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn injected_faults_fail_only_their_route() {
    let mut app = app_with(Faults {
        put: true,
        delete_by_id: true,
        ..Faults::default()
    })
    .into_service::<String>();
    let token = login(&mut app).await;

    let resp = call(
        &mut app,
        json_request("PUT", "/todos/1", Some(&token), r#"{"completed":true}"#),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let resp = call(
        &mut app,
        json_request("PATCH", "/todos/1", Some(&token), r#"{"completed":true}"#),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Todo = body_json(resp).await;
    assert!(updated.completed);

    let resp = call(&mut app, authed("DELETE", "/todos/1", &token)).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let resp = call(&mut app, authed("DELETE", "/todos/delete/1", &token)).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

// --- full lifecycle ---

#[tokio::test]
async fn crud_lifecycle() {
    let mut app = app().into_service::<String>();
    let token = login(&mut app).await;

    // add
    let resp = call(
        &mut app,
        json_request(
            "POST",
            "/todos/add",
            Some(&token),
            r#"{"todo":"Call mom","completed":false,"userId":1}"#,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Todo = body_json(resp).await;
    assert_eq!(created.todo, "Call mom");
    assert_eq!(created.user_id, 1);
    let id = created.id;

    // list now has three
    let resp = call(&mut app, authed("GET", "/todos/user/1", &token)).await;
    let page: TodosPage = body_json(resp).await;
    assert_eq!(page.total, 3);

    // put: only completed
    let resp = call(
        &mut app,
        json_request("PUT", &format!("/todos/{id}"), Some(&token), r#"{"completed":true}"#),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Todo = body_json(resp).await;
    assert_eq!(updated.todo, "Call mom"); // unchanged
    assert!(updated.completed);

    // patch: only text
    let resp = call(
        &mut app,
        json_request("PATCH", &format!("/todos/{id}"), Some(&token), r#"{"todo":"Call dad"}"#),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Todo = body_json(resp).await;
    assert_eq!(updated.todo, "Call dad");
    assert!(updated.completed); // unchanged from previous update

    // delete via the primary path
    let resp = call(&mut app, authed("DELETE", &format!("/todos/{id}"), &token)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["isDeleted"], true);

    // delete again via either path: 404
    let resp = call(&mut app, authed("DELETE", &format!("/todos/delete/{id}"), &token)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = body_bytes(resp).await;
    assert!(!body.is_empty());

    // list back to the seeded two
    let resp = call(&mut app, authed("GET", "/todos/user/1", &token)).await;
    let page: TodosPage = body_json(resp).await;
    assert_eq!(page.total, 2);
}
