//! Wire DTOs for the DummyJSON auth and todo endpoints.
//!
//! Field names follow the API's camelCase JSON; Rust code uses snake_case
//! through `rename_all`.

use serde::{Deserialize, Serialize};

/// Profile of the authenticated user, as persisted under `userData`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
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

/// Credentials sent to `POST /auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    pub expires_in_mins: u32,
}

/// Successful login payload: the profile plus both tokens at top level.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(flatten)]
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

/// A single todo item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: i64,
    pub todo: String,
    pub completed: bool,
    pub user_id: i64,
}

impl Todo {
    /// Overwrite every field present in `patch`. The id is identity and is
    /// never changed by a merge.
    pub fn apply(&mut self, patch: &TodoPatch) {
        if let Some(todo) = &patch.todo {
            self.todo = todo.clone();
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
        if let Some(user_id) = patch.user_id {
            self.user_id = user_id;
        }
    }
}

/// Request payload for `POST /todos/add`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewTodo {
    pub todo: String,
    pub completed: bool,
    pub user_id: i64,
}

/// A partial todo. Used as the update body and to read update responses,
/// so only the fields actually sent or returned are merged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TodoPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub todo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
}

impl TodoPatch {
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }

    pub fn todo(todo: impl Into<String>) -> Self {
        Self {
            todo: Some(todo.into()),
            ..Self::default()
        }
    }
}

/// Envelope returned by `GET /todos/user/{userId}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TodosPage {
    pub todos: Vec<Todo>,
    pub total: u64,
    pub skip: u64,
    pub limit: u64,
}

/// Error body the API returns alongside 4xx statuses.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiMessage {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn todo() -> Todo {
        Todo {
            id: 1,
            todo: "Buy milk".to_string(),
            completed: false,
            user_id: 1,
        }
    }

    #[test]
    fn login_response_flattens_profile() {
        let json = r#"{
            "id": 1, "username": "emilys", "email": "emily.johnson@x.dummyjson.com",
            "firstName": "Emily", "lastName": "Johnson", "gender": "female",
            "image": "https://dummyjson.com/icon/emilys/128",
            "accessToken": "access", "refreshToken": "refresh"
        }"#;
        let resp: LoginResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.user.id, 1);
        assert_eq!(resp.user.first_name, "Emily");
        assert_eq!(resp.access_token, "access");
        assert_eq!(resp.refresh_token, "refresh");
    }

    #[test]
    fn stored_profile_has_no_token_fields() {
        let resp = LoginResponse {
            user: User {
                id: 1,
                username: "emilys".to_string(),
                email: "e@x".to_string(),
                first_name: "Emily".to_string(),
                last_name: "Johnson".to_string(),
                gender: "female".to_string(),
                image: "img".to_string(),
            },
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
        };
        let json = serde_json::to_value(&resp.user).unwrap();
        assert!(json.get("accessToken").is_none());
        assert!(json.get("refreshToken").is_none());
        assert_eq!(json["firstName"], "Emily");
    }

    #[test]
    fn patch_skips_absent_fields() {
        let json = serde_json::to_value(TodoPatch::completed(true)).unwrap();
        assert_eq!(json, serde_json::json!({"completed": true}));
    }

    #[test]
    fn apply_overwrites_present_fields_only() {
        let mut t = todo();
        t.apply(&TodoPatch::completed(true));
        assert!(t.completed);
        assert_eq!(t.todo, "Buy milk");

        t.apply(&TodoPatch::todo("Buy bread"));
        assert_eq!(t.todo, "Buy bread");
        assert!(t.completed);
    }

    #[test]
    fn apply_never_changes_id() {
        let mut t = todo();
        t.apply(&TodoPatch {
            id: Some(99),
            ..TodoPatch::completed(true)
        });
        assert_eq!(t.id, 1);
    }

    #[test]
    fn new_todo_uses_camel_case() {
        let body = NewTodo {
            todo: "Walk dog".to_string(),
            completed: false,
            user_id: 5,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["userId"], 5);
        assert!(json.get("user_id").is_none());
    }
}
