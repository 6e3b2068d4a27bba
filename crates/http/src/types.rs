//! Request and response bodies of the admin API

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Login request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Tokens issued on login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Signed-in admin, when the server includes it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin: Option<Admin>,
}

/// Body of a successful `/refresh` exchange
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub access_token: String,
    /// Present when the server rotates refresh tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

/// Forgot-password request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// Change-password request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

/// Plain acknowledgement returned by mutating endpoints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: String,
}

/// Administrator account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Admin {
    pub id: u64,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    /// Fields this client does not model
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// Article
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: u64,
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// End-user account managed from the dashboard
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

/// One page of a listing. The server names the list after the resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    #[serde(alias = "articles", alias = "users")]
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub pages: u64,
}

/// Article create/update payload. Unset fields are left out of the body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArticleInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// User create/update payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// How multiple filters are combined by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SearchLogic {
    And,
    Or,
}

/// Query parameters for `GET /articles`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArticleQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u64>,
    /// Comma-separated fields, `-` prefix for descending (`-created_at,title`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_logic: Option<SearchLogic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_id_min: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_id_max: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at_min: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at_max: Option<NaiveDateTime>,
}

/// Query parameters for `GET /users`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_logic: Option<SearchLogic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at_min: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at_max: Option<NaiveDateTime>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn listing_accepts_resource_named_lists() {
        let page: Paginated<Article> = serde_json::from_value(json!({
            "articles": [{"id": 1, "title": "t", "content": "c", "author_email": "a@x.io"}],
            "total": 1, "page": 1, "per_page": 10, "pages": 1
        }))
        .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].author_email.as_deref(), Some("a@x.io"));

        let page: Paginated<User> = serde_json::from_value(json!({
            "users": [], "total": 0, "page": 1, "per_page": 10, "pages": 0
        }))
        .unwrap();
        assert!(page.items.is_empty());
    }

    #[test]
    fn unknown_fields_are_kept() {
        let user: User = serde_json::from_value(json!({
            "id": 3, "email": "u@x.io", "is_active": true
        }))
        .unwrap();
        assert_eq!(user.extra.get("is_active"), Some(&json!(true)));
    }

    #[test]
    fn unset_input_fields_are_omitted() {
        let body = serde_json::to_value(ArticleInput {
            title: Some("New".into()),
            content: None,
        })
        .unwrap();
        assert_eq!(body, json!({"title": "New"}));
    }

    #[test]
    fn refresh_response_without_rotation() {
        let r: RefreshResponse = serde_json::from_value(json!({"access_token": "a2"})).unwrap();
        assert_eq!(r.access_token, "a2");
        assert!(r.refresh_token.is_none());
    }

    #[test]
    fn search_logic_is_uppercase() {
        assert_eq!(serde_json::to_value(SearchLogic::Or).unwrap(), json!("OR"));
    }
}
