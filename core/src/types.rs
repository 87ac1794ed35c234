//! Domain DTOs for the auth and user-management endpoints.
//!
//! # Design
//! These mirror the mock-server's schema but are defined independently, so
//! the integration tests catch schema drift between the two crates.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user account as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    #[serde(default)]
    pub avatar: Option<String>,
    pub is_active: bool,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub password: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Partial update. Omitted fields stay unchanged on the server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUser {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// One page of users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsersList {
    pub items: Vec<User>,
    pub total: u64,
    pub skip: u64,
    pub limit: u64,
}

#[derive(Debug, Clone, Default)]
pub struct UsersListParams {
    pub skip: Option<u64>,
    pub limit: Option<u64>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    #[serde(default)]
    pub expire_time: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_tolerates_missing_optional_fields() {
        let user: User = serde_json::from_str(
            r#"{"id":"00000000-0000-0000-0000-000000000001","username":"amy","name":"Amy","is_active":true}"#,
        )
        .unwrap();
        assert!(user.roles.is_empty());
        assert!(user.avatar.is_none());
    }

    #[test]
    fn update_user_omits_unset_fields() {
        let json = serde_json::to_value(UpdateUser {
            name: Some("New".to_string()),
            avatar: None,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"name": "New"}));
    }

    #[test]
    fn login_response_uses_camel_case() {
        let resp: LoginResponse = serde_json::from_str(r#"{"token":"t","expireTime":null}"#).unwrap();
        assert_eq!(resp.token, "t");
        assert_eq!(resp.expire_time, None);
    }
}
