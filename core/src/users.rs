//! User-management endpoints.

use uuid::Uuid;

use crate::client::{Client, Ignored};
use crate::config::RequestConfig;
use crate::error::RequestError;
use crate::http::HttpMethod;
use crate::types::{CreateUser, UpdateUser, User, UsersList, UsersListParams};

const USERS: &str = "/v1/users";

fn user_path(id: Uuid) -> String {
    format!("{USERS}/{id}")
}

#[derive(Debug, Clone, Copy)]
pub struct UserApi<'a> {
    client: &'a Client,
}

impl<'a> UserApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    pub async fn list(&self, params: &UsersListParams) -> Result<UsersList, RequestError> {
        let mut config = RequestConfig::new();
        if let Some(skip) = params.skip {
            config = config.query("skip", skip);
        }
        if let Some(limit) = params.limit {
            config = config.query("limit", limit);
        }
        if let Some(is_active) = params.is_active {
            config = config.query("is_active", is_active);
        }
        self.client.get(USERS, config).await
    }

    pub async fn get(&self, id: Uuid) -> Result<User, RequestError> {
        self.client.get(&user_path(id), RequestConfig::new()).await
    }

    pub async fn create(&self, input: &CreateUser) -> Result<User, RequestError> {
        self.client.post(USERS, input, RequestConfig::new()).await
    }

    pub async fn update(&self, id: Uuid, input: &UpdateUser) -> Result<User, RequestError> {
        self.client.put(&user_path(id), input, RequestConfig::new()).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), RequestError> {
        let _: Ignored = self.client.delete(&user_path(id), RequestConfig::new()).await?;
        Ok(())
    }

    pub async fn toggle_active(&self, id: Uuid) -> Result<User, RequestError> {
        let path = format!("{}/toggle-active", user_path(id));
        self.client
            .request(&path, RequestConfig::new().method(HttpMethod::Patch))
            .await
    }
}
