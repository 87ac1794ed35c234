//! In-memory backend speaking the unified response envelope.
//!
//! Every route under `/api/v1` answers with `{ code, message, data }`.
//! Validation failures come back as transport 200 with a non-2xx envelope
//! code; missing or unknown bearer tokens get a transport 401.

use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin123";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub avatar: Option<String>,
    pub is_active: bool,
    pub roles: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct Envelope<T> {
    pub code: u16,
    pub message: String,
    pub data: Option<T>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub expire_time: Option<i64>,
}

#[derive(Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub password: String,
    pub name: String,
    pub avatar: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Deserialize)]
pub struct ListParams {
    pub skip: Option<usize>,
    pub limit: Option<usize>,
    pub is_active: Option<bool>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct UsersList {
    pub items: Vec<User>,
    pub total: usize,
    pub skip: usize,
    pub limit: usize,
}

struct Account {
    user: User,
    password: String,
}

pub struct Store {
    accounts: RwLock<HashMap<Uuid, Account>>,
    tokens: RwLock<HashMap<String, Uuid>>,
}

pub type Db = Arc<Store>;

/// A failed request: transport status plus envelope code and message.
pub struct ApiFailure {
    status: StatusCode,
    code: u16,
    message: String,
}

impl ApiFailure {
    fn new(status: StatusCode, message: &str) -> Self {
        Self {
            status,
            code: status.as_u16(),
            message: message.to_string(),
        }
    }

    /// Transport 200 with a failing envelope code.
    fn logical(code: u16, message: &str) -> Self {
        Self {
            status: StatusCode::OK,
            code,
            message: message.to_string(),
        }
    }

    fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "not authenticated")
    }

    fn user_not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "user not found")
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        let body = Envelope::<()> {
            code: self.code,
            message: self.message,
            data: None,
        };
        (self.status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<(StatusCode, Json<Envelope<T>>), ApiFailure>;

fn ok<T>(data: T) -> ApiResult<T> {
    respond(StatusCode::OK, data)
}

fn respond<T>(status: StatusCode, data: T) -> ApiResult<T> {
    Ok((
        status,
        Json(Envelope {
            code: status.as_u16(),
            message: "success".to_string(),
            data: Some(data),
        }),
    ))
}

pub fn app() -> Router {
    let admin = User {
        id: Uuid::new_v4(),
        username: ADMIN_USERNAME.to_string(),
        name: "Administrator".to_string(),
        avatar: None,
        is_active: true,
        roles: vec!["admin".to_string()],
    };
    let mut accounts = HashMap::new();
    accounts.insert(
        admin.id,
        Account {
            user: admin,
            password: ADMIN_PASSWORD.to_string(),
        },
    );
    let db: Db = Arc::new(Store {
        accounts: RwLock::new(accounts),
        tokens: RwLock::default(),
    });

    let v1 = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/users/me", get(current_user))
        .route("/users", get(list_users).post(create_user))
        .route("/users/{id}", get(get_user).put(update_user).delete(delete_user))
        .route("/users/{id}/toggle-active", patch(toggle_active));

    let api = Router::new()
        .nest("/v1", v1)
        .route("/health", get(health))
        .route("/debug/delay/{ms}", get(delay))
        .route("/debug/status/{code}", get(bare_status));

    Router::new().nest("/api", api).with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn authenticate(db: &Db, headers: &HeaderMap) -> Result<Uuid, ApiFailure> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(ApiFailure::unauthorized)?;
    db.tokens
        .read()
        .await
        .get(token)
        .copied()
        .ok_or_else(ApiFailure::unauthorized)
}

async fn login(State(db): State<Db>, Json(input): Json<LoginRequest>) -> ApiResult<LoginResponse> {
    let accounts = db.accounts.read().await;
    let account = accounts
        .values()
        .find(|a| a.user.username == input.username && a.password == input.password)
        .ok_or_else(|| ApiFailure::new(StatusCode::UNAUTHORIZED, "invalid username or password"))?;
    if !account.user.is_active {
        return Err(ApiFailure::new(StatusCode::FORBIDDEN, "account disabled"));
    }
    let token = Uuid::new_v4().simple().to_string();
    db.tokens.write().await.insert(token.clone(), account.user.id);
    tracing::info!(username = %account.user.username, "login");
    ok(LoginResponse {
        token,
        expire_time: None,
    })
}

async fn logout(State(db): State<Db>, headers: HeaderMap) -> ApiResult<()> {
    authenticate(&db, &headers).await?;
    if let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    {
        db.tokens.write().await.remove(token);
    }
    ok(())
}

async fn current_user(State(db): State<Db>, headers: HeaderMap) -> ApiResult<User> {
    let id = authenticate(&db, &headers).await?;
    let accounts = db.accounts.read().await;
    let account = accounts.get(&id).ok_or_else(ApiFailure::unauthorized)?;
    ok(account.user.clone())
}

async fn list_users(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> ApiResult<UsersList> {
    authenticate(&db, &headers).await?;
    let accounts = db.accounts.read().await;
    let mut users: Vec<User> = accounts
        .values()
        .map(|a| a.user.clone())
        .filter(|u| params.is_active.map_or(true, |active| u.is_active == active))
        .collect();
    users.sort_by(|a, b| a.username.cmp(&b.username));

    let skip = params.skip.unwrap_or(0);
    let limit = params.limit.unwrap_or(20);
    let total = users.len();
    let items = users.into_iter().skip(skip).take(limit).collect();
    ok(UsersList {
        items,
        total,
        skip,
        limit,
    })
}

async fn create_user(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<CreateUser>,
) -> ApiResult<User> {
    authenticate(&db, &headers).await?;
    if input.username.trim().is_empty() || input.name.trim().is_empty() {
        return Err(ApiFailure::logical(422, "username and name must not be empty"));
    }
    if input.password.len() < 6 {
        return Err(ApiFailure::logical(422, "password must be at least 6 characters"));
    }
    let mut accounts = db.accounts.write().await;
    if accounts.values().any(|a| a.user.username == input.username) {
        return Err(ApiFailure::new(StatusCode::CONFLICT, "username already exists"));
    }
    let user = User {
        id: Uuid::new_v4(),
        username: input.username,
        name: input.name,
        avatar: input.avatar,
        is_active: true,
        roles: vec!["user".to_string()],
    };
    accounts.insert(
        user.id,
        Account {
            user: user.clone(),
            password: input.password,
        },
    );
    respond(StatusCode::CREATED, user)
}

async fn get_user(State(db): State<Db>, headers: HeaderMap, Path(id): Path<Uuid>) -> ApiResult<User> {
    authenticate(&db, &headers).await?;
    let accounts = db.accounts.read().await;
    let account = accounts.get(&id).ok_or_else(ApiFailure::user_not_found)?;
    ok(account.user.clone())
}

async fn update_user(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateUser>,
) -> ApiResult<User> {
    authenticate(&db, &headers).await?;
    let mut accounts = db.accounts.write().await;
    let account = accounts.get_mut(&id).ok_or_else(ApiFailure::user_not_found)?;
    if let Some(name) = input.name {
        if name.trim().is_empty() {
            return Err(ApiFailure::logical(422, "name must not be empty"));
        }
        account.user.name = name;
    }
    if let Some(avatar) = input.avatar {
        account.user.avatar = Some(avatar);
    }
    ok(account.user.clone())
}

async fn delete_user(State(db): State<Db>, headers: HeaderMap, Path(id): Path<Uuid>) -> ApiResult<()> {
    let caller = authenticate(&db, &headers).await?;
    if caller == id {
        return Err(ApiFailure::new(StatusCode::FORBIDDEN, "cannot delete yourself"));
    }
    db.accounts
        .write()
        .await
        .remove(&id)
        .ok_or_else(ApiFailure::user_not_found)?;
    db.tokens.write().await.retain(|_, owner| *owner != id);
    ok(())
}

async fn toggle_active(State(db): State<Db>, headers: HeaderMap, Path(id): Path<Uuid>) -> ApiResult<User> {
    authenticate(&db, &headers).await?;
    let mut accounts = db.accounts.write().await;
    let account = accounts.get_mut(&id).ok_or_else(ApiFailure::user_not_found)?;
    account.user.is_active = !account.user.is_active;
    ok(account.user.clone())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn delay(Path(ms): Path<u64>) -> ApiResult<u64> {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    ok(ms)
}

async fn bare_status(Path(code): Path<u16>) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST)
}
