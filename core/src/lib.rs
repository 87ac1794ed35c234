//! Envelope-aware HTTP client for the admin dashboard API.
//!
//! # Overview
//! Every backend response is wrapped in `{ code, message?, data? }`. The
//! `Client` unwraps successful envelopes to their `data`, injects the bearer
//! token from an injected `SessionStore`, and normalizes every failure
//! (logical, HTTP status, timeout, network) into one `HttpError` whose
//! `message` can be shown to users as-is.
//!
//! # Design
//! - Requests and responses are plain data (`HttpRequest`/`HttpResponse`);
//!   the network sits behind the `Transport` trait, `UreqTransport` by default.
//! - Session state and navigation are injected collaborators, never globals.
//!   `AuthSession`, `LanguageStore` and `PreferenceStore` persist to
//!   namespaced JSON files.
//! - Interceptors are explicit ordered chains on the client, addressable by id.
//! - `AuthApi` and `UserApi` are thin typed wrappers over the client.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod auth;
pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod http;
pub mod interceptor;
mod persist;
pub mod preferences;
pub mod session;
pub mod transport;
pub mod types;
pub mod users;

pub use auth::AuthApi;
pub use client::{Client, ClientBuilder, Ignored};
pub use config::{ClientOptions, ClientSettings, EnvConfig, RequestConfig, RequestFlags};
pub use envelope::Envelope;
pub use error::{format_error_message, HttpError, RequestError, TransportError, TransportErrorKind};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use interceptor::{InterceptorId, RequestInterceptor, ResponseInterceptor};
pub use preferences::{Language, LanguageStore, PreferenceStore, PreferencesUpdate, UserPreferences};
pub use session::{AuthSession, AuthState, MemoryNavigator, Navigator, SessionStore};
pub use tokio_util::sync::CancellationToken;
pub use transport::{Transport, UreqTransport};
pub use types::{CreateUser, LoginRequest, LoginResponse, UpdateUser, User, UsersList, UsersListParams};
pub use users::UserApi;
