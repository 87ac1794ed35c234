//! Environment, client, and per-request configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::error::TransportError;
use crate::http::{set_header, HttpMethod};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(30_000);
pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:3000/api";
pub const DEFAULT_LOGIN_PATH: &str = "/login";

/// Application environment, read once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvConfig {
    pub api_base_url: String,
    pub is_dev: bool,
    /// Prefix for persisted keys, so several apps can share one storage.
    pub namespace: String,
    pub login_path: String,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            is_dev: true,
            namespace: "app".to_string(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
        }
    }
}

impl EnvConfig {
    /// Read `APP_API_BASE_URL`, `APP_ENV`, `APP_NAMESPACE` and
    /// `APP_LOGIN_PATH`, falling back to the defaults for anything unset.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            api_base_url: non_empty("APP_API_BASE_URL").unwrap_or(defaults.api_base_url),
            is_dev: non_empty("APP_ENV")
                .map(|env| env.eq_ignore_ascii_case("development"))
                .unwrap_or(defaults.is_dev),
            namespace: non_empty("APP_NAMESPACE").unwrap_or(defaults.namespace),
            login_path: non_empty("APP_LOGIN_PATH").unwrap_or(defaults.login_path),
        }
    }

    pub fn storage_key(&self, key: &str) -> String {
        format!("{}:{key}", self.namespace)
    }

    /// File under `dir` holding the state persisted as `storage_key(key)`.
    /// The `:` separator is not portable in file names, so it becomes `_`.
    pub fn storage_file(&self, dir: &Path, key: &str) -> PathBuf {
        dir.join(format!("{}.json", self.storage_key(key).replace(':', "_")))
    }
}

/// Caller overrides applied on top of the client defaults.
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    pub base_url: Option<String>,
    pub timeout: Option<Duration>,
    pub headers: Vec<(String, String)>,
}

/// Fully resolved client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub base_url: String,
    pub timeout: Duration,
    pub headers: Vec<(String, String)>,
    pub is_dev: bool,
    pub login_path: String,
}

impl ClientSettings {
    /// Merge `options` over the defaults derived from `env`.
    ///
    /// Scalars replace the default when set. Headers merge key by key
    /// (case-insensitive) and caller values win.
    pub fn resolve(env: &EnvConfig, options: ClientOptions) -> Self {
        let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        for (name, value) in options.headers {
            set_header(&mut headers, &name, value);
        }
        Self {
            base_url: options
                .base_url
                .unwrap_or_else(|| env.api_base_url.clone())
                .trim_end_matches('/')
                .to_string(),
            timeout: options.timeout.unwrap_or(DEFAULT_TIMEOUT),
            headers,
            is_dev: env.is_dev,
            login_path: env.login_path.clone(),
        }
    }

    /// Join `path` onto the base URL. Absolute URLs pass through.
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        if path.is_empty() {
            return self.base_url.clone();
        }
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

/// Flags that change how the pipeline treats one request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestFlags {
    /// Do not attach the bearer token.
    pub skip_auth: bool,
    /// Return the raw `TransportError` instead of a normalized `HttpError`.
    pub skip_error_handler: bool,
}

/// Per-call configuration. Built fresh for each request.
#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    pub method: HttpMethod,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub body: Option<String>,
    pub timeout: Option<Duration>,
    pub cancel: Option<CancellationToken>,
    pub flags: RequestFlags,
    pub(crate) body_error: Option<TransportError>,
}

impl RequestConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((name.into(), value.to_string()));
        self
    }

    /// Serialize `body` as the JSON request body.
    ///
    /// A serialization failure is reported when the request runs, through
    /// the normal failure path.
    pub fn json<D: Serialize + ?Sized>(mut self, body: &D) -> Self {
        match serde_json::to_string(body) {
            Ok(json) => {
                self.body = Some(json);
                self.body_error = None;
            }
            Err(e) => {
                self.body = None;
                self.body_error = Some(TransportError::other(format!("failed to serialize request body: {e}")));
            }
        }
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn skip_auth(mut self, skip: bool) -> Self {
        self.flags.skip_auth = skip;
        self
    }

    pub fn skip_error_handler(mut self, skip: bool) -> Self {
        self.flags.skip_error_handler = skip;
        self
    }
}
