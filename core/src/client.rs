//! The HTTP client and its request/response pipeline.
//!
//! # Design
//! One call runs through a fixed sequence:
//!
//! 1. build the `HttpRequest` from the client settings and `RequestConfig`
//! 2. attach the bearer token unless `skip_auth` is set
//! 3. run the custom request interceptors
//! 4. execute on the transport, racing the timeout and the cancellation token
//! 5. run the custom response interceptors on whatever response arrived
//! 6. 2xx: unwrap the envelope and decode `data` into `T`;
//!    anything else: normalize into `HttpError`
//!
//! Cancellation short-circuits everything after it fires: no interceptor,
//! no normalization, no session side effect. A transport 401 always clears
//! the session and redirects to the login path, even when the request asked
//! for the raw error with `skip_error_handler`.
//!
//! The client holds no per-request state, so one instance can serve any
//! number of concurrent calls.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::config::{ClientOptions, ClientSettings, EnvConfig, RequestConfig, RequestFlags};
use crate::envelope::{parse_body, unwrap_envelope};
use crate::error::{HttpError, RequestError, TransportError};
use crate::http::{HttpMethod, HttpRequest};
use crate::interceptor::{InterceptorChain, InterceptorId, RequestInterceptor, ResponseInterceptor};
use crate::session::{AuthSession, MemoryNavigator, Navigator, SessionStore};
use crate::transport::{Transport, UreqTransport};

/// Envelope-aware HTTP client. Cheap to clone; clones share interceptors
/// and collaborators.
#[derive(Clone)]
pub struct Client {
    inner: Arc<Inner>,
}

struct Inner {
    settings: ClientSettings,
    transport: Arc<dyn Transport>,
    session: Arc<dyn SessionStore>,
    navigator: Arc<dyn Navigator>,
    request_interceptors: InterceptorChain<dyn RequestInterceptor>,
    response_interceptors: InterceptorChain<dyn ResponseInterceptor>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("settings", &self.inner.settings)
            .field("request_interceptors", &self.inner.request_interceptors.len())
            .field("response_interceptors", &self.inner.response_interceptors.len())
            .finish()
    }
}

#[derive(Default)]
pub struct ClientBuilder {
    env: EnvConfig,
    options: ClientOptions,
    transport: Option<Arc<dyn Transport>>,
    session: Option<Arc<dyn SessionStore>>,
    navigator: Option<Arc<dyn Navigator>>,
}

impl ClientBuilder {
    pub fn env(mut self, env: EnvConfig) -> Self {
        self.env = env;
        self
    }

    pub fn options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn session(mut self, session: Arc<dyn SessionStore>) -> Self {
        self.session = Some(session);
        self
    }

    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn build(self) -> Client {
        let settings = ClientSettings::resolve(&self.env, self.options);
        Client {
            inner: Arc::new(Inner {
                settings,
                transport: self.transport.unwrap_or_else(|| Arc::new(UreqTransport::new())),
                session: self.session.unwrap_or_else(|| Arc::new(AuthSession::in_memory())),
                navigator: self.navigator.unwrap_or_else(|| Arc::new(MemoryNavigator::default())),
                request_interceptors: InterceptorChain::default(),
                response_interceptors: InterceptorChain::default(),
            }),
        }
    }
}

impl Client {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    pub fn base_url(&self) -> &str {
        &self.inner.settings.base_url
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.inner.settings
    }

    pub fn session(&self) -> Arc<dyn SessionStore> {
        Arc::clone(&self.inner.session)
    }

    /// A fresh token to pass via `RequestConfig::cancel_token`.
    pub fn cancellation_token(&self) -> CancellationToken {
        CancellationToken::new()
    }

    pub fn add_request_interceptor<I>(&self, interceptor: I) -> InterceptorId
    where
        I: RequestInterceptor + 'static,
    {
        self.inner.request_interceptors.add(Arc::new(interceptor))
    }

    pub fn remove_request_interceptor(&self, id: InterceptorId) -> bool {
        self.inner.request_interceptors.remove(id)
    }

    pub fn add_response_interceptor<I>(&self, interceptor: I) -> InterceptorId
    where
        I: ResponseInterceptor + 'static,
    {
        self.inner.response_interceptors.add(Arc::new(interceptor))
    }

    pub fn remove_response_interceptor(&self, id: InterceptorId) -> bool {
        self.inner.response_interceptors.remove(id)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, config: RequestConfig) -> Result<T, RequestError> {
        self.request(path, config.method(HttpMethod::Get)).await
    }

    pub async fn post<T, D>(&self, path: &str, data: &D, config: RequestConfig) -> Result<T, RequestError>
    where
        T: DeserializeOwned,
        D: Serialize + ?Sized,
    {
        self.request(path, config.method(HttpMethod::Post).json(data)).await
    }

    pub async fn put<T, D>(&self, path: &str, data: &D, config: RequestConfig) -> Result<T, RequestError>
    where
        T: DeserializeOwned,
        D: Serialize + ?Sized,
    {
        self.request(path, config.method(HttpMethod::Put).json(data)).await
    }

    pub async fn patch<T, D>(&self, path: &str, data: &D, config: RequestConfig) -> Result<T, RequestError>
    where
        T: DeserializeOwned,
        D: Serialize + ?Sized,
    {
        self.request(path, config.method(HttpMethod::Patch).json(data)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str, config: RequestConfig) -> Result<T, RequestError> {
        self.request(path, config.method(HttpMethod::Delete)).await
    }

    /// Run one request and decode the unwrapped payload into `T`.
    ///
    /// A payload that does not fit `T` is always an `HttpError` with code
    /// `ERR_DECODE`, even under `skip_error_handler`: there is no transport
    /// error to hand back raw.
    pub async fn request<T: DeserializeOwned>(&self, path: &str, config: RequestConfig) -> Result<T, RequestError> {
        let (data, status) = self.execute(path, config).await?;
        T::deserialize(&data).map_err(|e| {
            RequestError::Http(
                HttpError::new(format!("invalid response payload: {e}"))
                    .with_code("ERR_DECODE")
                    .with_status(status)
                    .with_data(data.clone()),
            )
        })
    }

    async fn execute(&self, path: &str, config: RequestConfig) -> Result<(Value, u16), RequestError> {
        let settings = &self.inner.settings;
        let RequestConfig {
            method,
            headers,
            query,
            body,
            timeout,
            cancel,
            flags,
            body_error,
        } = config;
        let cancel = cancel.unwrap_or_default();

        let timeout = timeout.unwrap_or(settings.timeout);
        let mut request = HttpRequest {
            method,
            url: settings.url_for(path),
            headers: settings.headers.clone(),
            query,
            body,
            timeout: Some(timeout),
        };
        for (name, value) in headers {
            request.set_header(&name, value);
        }

        if cancel.is_cancelled() {
            tracing::warn!(method = method.as_str(), url = %request.url, "request cancelled before dispatch");
            return Err(RequestError::Cancelled);
        }
        if let Some(error) = body_error {
            return Err(self.fail(error, flags));
        }

        self.authorize(&mut request, flags);
        self.inner.request_interceptors.apply(&mut request, flags)?;
        self.log_request(&request);

        let url = request.url.clone();
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::warn!(method = method.as_str(), url = %url, "request cancelled");
                return Err(RequestError::Cancelled);
            }
            outcome = tokio::time::timeout(timeout, self.inner.transport.execute(request)) => outcome,
        };

        let mut response = match outcome {
            Ok(Ok(response)) => response,
            Ok(Err(error)) => return Err(self.fail(error, flags)),
            Err(_) => {
                let error = TransportError::timeout(format!("timeout of {}ms exceeded", timeout.as_millis()));
                return Err(self.fail(error, flags));
            }
        };
        tracing::debug!(method = method.as_str(), url = %url, status = response.status, "response received");

        self.inner.response_interceptors.apply(&mut response, flags)?;

        if !response.is_success() {
            return Err(self.fail(TransportError::bad_status(response), flags));
        }

        let status = response.status;
        let data = unwrap_envelope(parse_body(&response.body), status).map_err(|error| {
            tracing::warn!(url = %url, status, code = ?error.code, message = %error.message, "logical failure");
            RequestError::Http(error)
        })?;
        Ok((data, status))
    }

    fn authorize(&self, request: &mut HttpRequest, flags: RequestFlags) {
        if flags.skip_auth {
            return;
        }
        if let Some(token) = self.inner.session.token().filter(|t| !t.is_empty()) {
            request.set_header("Authorization", format!("Bearer {token}"));
        }
    }

    /// The failure path for everything except cancellation.
    fn fail(&self, error: TransportError, flags: RequestFlags) -> RequestError {
        if error.status() == Some(401) {
            self.handle_unauthorized();
        }
        if flags.skip_error_handler {
            return RequestError::Transport(error);
        }
        let http = HttpError::from_transport(&error);
        tracing::warn!(
            status = ?http.status,
            code = ?http.code,
            message = %http.message,
            "request failed"
        );
        RequestError::Http(http)
    }

    fn handle_unauthorized(&self) {
        self.inner.session.clear_session();
        let login = self.inner.settings.login_path.as_str();
        if self.inner.navigator.current_path() != login {
            tracing::info!(to = login, "session rejected, redirecting to login");
            self.inner.navigator.navigate_to(login);
        }
    }

    fn log_request(&self, request: &HttpRequest) {
        if !self.inner.settings.is_dev {
            tracing::debug!(method = request.method.as_str(), url = %request.url, "sending request");
            return;
        }
        let headers: Vec<(&str, &str)> = request
            .headers
            .iter()
            .map(|(name, value)| {
                if name.eq_ignore_ascii_case("authorization") {
                    (name.as_str(), "<redacted>")
                } else {
                    (name.as_str(), value.as_str())
                }
            })
            .collect();
        tracing::debug!(
            method = request.method.as_str(),
            url = %request.url,
            ?headers,
            query = ?request.query,
            body_len = request.body.as_ref().map_or(0, String::len),
            "sending request"
        );
    }
}

/// Placeholder payload for endpoints whose `data` is irrelevant.
///
/// Accepts any JSON, including `null` and missing data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Ignored;

impl<'de> Deserialize<'de> for Ignored {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde::de::IgnoredAny::deserialize(deserializer)?;
        Ok(Ignored)
    }
}
