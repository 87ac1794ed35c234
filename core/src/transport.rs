//! The network seam.
//!
//! `Transport` executes one `HttpRequest`. Any status the server returns is
//! a successful execution; only failures where no response arrived are
//! errors. The client enforces timeouts and cancellation around `execute`.
//! A transport whose work outlives the dropped future (a blocking call, say)
//! must still bound itself by `HttpRequest::timeout`, which is also the upper
//! bound on how long a cancelled call keeps its connection.

use async_trait::async_trait;

use crate::error::TransportError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Blocking `ureq` agent driven from tokio's blocking pool.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        // Status interpretation belongs to the pipeline, so 4xx/5xx come back
        // as responses.
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for UreqTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let agent = self.agent.clone();
        tokio::task::spawn_blocking(move || execute_blocking(&agent, &request))
            .await
            .map_err(|e| TransportError::other(format!("transport task failed: {e}")))?
    }
}

fn execute_blocking(agent: &ureq::Agent, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
    let url = request.url.as_str();
    let body = request.body.as_deref();
    let result = match request.method {
        HttpMethod::Get => prepare(agent.get(url), request).call(),
        HttpMethod::Delete => prepare(agent.delete(url), request).call(),
        HttpMethod::Post => send(prepare(agent.post(url), request), body),
        HttpMethod::Put => send(prepare(agent.put(url), request), body),
        HttpMethod::Patch => send(prepare(agent.patch(url), request), body),
    };

    let mut response = result.map_err(classify)?;
    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                value.to_str().unwrap_or_default().to_string(),
            )
        })
        .collect();
    let body = response.body_mut().read_to_string().map_err(classify)?;

    Ok(HttpResponse { status, headers, body })
}

fn prepare<B>(mut builder: ureq::RequestBuilder<B>, request: &HttpRequest) -> ureq::RequestBuilder<B> {
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    for (name, value) in &request.query {
        builder = builder.query(name, value);
    }
    // The caller stops waiting at the deadline; the blocking call has to stop
    // too, or it keeps a pool thread and the socket until the peer gives up.
    builder.config().timeout_global(request.timeout).build()
}

fn send(
    builder: ureq::RequestBuilder<ureq::typestate::WithBody>,
    body: Option<&str>,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    match body {
        Some(body) => builder.send(body.as_bytes()),
        None => builder.send_empty(),
    }
}

fn classify(error: ureq::Error) -> TransportError {
    match error {
        e @ ureq::Error::Timeout(_) => TransportError::timeout(e.to_string()),
        ureq::Error::Io(e) if e.kind() == std::io::ErrorKind::TimedOut => {
            TransportError::timeout(e.to_string())
        }
        other => TransportError::network(other.to_string()),
    }
}
