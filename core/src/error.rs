//! Error types for the request pipeline.
//!
//! # Design
//! Every failure a caller can observe is one of three things: a normalized
//! `HttpError` (the common case), the raw `TransportError` (only when the
//! request opted out with `skip_error_handler`), or `Cancelled`. Normalization
//! happens once, in the pipeline; callers branch on `HttpError` and display
//! its `message` directly.

use serde::Serialize;
use serde_json::Value;

use crate::envelope::parse_body;
use crate::http::HttpResponse;

const FALLBACK_MESSAGE: &str = "request failed";

/// The normalized error surfaced for every failed request.
///
/// `message` is never empty.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct HttpError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl HttpError {
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            message: if message.is_empty() {
                FALLBACK_MESSAGE.to_string()
            } else {
                message
            },
            status: None,
            code: None,
            data: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Normalize a transport failure.
    ///
    /// `code` prefers a truthy `code` field from the response body and falls
    /// back to the transport's own classification code. `data` is the parsed
    /// response body; an empty or `null` body leaves it `None`, so callers
    /// can tell "no payload" apart without matching on `Value::Null`.
    pub fn from_transport(error: &TransportError) -> Self {
        let body = error.response.as_ref().map(|r| parse_body(&r.body));
        let code = body
            .as_ref()
            .and_then(body_code)
            .unwrap_or_else(|| error.code().to_string());
        Self {
            message: format_error_message(error),
            status: error.status(),
            code: Some(code),
            data: body.filter(|b| !b.is_null()),
        }
    }
}

/// How a transport-level failure was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// No response before the deadline.
    Timeout,
    /// Connection, DNS, or I/O failure with no response.
    Network,
    /// A response arrived with a non-2xx status.
    BadStatus,
    /// The request could not be prepared or sent.
    Other,
}

/// A raw transport failure, before normalization.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
    pub response: Option<HttpResponse>,
}

impl TransportError {
    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::Timeout,
            message: message.into(),
            response: None,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::Network,
            message: message.into(),
            response: None,
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::Other,
            message: message.into(),
            response: None,
        }
    }

    pub fn bad_status(response: HttpResponse) -> Self {
        Self {
            kind: TransportErrorKind::BadStatus,
            message: format!("Request failed with status code {}", response.status),
            response: Some(response),
        }
    }

    pub fn status(&self) -> Option<u16> {
        self.response.as_ref().map(|r| r.status)
    }

    /// Classification code, in the vocabulary front-end tooling already uses.
    pub fn code(&self) -> &'static str {
        match self.kind {
            TransportErrorKind::Timeout => "ECONNABORTED",
            TransportErrorKind::Network => "ERR_NETWORK",
            TransportErrorKind::BadStatus => match self.status() {
                Some(s) if s >= 500 => "ERR_BAD_RESPONSE",
                _ => "ERR_BAD_REQUEST",
            },
            TransportErrorKind::Other => "ERR_BAD_OPTION",
        }
    }
}

/// What a client call returns on failure.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error(transparent)]
    Http(#[from] HttpError),

    /// Only produced for requests with `skip_error_handler` set.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("request cancelled")]
    Cancelled,
}

impl RequestError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RequestError::Cancelled)
    }

    pub fn as_http(&self) -> Option<&HttpError> {
        match self {
            RequestError::Http(e) => Some(e),
            _ => None,
        }
    }

    pub fn into_http(self) -> Option<HttpError> {
        match self {
            RequestError::Http(e) => Some(e),
            _ => None,
        }
    }
}

/// Derive the user-facing message for a transport failure.
///
/// First match wins: a non-empty `message` in the response body, then the
/// status table, then timeout/network classification, then the error's own
/// message.
pub fn format_error_message(error: &TransportError) -> String {
    if let Some(message) = error
        .response
        .as_ref()
        .and_then(|r| body_message(&parse_body(&r.body)))
    {
        return message;
    }

    if let Some(status) = error.status() {
        return status_message(status);
    }

    match error.kind {
        TransportErrorKind::Timeout => "request timed out, check connection".to_string(),
        TransportErrorKind::Network => "network error, check connection".to_string(),
        _ if !error.message.is_empty() => error.message.clone(),
        _ => FALLBACK_MESSAGE.to_string(),
    }
}

fn status_message(status: u16) -> String {
    let message = match status {
        400 => "bad request / invalid parameters",
        401 => "unauthorized, please sign in again",
        403 => "forbidden",
        404 => "resource not found",
        408 => "request timed out",
        409 => "conflict",
        422 => "validation failed",
        429 => "rate limited, retry later",
        500 => "internal server error",
        502..=504 => "upstream/gateway error",
        other => return format!("request failed ({other})"),
    };
    message.to_string()
}

fn body_message(body: &Value) -> Option<String> {
    body.get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}

fn body_code(body: &Value) -> Option<String> {
    match body.get("code")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    #[test]
    fn body_message_wins_over_status_table() {
        let err = TransportError::bad_status(response(404, r#"{"code":404,"message":"user missing","data":null}"#));
        assert_eq!(format_error_message(&err), "user missing");
    }

    #[test]
    fn empty_body_message_falls_through_to_table() {
        let err = TransportError::bad_status(response(404, r#"{"message":""}"#));
        assert_eq!(format_error_message(&err), "resource not found");
    }

    #[test]
    fn gateway_statuses_share_a_message() {
        for status in [502, 503, 504] {
            let err = TransportError::bad_status(response(status, ""));
            assert_eq!(format_error_message(&err), "upstream/gateway error");
        }
    }

    #[test]
    fn unknown_status_includes_code() {
        let err = TransportError::bad_status(response(418, "teapot"));
        assert_eq!(format_error_message(&err), "request failed (418)");
    }

    #[test]
    fn timeout_without_response() {
        let err = TransportError::timeout("timeout of 30000ms exceeded");
        assert_eq!(format_error_message(&err), "request timed out, check connection");
        assert_eq!(err.code(), "ECONNABORTED");
    }

    #[test]
    fn network_without_response() {
        let err = TransportError::network("connection refused");
        assert_eq!(format_error_message(&err), "network error, check connection");
        assert_eq!(err.code(), "ERR_NETWORK");
    }

    #[test]
    fn other_failure_uses_own_message_or_fallback() {
        assert_eq!(format_error_message(&TransportError::other("bad body")), "bad body");
        assert_eq!(format_error_message(&TransportError::other("")), "request failed");
    }

    #[test]
    fn from_transport_prefers_body_code() {
        let err = TransportError::bad_status(response(
            409,
            r#"{"code":"USER_EXISTS","message":"username already exists","data":null}"#,
        ));
        let http = HttpError::from_transport(&err);
        assert_eq!(http.message, "username already exists");
        assert_eq!(http.status, Some(409));
        assert_eq!(http.code.as_deref(), Some("USER_EXISTS"));
        assert_eq!(http.data.unwrap()["code"], "USER_EXISTS");
    }

    #[test]
    fn from_transport_falls_back_to_transport_code() {
        let http = HttpError::from_transport(&TransportError::bad_status(response(500, "")));
        assert_eq!(http.code.as_deref(), Some("ERR_BAD_RESPONSE"));
        assert_eq!(http.data, None);

        let http = HttpError::from_transport(&TransportError::bad_status(response(400, r#"{"code":0}"#)));
        assert_eq!(http.code.as_deref(), Some("ERR_BAD_REQUEST"));
    }

    #[test]
    fn non_json_body_is_kept_as_string_data() {
        let http = HttpError::from_transport(&TransportError::bad_status(response(502, "Bad Gateway")));
        assert_eq!(http.data, Some(Value::String("Bad Gateway".to_string())));
        assert_eq!(http.message, "upstream/gateway error");
    }

    #[test]
    fn new_never_produces_empty_message() {
        assert_eq!(HttpError::new("").message, "request failed");
    }

    #[test]
    fn http_error_serializes_without_empty_fields() {
        let json = serde_json::to_value(HttpError::new("forbidden").with_status(403)).unwrap();
        assert_eq!(json, serde_json::json!({"message": "forbidden", "status": 403}));
    }
}
