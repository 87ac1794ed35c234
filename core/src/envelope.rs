//! The backend's unified response envelope.
//!
//! Every backend response body is `{ "code": <int or numeric string>,
//! "message"?: string, "data"?: T }`. The logical `code` is independent of
//! the transport status: a transport 200 carrying `code: 400` is a failure.
//! Bodies that are not envelopes pass through unchanged.

use serde_json::Value;

use crate::error::HttpError;

/// A detected envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub code: Value,
    pub message: Option<String>,
    pub data: Value,
}

impl Envelope {
    /// Type guard: a JSON object with both a `code` and a `data` key.
    ///
    /// The keys only have to be present; `null` values still match.
    pub fn detect(body: &Value) -> Option<Envelope> {
        let object = body.as_object()?;
        if !object.contains_key("code") || !object.contains_key("data") {
            return None;
        }
        Some(Envelope {
            code: object["code"].clone(),
            message: object
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string),
            data: object["data"].clone(),
        })
    }

    pub fn is_success(&self) -> bool {
        code_number(&self.code).is_some_and(is_success_code)
    }
}

/// Coerce an envelope code to an integer.
///
/// Numbers truncate toward zero. Strings parse an optional sign and leading
/// digits after leading whitespace, ignoring anything that follows.
pub fn code_number(code: &Value) -> Option<i64> {
    match code {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => parse_leading_int(s),
        _ => None,
    }
}

pub fn is_success_code(code: i64) -> bool {
    (200..300).contains(&code)
}

/// Render a code the way it is echoed back in `HttpError::code`.
pub fn code_string(code: &Value) -> String {
    match code {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Unwrap a successful transport response body.
///
/// Envelopes with a success code yield their `data`; envelopes with any other
/// code become an `HttpError` carrying the transport `status`. Non-envelope
/// bodies are returned as-is.
pub fn unwrap_envelope(body: Value, status: u16) -> Result<Value, HttpError> {
    let Some(envelope) = Envelope::detect(&body) else {
        return Ok(body);
    };
    if envelope.is_success() {
        return Ok(envelope.data);
    }
    let message = envelope
        .message
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| "request failed".to_string());
    Err(HttpError::new(message)
        .with_code(code_string(&envelope.code))
        .with_status(status)
        .with_data(envelope.data))
}

/// Parse a response body into JSON.
///
/// An empty body is `null`; a body that is not JSON is kept as a string.
pub fn parse_body(body: &str) -> Value {
    if body.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}

fn parse_leading_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let value: i64 = digits[..end].parse().ok()?;
    Some(if negative { -value } else { value })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn detect_requires_both_keys() {
        assert!(Envelope::detect(&json!({"code": 200, "data": null})).is_some());
        assert!(Envelope::detect(&json!({"code": 200})).is_none());
        assert!(Envelope::detect(&json!({"data": {}})).is_none());
        assert!(Envelope::detect(&json!([1, 2])).is_none());
        assert!(Envelope::detect(&Value::Null).is_none());
    }

    #[test]
    fn string_and_numeric_codes_coerce_identically() {
        assert_eq!(code_number(&json!(200)), Some(200));
        assert_eq!(code_number(&json!("200")), Some(200));
        assert_eq!(code_number(&json!(" 201")), Some(201));
        assert_eq!(code_number(&json!("204abc")), Some(204));
        assert_eq!(code_number(&json!(200.9)), Some(200));
        assert_eq!(code_number(&json!("-5")), Some(-5));
        assert_eq!(code_number(&json!("OK")), None);
        assert_eq!(code_number(&json!("")), None);
        assert_eq!(code_number(&json!(null)), None);
        assert_eq!(code_number(&json!(true)), None);
    }

    #[test]
    fn success_range_is_half_open() {
        assert!(is_success_code(200));
        assert!(is_success_code(299));
        assert!(!is_success_code(300));
        assert!(!is_success_code(199));
    }

    #[test]
    fn unwrap_returns_data_on_success() {
        let data = unwrap_envelope(json!({"code": "200", "data": {"id": 1}, "message": "ok"}), 200).unwrap();
        assert_eq!(data, json!({"id": 1}));
    }

    #[test]
    fn unwrap_rejects_logical_failure() {
        let err = unwrap_envelope(json!({"code": 400, "data": null, "message": "bad input"}), 200).unwrap_err();
        assert_eq!(err.message, "bad input");
        assert_eq!(err.code.as_deref(), Some("400"));
        assert_eq!(err.status, Some(200));
        assert_eq!(err.data, Some(Value::Null));
    }

    #[test]
    fn logical_failure_without_message_uses_fallback() {
        let err = unwrap_envelope(json!({"code": "E_FAIL", "data": null}), 200).unwrap_err();
        assert_eq!(err.message, "request failed");
        assert_eq!(err.code.as_deref(), Some("E_FAIL"));
    }

    #[test]
    fn non_envelope_passes_through() {
        let body = json!({"foo": "bar"});
        assert_eq!(unwrap_envelope(body.clone(), 200).unwrap(), body);
    }

    #[test]
    fn parse_body_handles_empty_and_plain_text() {
        assert_eq!(parse_body(""), Value::Null);
        assert_eq!(parse_body("  \n"), Value::Null);
        assert_eq!(parse_body("pong"), json!("pong"));
        assert_eq!(parse_body(r#"{"a":1}"#), json!({"a": 1}));
    }
}
