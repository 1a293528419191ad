use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Longest body excerpt carried in errors and debug logs.
const SNIPPET_CHARS: usize = 500;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("request build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("decode error: {0}, body_snippet: {1}")]
    Decode(String, String),
    #[error("server returned error {status}: {message}, request_id={request_id}")]
    Api {
        status: StatusCode,
        message: String,
        request_id: String,
    },
}

impl HttpError {
    /// HTTP status for API errors, `None` for everything else.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Best human-readable message from an error body.
///
/// Understands the envelopes the collectors meet in practice:
/// - Google: `{"error": {"code": 403, "message": "..."}}`
/// - Reddit API: `{"json": {"errors": [["CODE", "explanation", "field"]]}}`
/// - OAuth and plain: `{"message": ...}`, `{"error_description": ...}`, `{"error": "..."}`
///
/// Anything else comes back as a body snippet.
pub(crate) fn api_message(body: &[u8]) -> String {
    let Ok(doc) = serde_json::from_slice::<Value>(body) else {
        return snippet(body);
    };

    if let Some(msg) = doc.pointer("/error/message").and_then(Value::as_str) {
        return msg.to_string();
    }
    if let Some(Value::Array(first)) = doc.pointer("/json/errors/0") {
        let joined: Vec<&str> = first.iter().filter_map(Value::as_str).collect();
        if !joined.is_empty() {
            return joined.join(": ");
        }
    }
    for key in ["message", "error_description"] {
        if let Some(msg) = doc.get(key).and_then(Value::as_str).filter(|m| !m.is_empty()) {
            return msg.to_string();
        }
    }
    match doc.get("error") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => format!("error {n}"),
        _ => snippet(body),
    }
}

/// Lossy UTF-8 view of `body`, cut on a char boundary.
pub(crate) fn snippet(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    match text.char_indices().nth(SNIPPET_CHARS) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn google_error_message_is_extracted() {
        let body = br#"{"error":{"code":403,"message":"The request cannot be completed because you have exceeded your quota."}}"#;
        assert!(api_message(body).contains("exceeded your quota"));
    }

    #[test]
    fn reddit_error_tuple_is_joined() {
        let body = br#"{"json":{"errors":[["RATELIMIT","you are doing that too much","ratelimit"]]}}"#;
        assert_eq!(
            api_message(body),
            "RATELIMIT: you are doing that too much: ratelimit"
        );
    }

    #[test]
    fn oauth_error_falls_back_to_error_field() {
        assert_eq!(api_message(br#"{"error":"invalid_grant"}"#), "invalid_grant");
        assert_eq!(
            api_message(br#"{"message":"Unauthorized","error":401}"#),
            "Unauthorized"
        );
        assert_eq!(api_message(br#"{"error":429}"#), "error 429");
    }

    #[test]
    fn unknown_body_is_snipped() {
        let msg = api_message("x".repeat(900).as_bytes());
        assert!(msg.ends_with("..."));
        assert_eq!(msg.len(), SNIPPET_CHARS + 3);
    }

    #[test]
    fn snippet_respects_multibyte_chars() {
        let body = "é".repeat(600);
        let cut = snippet(body.as_bytes());
        assert_eq!(cut.chars().count(), SNIPPET_CHARS + 3);
    }
}
