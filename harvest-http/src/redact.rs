//! Keeping credentials out of logs.
//!
//! Only the auth *kind* and redacted query/header values ever reach a log
//! line. Full request/response dumps are opt-in through `HARVEST_HTTP_RAW=1`.
use reqwest::header::HeaderMap;
use reqwest::{Method, Url};
use std::borrow::Cow;

const RAW_ENV: &str = "HARVEST_HTTP_RAW";
/// Cap on bodies echoed by raw logging (64 KiB).
pub(crate) const RAW_MAX_BODY: usize = 64 * 1024;

const REDACTED: &str = "<redacted>";

/// Query keys whose values are never logged.
const SECRET_KEYS: &[&str] = &[
    "access_token",
    "api_key",
    "auth",
    "authorization",
    "bearer",
    "client_secret",
    "key",
    "password",
    "secret",
    "token",
];

/// Headers whose values are never logged.
const SECRET_HEADERS: &[&str] = &["authorization", "cookie", "set-cookie"];

pub(crate) fn raw_enabled() -> bool {
    std::env::var(RAW_ENV)
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

pub(crate) fn is_secret_key(name: &str) -> bool {
    SECRET_KEYS.iter().any(|k| k.eq_ignore_ascii_case(name))
}

/// Query pairs as they may appear in a log line.
pub(crate) fn query_for_log<'a, I>(pairs: I) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| {
            let shown = if is_secret_key(k) { REDACTED } else { v };
            (k.to_string(), shown.to_string())
        })
        .collect()
}

pub(crate) fn headers_for_log(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let shown = if SECRET_HEADERS.contains(&name.as_str()) {
                REDACTED
            } else {
                value.to_str().unwrap_or("<binary>")
            };
            (name.as_str().to_string(), shown.to_string())
        })
        .collect()
}

/// A pasteable curl command with every secret replaced.
pub(crate) fn curl_line(method: &Method, url: &Url, headers: &HeaderMap, body: Option<&str>) -> String {
    fn quote(s: &str) -> String {
        format!("'{}'", s.replace('\'', r"'\''"))
    }

    let mut shown = url.clone();
    let pairs: Vec<(String, String)> = url.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())).collect();
    if !pairs.is_empty() {
        let logged = query_for_log(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        shown.query_pairs_mut().clear().extend_pairs(logged);
    }

    let mut line = format!("curl -X{method}");
    for (name, value) in headers_for_log(headers) {
        line.push_str(" -H ");
        line.push_str(&quote(&format!("{name}: {value}")));
    }
    if let Some(body) = body {
        let body: Cow<'_, str> = if body.len() > RAW_MAX_BODY {
            let mut cut = RAW_MAX_BODY;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            Cow::Owned(format!("{}…", &body[..cut]))
        } else {
            Cow::Borrowed(body)
        };
        line.push_str(" -d ");
        line.push_str(&quote(&body));
    }
    line.push(' ');
    line.push_str(&quote(shown.as_str()));
    line
}
