use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use std::time::Duration;

/// Floor for 429s that come without a `Retry-After`.
const RATE_LIMIT_FLOOR: Duration = Duration::from_millis(1100);

/// Exponential backoff: 200ms, 400ms, 800ms, ... capped at 2^16 steps.
pub(crate) fn backoff(attempt: usize) -> Duration {
    let shift = attempt.saturating_sub(1).min(16) as u32;
    Duration::from_millis(200u64.saturating_mul(1u64 << shift))
}

/// `Retry-After` in whole seconds. HTTP-date values are ignored.
pub(crate) fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
        .map(Duration::from_secs)
}

/// Only throttling and server faults are worth another attempt.
pub(crate) fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Wait before retry number `attempt` after receiving `status`.
pub(crate) fn delay_for(status: StatusCode, headers: &HeaderMap, attempt: usize) -> Duration {
    if let Some(hinted) = retry_after(headers) {
        return hinted;
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        backoff(attempt).max(RATE_LIMIT_FLOOR)
    } else {
        backoff(attempt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn backoff_grows_and_saturates() {
        assert_eq!(backoff(1), Duration::from_millis(200));
        assert_eq!(backoff(2), Duration::from_millis(400));
        assert_eq!(backoff(100), backoff(17));
    }

    #[test]
    fn retry_after_wins_over_backoff() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("7"));
        assert_eq!(
            delay_for(StatusCode::SERVICE_UNAVAILABLE, &headers, 1),
            Duration::from_secs(7)
        );
    }

    #[test]
    fn rate_limits_wait_at_least_the_floor() {
        let headers = HeaderMap::new();
        assert_eq!(
            delay_for(StatusCode::TOO_MANY_REQUESTS, &headers, 1),
            RATE_LIMIT_FLOOR
        );
        assert_eq!(
            delay_for(StatusCode::BAD_GATEWAY, &headers, 1),
            Duration::from_millis(200)
        );
    }

    #[test]
    fn client_errors_are_final() {
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(!is_retryable(StatusCode::FORBIDDEN));
        assert!(!is_retryable(StatusCode::NOT_FOUND));
    }
}
