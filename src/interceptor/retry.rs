use std::sync::atomic::{AtomicU32, Ordering};

use bon::Builder;
use tracing::debug;

use super::Interceptor;
use crate::{
    Error as _,
    platform::{Duration, sleep},
    request::RequestParts,
    session::SessionError,
};

/// Retries failures that report themselves as retryable.
///
/// Each rescue waits `base_delay * 2^n` (capped at `max_delay`), where `n`
/// is the number of rescues granted since a response was last received.
/// The interceptor never gives up on its own; bound the number of attempts
/// with [`SessionConfig`](crate::session::SessionConfig)'s rescue limit.
///
/// The backoff counter is shared by every request passing through one
/// instance: any received response resets it, including the response to an
/// unrelated concurrent request. Give each independent session its own
/// instance.
#[derive(Debug, Builder)]
pub struct SharedBackoffRetry {
    /// The delay before the first retry.
    #[builder(default = Duration::from_millis(100))]
    base_delay: Duration,
    /// The longest delay between two attempts.
    #[builder(default = Duration::from_secs(30))]
    max_delay: Duration,
    #[builder(skip)]
    consecutive: AtomicU32,
}

impl Default for SharedBackoffRetry {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl SharedBackoffRetry {
    fn delay(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2_u32.saturating_pow(attempt.min(16)))
            .min(self.max_delay)
    }
}

impl Interceptor for SharedBackoffRetry {
    async fn should_rescue(&self, parts: &RequestParts, error: &SessionError) -> bool {
        if !error.is_retryable() {
            return false;
        }

        let attempt = self.consecutive.fetch_add(1, Ordering::Relaxed);
        let delay = self.delay(attempt);
        debug!(
            endpoint = parts.endpoint(),
            attempt,
            ?delay,
            "retrying after retryable failure"
        );
        sleep(delay).await;
        true
    }

    fn received_response(
        &self,
        _result: Result<&dyn std::any::Any, &SessionError>,
        _parts: &RequestParts,
    ) {
        self.consecutive.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use http::StatusCode;

    use super::*;
    use crate::{
        query::Query,
        request::{Body, Method},
    };

    fn parts() -> RequestParts {
        RequestParts::new(Method::Get, "flaky", None::<Body>, Query::new())
    }

    fn http_error(status: StatusCode) -> SessionError {
        SessionError::Http {
            status,
            body: Bytes::new(),
        }
    }

    #[test]
    fn test_delay_doubles_and_is_capped() {
        let retry = SharedBackoffRetry::builder()
            .base_delay(Duration::from_millis(10))
            .max_delay(Duration::from_millis(50))
            .build();

        assert_eq!(retry.delay(0), Duration::from_millis(10));
        assert_eq!(retry.delay(1), Duration::from_millis(20));
        assert_eq!(retry.delay(2), Duration::from_millis(40));
        assert_eq!(retry.delay(3), Duration::from_millis(50));
        assert_eq!(retry.delay(40), Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_only_retryable_errors_are_rescued() {
        let retry = SharedBackoffRetry::builder()
            .base_delay(Duration::from_millis(1))
            .build();

        assert!(
            retry
                .should_rescue(&parts(), &http_error(StatusCode::SERVICE_UNAVAILABLE))
                .await
        );
        assert!(
            !retry
                .should_rescue(&parts(), &http_error(StatusCode::NOT_FOUND))
                .await
        );
    }

    #[tokio::test]
    async fn test_counter_resets_when_response_received() {
        let retry = SharedBackoffRetry::builder()
            .base_delay(Duration::from_millis(1))
            .build();
        let error = http_error(StatusCode::TOO_MANY_REQUESTS);

        assert!(retry.should_rescue(&parts(), &error).await);
        assert!(retry.should_rescue(&parts(), &error).await);
        assert_eq!(retry.consecutive.load(Ordering::Relaxed), 2);

        retry.received_response(Err(&error), &parts());
        assert_eq!(retry.consecutive.load(Ordering::Relaxed), 0);
    }
}
