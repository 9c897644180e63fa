//! Retrying client.

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::{debug, instrument, warn};

use pinner_core::error::{PinnerError, Result};

use crate::policy::RetryPolicy;

/// Returns true when an attempt's outcome should be retried.
///
/// Transport failures (no response at all), 429 and every 5xx are retried.
pub fn should_retry(outcome: &std::result::Result<Response, reqwest::Error>) -> bool {
    match outcome {
        Ok(response) => {
            let status = response.status();
            status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
        }
        Err(err) => !err.is_builder(),
    }
}

/// HTTP client that retries failed attempts with linear backoff.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Clone, Debug)]
pub struct RetryClient {
    client: Client,
    policy: RetryPolicy,
}

impl Default for RetryClient {
    fn default() -> Self {
        Self::new(None)
    }
}

impl RetryClient {
    /// Wraps `client`, or a default client when none is given.
    pub fn new(client: Option<Client>) -> Self {
        Self {
            client: client.unwrap_or_default(),
            policy: RetryPolicy::default(),
        }
    }

    /// Replaces the retry policy.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The retry policy in use.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// The wrapped client.
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Sends a request whose body can be cloned.
    ///
    /// Requests with a streaming body are attempted once.
    pub async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let mut request = Some(request);
        self.execute(|_| {
            let current = request.take()?;
            request = current.try_clone();
            Some(current)
        })
        .await
    }

    /// Runs the retry loop over requests produced by `make`.
    ///
    /// `make` is called once per attempt, before any backoff. Returning `None`
    /// means the request cannot be rebuilt; after the first attempt this ends
    /// the loop at once with the outcome of that attempt.
    ///
    /// Once the budget is exhausted the last response is returned as is, even
    /// when its status is 429 or 5xx. The last transport error becomes
    /// [`PinnerError::Transient`].
    #[instrument(skip(self, make), fields(max_attempts = self.policy.max_attempts))]
    pub async fn execute<F>(&self, mut make: F) -> Result<Response>
    where
        F: FnMut(&Client) -> Option<RequestBuilder>,
    {
        let mut request = make(&self.client)
            .ok_or_else(|| PinnerError::Http("request body cannot be rebuilt".into()))?;
        let mut attempt: u32 = 1;

        loop {
            if let Some(timeout) = self.policy.attempt_timeout {
                request = request.timeout(timeout);
            }

            let outcome = request.send().await;
            if !should_retry(&outcome) || attempt >= self.policy.max_attempts {
                if let Ok(response) = &outcome {
                    debug!(attempt, status = %response.status(), "Request completed");
                }
                return finish(outcome);
            }

            let Some(next) = make(&self.client) else {
                debug!(attempt, "Request cannot be replayed, not retrying");
                return finish(outcome);
            };

            let delay = self.policy.backoff(attempt);
            match &outcome {
                Ok(response) => {
                    warn!(attempt, status = %response.status(), ?delay, "Retrying request")
                }
                Err(err) => warn!(attempt, error = %err, ?delay, "Retrying request"),
            }
            tokio::time::sleep(delay).await;

            request = next;
            attempt += 1;
        }
    }
}

fn finish(outcome: std::result::Result<Response, reqwest::Error>) -> Result<Response> {
    outcome.map_err(|err| {
        if err.is_builder() {
            PinnerError::Http(err.to_string())
        } else {
            PinnerError::Transient(err.to_string())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pinner_core::ErrorKind;
    use std::time::{Duration, Instant};
    use test_case::test_case;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_client() -> RetryClient {
        RetryClient::new(None).with_policy(RetryPolicy::default().with_backoff_step(Duration::from_millis(1)))
    }

    #[tokio::test]
    async fn test_retries_after_rate_limit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let client = fast_client();
        let url = format!("{}/upload", server.uri());
        let response = client.send(client.inner().post(url).body("payload")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.text().await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_exhausts_budget_on_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(5)
            .mount(&server)
            .await;

        let client = fast_client();
        let response = client.send(client.inner().post(server.uri())).await.unwrap();

        // Last response is handed back untouched
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let err = PinnerError::from_status(response.status().as_u16(), response.status().to_string());
        assert_eq!(err.kind(), ErrorKind::Transient);
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let client = fast_client();
        let response = client.send(client.inner().post(server.uri())).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_factory_without_replay_stops_early() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let client = fast_client();
        let mut built = 0;
        let response = client
            .execute(|http| {
                built += 1;
                (built == 1).then(|| http.post(server.uri()))
            })
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(built, 2);
    }

    #[tokio::test]
    async fn test_no_backoff_without_replay() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .expect(1)
            .mount(&server)
            .await;

        let client = RetryClient::new(None)
            .with_policy(RetryPolicy::default().with_backoff_step(Duration::from_secs(5)));

        let started = Instant::now();
        let mut request = Some(client.inner().post(server.uri()).body("one-shot"));
        let response = client.execute(|_| request.take()).await.unwrap();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_factory_called_per_attempt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = fast_client();
        let mut built = 0;
        let response = client
            .execute(|http| {
                built += 1;
                Some(http.post(server.uri()).body(format!("attempt {}", built)))
            })
            .await
            .unwrap();

        assert!(response.status().is_success());
        assert_eq!(built, 3);
    }

    #[tokio::test]
    async fn test_transport_error_is_transient() {
        // Nothing listens on the port once the server is dropped
        let uri = {
            let server = MockServer::builder().start().await;
            server.uri()
        };

        let client = RetryClient::new(None).with_policy(
            RetryPolicy::default()
                .with_max_attempts(2)
                .with_backoff_step(Duration::from_millis(1)),
        );
        let err = client.send(client.inner().get(uri)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transient);
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn test_attempt_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let client = RetryClient::new(None).with_policy(
            RetryPolicy::none().with_attempt_timeout(Duration::from_millis(50)),
        );
        let err = client.send(client.inner().get(server.uri())).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transient);
    }

    #[tokio::test]
    async fn test_no_request_at_all() {
        let client = fast_client();
        let err = client.execute(|_| None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Http);
    }

    #[test_case(200, false)]
    #[test_case(201, false)]
    #[test_case(400, false)]
    #[test_case(404, false)]
    #[test_case(429, true)]
    #[test_case(500, true)]
    #[test_case(504, true)]
    #[tokio::test]
    async fn test_should_retry_status(code: u16, expected: bool) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(code))
            .mount(&server)
            .await;

        let outcome = reqwest::get(server.uri()).await;
        assert_eq!(should_retry(&outcome), expected);
    }
}
