//! Request plumbing shared by the adapters: endpoint joining, payload
//! selection and multipart submission through the retrying client.

use bytes::Bytes;
use reqwest::{RequestBuilder, Response};
use tracing::debug;
use url::Url;

use pinner_core::constants::{BUFFER_LIMIT, RANDOM_NAME_LEN};
use pinner_core::error::{PinnerError, Result};
use pinner_core::types::ByteStream;
use pinner_file::{random_name, Envelope, FileNode, Part, Producer};
use pinner_http::{RetryClient, RetryPolicy};

/// How an envelope is turned into a request body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Mode {
    /// Loaded in memory once, a fresh form per attempt
    Buffered,
    /// Fed by a producer task per attempt while the request streams
    Piped,
}

impl Mode {
    /// Buffers uploads up to [`BUFFER_LIMIT`] bytes.
    pub(crate) fn for_size(size: u64) -> Self {
        if size <= BUFFER_LIMIT {
            Mode::Buffered
        } else {
            Mode::Piped
        }
    }
}

/// An envelope ready to be submitted.
#[derive(Debug)]
pub(crate) struct Payload {
    pub(crate) envelope: Envelope,
    pub(crate) mode: Mode,
}

impl Payload {
    /// Every file of `node`, after `fields`.
    pub(crate) fn node(node: &FileNode, fields: Vec<Part>, directories: bool) -> Result<Self> {
        let mode = Mode::for_size(node.size()?);
        let mut envelope = Envelope::new();
        for field in fields {
            envelope.push(field);
        }
        envelope.push_node(node, directories);
        Ok(Self { envelope, mode })
    }

    /// A single anonymous stream part, after `fields`.
    pub(crate) fn reader(name: String, reader: ByteStream, fields: Vec<Part>) -> Self {
        Self::single(Part::stream(name, reader), fields)
    }

    /// A single anonymous buffer part, after `fields`.
    pub(crate) fn bytes(name: String, bytes: Bytes, fields: Vec<Part>) -> Self {
        Self::single(Part::bytes(name, bytes), fields)
    }

    fn single(part: Part, fields: Vec<Part>) -> Self {
        let mut envelope = Envelope::new();
        for field in fields {
            envelope.push(field);
        }
        envelope.push(part);
        Self {
            envelope,
            mode: Mode::Piped,
        }
    }
}

/// Name given to readers and buffers.
pub(crate) fn anonymous_name() -> String {
    random_name(RANDOM_NAME_LEN)
}

/// Base URL plus the retrying client of one adapter.
#[derive(Clone, Debug)]
pub(crate) struct Transport {
    base: String,
    http: RetryClient,
}

impl Transport {
    pub(crate) fn new(base: &str) -> Self {
        Self {
            base: base.to_string(),
            http: RetryClient::default(),
        }
    }

    pub(crate) fn set_endpoint(&mut self, base: impl Into<String>) {
        self.base = base.into();
    }

    pub(crate) fn set_client(&mut self, client: reqwest::Client) {
        let policy = self.http.policy().clone();
        self.http = RetryClient::new(Some(client)).with_policy(policy);
    }

    pub(crate) fn set_policy(&mut self, policy: RetryPolicy) {
        self.http = self.http.clone().with_policy(policy);
    }

    pub(crate) fn http(&self) -> &RetryClient {
        &self.http
    }

    /// Appends `path` to the base URL, keeping any path prefix of the base.
    pub(crate) fn url(&self, path: &str) -> Result<Url> {
        let mut url = Url::parse(&self.base)
            .map_err(|e| PinnerError::Http(format!("invalid endpoint '{}': {}", self.base, e)))?;
        let joined = format!("{}{}", url.path().trim_end_matches('/'), path);
        url.set_path(&joined);
        Ok(url)
    }

    /// Posts a multipart payload and returns the body of a 2xx response.
    ///
    /// `auth` decorates every attempt with the adapter's headers. Each attempt
    /// gets a fresh form; a payload holding a one-shot reader gets one attempt.
    pub(crate) async fn upload<A>(&self, url: Url, payload: Payload, auth: A) -> Result<Bytes>
    where
        A: Fn(RequestBuilder) -> RequestBuilder + Send + Sync,
    {
        let Payload { envelope, mode } = payload;
        debug!(%url, ?mode, parts = envelope.parts().len(), "Uploading");

        match mode {
            Mode::Buffered => {
                let buffered = envelope.buffered().await?;
                let mut first = Some(buffered.form()?);
                let response = self
                    .http
                    .execute(|client| {
                        let form = first.take().or_else(|| buffered.form().ok())?;
                        Some(auth(client.post(url.clone())).multipart(form))
                    })
                    .await?;
                read_body(response).await
            }
            Mode::Piped => {
                let mut first = Some(envelope.piped()?);
                let mut producer: Option<Producer> = None;
                let outcome = self
                    .http
                    .execute(|client| {
                        let piped = match first.take() {
                            Some(piped) => piped,
                            None if envelope.is_replayable() => envelope.piped().ok()?,
                            None => return None,
                        };
                        let (form, next) = piped.into_parts();
                        if let Some(previous) = producer.replace(next) {
                            previous.abort();
                        }
                        Some(auth(client.post(url.clone())).multipart(form))
                    })
                    .await;
                settle(outcome, producer).await
            }
        }
    }

    /// Sends a request with a replayable body and returns the body of a 2xx response.
    pub(crate) async fn send(&self, request: RequestBuilder) -> Result<Bytes> {
        let response = self.http.send(request).await?;
        read_body(response).await
    }
}

/// Combines the HTTP outcome with the producer's result.
///
/// A failed producer wins over whatever the service answered for the
/// truncated body. A producer still running behind a failed request is stopped.
async fn settle(outcome: Result<Response>, producer: Option<Producer>) -> Result<Bytes> {
    let Some(producer) = producer else {
        return read_body(outcome?).await;
    };

    match outcome {
        Ok(response) if response.status().is_success() => {
            producer.finish().await?;
            read_body(response).await
        }
        other => {
            if producer.is_finished() {
                producer.finish().await?;
            } else {
                producer.abort();
            }
            read_body(other?).await
        }
    }
}

/// Returns the body of a 2xx response, or the status mapped to an error.
pub(crate) async fn read_body(response: Response) -> Result<Bytes> {
    let status = response.status();
    if !status.is_success() {
        return Err(PinnerError::from_status(status.as_u16(), status.to_string()));
    }
    response
        .bytes()
        .await
        .map_err(|e| PinnerError::Transient(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pinner_core::ErrorKind;
    use std::time::{Duration, Instant};
    use test_case::test_case;
    use wiremock::matchers::{header_exists, method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn transport(base: &str) -> Transport {
        let mut transport = Transport::new(base);
        transport.set_policy(RetryPolicy::default().with_backoff_step(Duration::from_millis(1)));
        transport
    }

    /// Request body with its random boundary blanked out.
    fn without_boundary(request: &Request) -> String {
        let content_type = request.headers.get("content-type").unwrap().to_str().unwrap();
        let boundary = content_type.split("boundary=").nth(1).unwrap();
        String::from_utf8_lossy(&request.body).replace(boundary, "")
    }

    #[test_case(0, Mode::Buffered)]
    #[test_case(BUFFER_LIMIT, Mode::Buffered)]
    #[test_case(BUFFER_LIMIT + 1, Mode::Piped)]
    fn test_mode_for_size(size: u64, expected: Mode) {
        assert_eq!(Mode::for_size(size), expected);
    }

    #[test_case("https://api.example.com", "/upload", "https://api.example.com/upload")]
    #[test_case("https://api.example.com/", "/upload", "https://api.example.com/upload")]
    #[test_case("http://127.0.0.1:8080/v1", "/upload", "http://127.0.0.1:8080/v1/upload")]
    fn test_url_join(base: &str, path: &str, expected: &str) {
        assert_eq!(Transport::new(base).url(path).unwrap().as_str(), expected);
    }

    #[test]
    fn test_invalid_endpoint() {
        let err = Transport::new("not a url").url("/upload").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Http);
    }

    #[tokio::test]
    async fn test_piped_upload_retries_replayable_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .and(header_exists("content-type"))
            .respond_with(ResponseTemplate::new(200).set_body_string("done"))
            .mount(&server)
            .await;

        let transport = transport(&server.uri());
        let payload = Payload::bytes("abcdef".into(), Bytes::from_static(b"data"), vec![]);
        let body = transport
            .upload(transport.url("/upload").unwrap(), payload, |r| r)
            .await
            .unwrap();

        assert_eq!(body, "done");
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(without_boundary(&requests[0]), without_boundary(&requests[1]));
        assert!(without_boundary(&requests[1]).contains("filename=\"abcdef\""));
    }

    #[tokio::test]
    async fn test_reader_is_attempted_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        // A retry would sleep for the whole step first
        let mut transport = Transport::new(&server.uri());
        transport.set_policy(RetryPolicy::default().with_backoff_step(Duration::from_secs(5)));

        let reader: ByteStream = Box::new(std::io::Cursor::new(b"stream".to_vec()));
        let payload = Payload::reader("qwerty".into(), reader, vec![]);
        let started = Instant::now();
        let err = transport
            .upload(transport.url("/upload").unwrap(), payload, |r| r)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Transient);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_buffered_upload_is_multipart() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");
        std::fs::write(&file, b"content").unwrap();
        let node = FileNode::new(&file).unwrap();

        let transport = transport(&server.uri());
        let payload = Payload::node(&node, vec![], false).unwrap();
        assert_eq!(payload.mode, Mode::Buffered);
        transport
            .upload(transport.url("/").unwrap(), payload, |r| r)
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let content_type = requests[0].headers.get("content-type").unwrap().to_str().unwrap();
        let boundary = content_type.strip_prefix("multipart/form-data; boundary=").unwrap();
        let body = String::from_utf8_lossy(&requests[0].body);
        assert!(body.contains("filename=\"a.txt\""));
        assert!(body.contains("\r\n\r\ncontent\r\n"));
        assert!(body.ends_with(&format!("--{}--\r\n", boundary)));
    }

    #[tokio::test]
    async fn test_producer_failure_wins() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let transport = transport(&server.uri());
        let mut envelope = Envelope::new();
        envelope.push(Part::file("/definitely/not/here.bin", "here.bin"));
        let payload = Payload {
            envelope,
            mode: Mode::Piped,
        };
        let err = transport
            .upload(transport.url("/upload").unwrap(), payload, |r| r)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
