//! Fleek storage adapter.

use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, instrument};

use pinner_core::constants::FLEEK_API;
use pinner_core::error::{PinnerError, Result};
use pinner_core::types::{ByteStream, Pinner};
use pinner_core::Pinning;
use pinner_file::FileNode;
use pinner_http::RetryPolicy;

use crate::credentials::Credentials;
use crate::response::{decode, IpfsHashResponse};
use crate::transport::{anonymous_name, Payload, Transport};

/// Fleek client. Requires an API key and secret.
///
/// Fleek's header names are the reverse of Pinata's: the secret travels in
/// `apiKey` and the key in `iapiSecret`.
#[derive(Clone, Debug)]
pub struct Fleek {
    credentials: Credentials,
    transport: Transport,
}

impl Fleek {
    /// Creates a client.
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            transport: Transport::new(FLEEK_API),
        }
    }

    /// Targets another API base URL.
    pub fn with_endpoint(mut self, base_url: impl Into<String>) -> Self {
        self.transport.set_endpoint(base_url);
        self
    }

    /// Sends requests through an existing client.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.transport.set_client(client);
        self
    }

    /// Replaces the retry policy.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.transport.set_policy(policy);
        self
    }

    fn key_pair(&self) -> Result<(&str, &str)> {
        match (self.credentials.apikey(), self.credentials.secret()) {
            (Some(key), Some(secret)) => Ok((key, secret)),
            _ => Err(PinnerError::MissingCredentials(
                "fleek requires an API key and secret".into(),
            )),
        }
    }

    async fn upload(&self, payload: Payload) -> Result<String> {
        let (key, secret) = self.key_pair()?;
        let url = self.transport.url("/upload")?;
        let body = self
            .transport
            .upload(url, payload, |r| r.header("apiKey", secret).header("iapiSecret", key))
            .await?;

        let hash = decode::<IpfsHashResponse>(&body)?.into_hash("pin file to fleek failed")?;
        debug!(cid = %hash, "Pinned to Fleek");
        Ok(hash)
    }
}

#[async_trait]
impl Pinning for Fleek {
    fn pinner(&self) -> Pinner {
        Pinner::Fleek
    }

    #[instrument(skip(self))]
    async fn pin_file(&self, path: &Path) -> Result<String> {
        self.key_pair()?;
        let node = FileNode::load(path).await?;
        self.upload(Payload::node(&node, Vec::new(), false)?).await
    }

    #[instrument(skip(self, reader))]
    async fn pin_with_reader(&self, reader: ByteStream) -> Result<String> {
        self.key_pair()?;
        self.upload(Payload::reader(anonymous_name(), reader, Vec::new())).await
    }

    #[instrument(skip(self, bytes), fields(len = bytes.len()))]
    async fn pin_with_bytes(&self, bytes: Bytes) -> Result<String> {
        self.upload(Payload::bytes(anonymous_name(), bytes, Vec::new())).await
    }
}
