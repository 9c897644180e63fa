//! Web3.Storage adapter.

use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use tracing::{debug, instrument};

use pinner_core::constants::WEB3STORAGE_API;
use pinner_core::error::{PinnerError, Result};
use pinner_core::types::{ByteStream, Pinner};
use pinner_core::Pinning;
use pinner_file::FileNode;
use pinner_http::RetryPolicy;

use crate::credentials::Credentials;
use crate::response::decode;
use crate::transport::{anonymous_name, Payload, Transport};

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    cid: Option<String>,
}

/// Web3.Storage client. The token is sent only when present.
#[derive(Clone, Debug)]
pub struct Web3Storage {
    credentials: Credentials,
    transport: Transport,
}

impl Web3Storage {
    /// Creates a client.
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            transport: Transport::new(WEB3STORAGE_API),
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

    async fn upload(&self, payload: Payload) -> Result<String> {
        let url = self.transport.url("/upload")?;
        let token = self.credentials.apikey();
        let body = self
            .transport
            .upload(url, payload, |r| match token {
                Some(token) => r.bearer_auth(token),
                None => r,
            })
            .await?;

        let cid = decode::<UploadResponse>(&body)?
            .cid
            .filter(|cid| !cid.is_empty())
            .ok_or_else(|| PinnerError::MalformedResponse("pin file to web3.storage failed".into()))?;
        debug!(%cid, "Pinned to Web3.Storage");
        Ok(cid)
    }
}

#[async_trait]
impl Pinning for Web3Storage {
    fn pinner(&self) -> Pinner {
        Pinner::Web3Storage
    }

    #[instrument(skip(self))]
    async fn pin_file(&self, path: &Path) -> Result<String> {
        let node = FileNode::load(path).await?;
        self.upload(Payload::node(&node, Vec::new(), false)?).await
    }

    #[instrument(skip(self, reader))]
    async fn pin_with_reader(&self, reader: ByteStream) -> Result<String> {
        self.upload(Payload::reader(anonymous_name(), reader, Vec::new())).await
    }

    #[instrument(skip(self, bytes), fields(len = bytes.len()))]
    async fn pin_with_bytes(&self, bytes: Bytes) -> Result<String> {
        self.upload(Payload::bytes(anonymous_name(), bytes, Vec::new())).await
    }
}
