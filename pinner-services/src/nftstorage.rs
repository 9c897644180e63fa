//! NFT.Storage adapter.

use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use tracing::{debug, instrument};

use pinner_core::constants::NFTSTORAGE_API;
use pinner_core::error::{PinnerError, Result};
use pinner_core::types::{ByteStream, Pinner};
use pinner_core::Pinning;
use pinner_file::FileNode;
use pinner_http::RetryPolicy;

use crate::credentials::Credentials;
use crate::response::{decode, ErrorField};
use crate::transport::{anonymous_name, Payload, Transport};

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    value: Option<UploadValue>,
    #[serde(default)]
    error: Option<ErrorField>,
}

#[derive(Debug, Deserialize)]
struct UploadValue {
    #[serde(default)]
    cid: Option<String>,
}

impl UploadResponse {
    fn into_cid(self) -> Result<String> {
        if !self.ok {
            let message = self
                .error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "upload was not accepted".to_string());
            return Err(PinnerError::BackendRejected(message));
        }
        self.value
            .and_then(|v| v.cid)
            .filter(|cid| !cid.is_empty())
            .ok_or_else(|| PinnerError::MalformedResponse("pin file to nft.storage failed".into()))
    }
}

/// NFT.Storage client. Requires an API token.
#[derive(Clone, Debug)]
pub struct NftStorage {
    credentials: Credentials,
    transport: Transport,
}

impl NftStorage {
    /// Creates a client with an API token.
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            transport: Transport::new(NFTSTORAGE_API),
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

    fn token(&self) -> Result<&str> {
        self.credentials
            .apikey()
            .ok_or_else(|| PinnerError::MissingCredentials("nftstorage requires an API key".into()))
    }

    async fn upload(&self, payload: Payload) -> Result<String> {
        let token = self.token()?;
        let url = self.transport.url("/upload")?;
        let body = self
            .transport
            .upload(url, payload, |r| r.bearer_auth(token))
            .await?;

        let cid = decode::<UploadResponse>(&body)?.into_cid()?;
        debug!(%cid, "Pinned to NFT.Storage");
        Ok(cid)
    }
}

#[async_trait]
impl Pinning for NftStorage {
    fn pinner(&self) -> Pinner {
        Pinner::NftStorage
    }

    #[instrument(skip(self))]
    async fn pin_file(&self, path: &Path) -> Result<String> {
        self.token()?;
        let node = FileNode::load(path).await?;
        self.upload(Payload::node(&node, Vec::new(), false)?).await
    }

    #[instrument(skip(self, reader))]
    async fn pin_with_reader(&self, reader: ByteStream) -> Result<String> {
        self.token()?;
        self.upload(Payload::reader(anonymous_name(), reader, Vec::new())).await
    }

    #[instrument(skip(self, bytes), fields(len = bytes.len()))]
    async fn pin_with_bytes(&self, bytes: Bytes) -> Result<String> {
        self.upload(Payload::bytes(anonymous_name(), bytes, Vec::new())).await
    }
}
