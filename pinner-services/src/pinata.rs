//! Pinata adapter.

use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::RequestBuilder;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use pinner_core::constants::PINATA_API;
use pinner_core::error::{PinnerError, Result};
use pinner_core::types::{validate_cid, ByteStream, Pinner};
use pinner_core::Pinning;
use pinner_file::{FileNode, Part};
use pinner_http::RetryPolicy;

use crate::credentials::Credentials;
use crate::response::{decode, IpfsHashResponse};
use crate::transport::{anonymous_name, Payload, Transport};

/// `pinataMetadata` sidecar.
#[derive(Debug, Serialize)]
struct Metadata<'a> {
    name: &'a str,
}

/// `pinataOptions` sidecar.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Options {
    cid_version: u8,
    wrap_with_directory: bool,
}

const OPTIONS: Options = Options {
    cid_version: 1,
    wrap_with_directory: false,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PinByHash<'a> {
    hash_to_pin: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PinByHashResponse {
    #[serde(default)]
    ipfs_hash: Option<String>,
}

/// How a request is authenticated.
#[derive(Debug, PartialEq, Eq)]
enum Auth<'a> {
    /// `pinata_api_key` / `pinata_secret_api_key`
    KeyPair(&'a str, &'a str),
    /// `Authorization: Bearer` with a JWT
    Bearer(&'a str),
}

/// Pinata client.
///
/// With both an API key and a secret the legacy header pair is sent; a single
/// value is treated as a JWT.
#[derive(Clone, Debug)]
pub struct Pinata {
    credentials: Credentials,
    transport: Transport,
}

impl Pinata {
    /// Creates a client.
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            transport: Transport::new(PINATA_API),
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

    fn auth(&self) -> Result<Auth<'_>> {
        match (self.credentials.apikey(), self.credentials.secret()) {
            (Some(key), Some(secret)) => Ok(Auth::KeyPair(key, secret)),
            (Some(token), None) | (None, Some(token)) => Ok(Auth::Bearer(token)),
            (None, None) => Err(PinnerError::MissingCredentials(
                "pinata requires an API key and secret, or a JWT".into(),
            )),
        }
    }

    fn authorize(auth: &Auth<'_>, request: RequestBuilder) -> RequestBuilder {
        match auth {
            Auth::KeyPair(key, secret) => request
                .header("pinata_api_key", *key)
                .header("pinata_secret_api_key", *secret),
            Auth::Bearer(token) => request.bearer_auth(token),
        }
    }

    fn sidecars(name: &str) -> Result<Vec<Part>> {
        Ok(vec![
            Part::json("pinataMetadata", &Metadata { name })?,
            Part::json("pinataOptions", &OPTIONS)?,
        ])
    }

    async fn pin_file_to_ipfs(&self, build: impl FnOnce() -> Result<Payload>) -> Result<String> {
        let auth = self.auth()?;
        let payload = build()?;
        let url = self.transport.url("/pinning/pinFileToIPFS")?;

        let body = self
            .transport
            .upload(url, payload, |r| Self::authorize(&auth, r))
            .await?;
        let response: IpfsHashResponse = decode(&body)?;
        let hash = response.into_hash("pin file to pinata failed")?;
        debug!(cid = %hash, "Pinned to Pinata");
        Ok(hash)
    }
}

#[async_trait]
impl Pinning for Pinata {
    fn pinner(&self) -> Pinner {
        Pinner::Pinata
    }

    #[instrument(skip(self))]
    async fn pin_file(&self, path: &Path) -> Result<String> {
        self.auth()?;
        let node = FileNode::load(path).await?;
        self.pin_file_to_ipfs(|| {
            let fields = Self::sidecars(&node.display_name())?;
            Payload::node(&node, fields, false)
        })
        .await
    }

    #[instrument(skip(self, reader))]
    async fn pin_with_reader(&self, reader: ByteStream) -> Result<String> {
        let name = anonymous_name();
        self.pin_file_to_ipfs(|| Ok(Payload::reader(name.clone(), reader, Self::sidecars(&name)?)))
            .await
    }

    #[instrument(skip(self, bytes), fields(len = bytes.len()))]
    async fn pin_with_bytes(&self, bytes: Bytes) -> Result<String> {
        let name = anonymous_name();
        self.pin_file_to_ipfs(|| Ok(Payload::bytes(name.clone(), bytes, Self::sidecars(&name)?)))
            .await
    }

    #[instrument(skip(self))]
    async fn pin_hash(&self, hash: &str) -> Result<bool> {
        validate_cid(hash)?;
        let auth = self.auth()?;

        let url = self.transport.url("/pinning/pinByHash")?;
        let request = self
            .transport
            .http()
            .inner()
            .post(url)
            .json(&PinByHash { hash_to_pin: hash });
        let body = self.transport.send(Self::authorize(&auth, request)).await?;

        let response: PinByHashResponse = decode(&body)?;
        match response.ipfs_hash {
            Some(echoed) => {
                let pinned = echoed == hash;
                if !pinned {
                    warn!(hash, %echoed, "Pinata echoed a different hash");
                }
                Ok(pinned)
            }
            None => Err(PinnerError::MalformedResponse("pin hash to pinata failed".into())),
        }
    }
}
