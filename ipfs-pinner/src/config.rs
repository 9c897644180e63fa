//! Pinner configuration and backend dispatch.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use pinner_core::error::{PinnerError, Result};
use pinner_core::types::{PinInput, Pinner};
use pinner_core::Pinning;
use pinner_http::RetryPolicy;
use pinner_services::{Credentials, Fleek, Infura, NftStorage, Pinata, Web3Storage};

/// Which service to pin to and how to reach it.
///
/// Immutable during a pin call; cloning shares the injected client's pool.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Service identifier: `infura`, `pinata`, `nftstorage`, `web3storage` or `fleek`
    pub pinner: String,
    /// API key, project id or token
    #[serde(default)]
    pub apikey: String,
    /// API secret
    #[serde(default)]
    pub secret: String,
    /// Base URL replacing the service's public API
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Retry policy applied to every request
    #[serde(default)]
    pub retry: RetryPolicy,
    /// Client to send requests through
    #[serde(skip)]
    pub client: Option<reqwest::Client>,
}

impl Config {
    /// Creates a configuration for `pinner` with a key and secret (either may be empty).
    pub fn new(pinner: impl Into<String>, apikey: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            pinner: pinner.into(),
            apikey: apikey.into(),
            secret: secret.into(),
            ..Self::default()
        }
    }

    /// Sends requests through an existing client.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Targets another base URL, e.g. a private gateway or a mock server.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Replaces the retry policy.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// The configured service.
    pub fn target(&self) -> Result<Pinner> {
        self.pinner.parse()
    }

    /// Builds the adapter for the configured service.
    pub fn adapter(&self) -> Result<Box<dyn Pinning>> {
        let credentials = Credentials::new(self.apikey.as_str(), self.secret.as_str());

        macro_rules! configure {
            ($adapter:expr) => {{
                let mut adapter = $adapter.with_retry_policy(self.retry.clone());
                if let Some(client) = &self.client {
                    adapter = adapter.with_client(client.clone());
                }
                if let Some(endpoint) = &self.endpoint {
                    adapter = adapter.with_endpoint(endpoint.as_str());
                }
                Box::new(adapter) as Box<dyn Pinning>
            }};
        }

        Ok(match self.target()? {
            Pinner::Infura => configure!(Infura::new(credentials)),
            Pinner::Pinata => configure!(Pinata::new(credentials)),
            Pinner::NftStorage => configure!(NftStorage::new(credentials)),
            Pinner::Web3Storage => configure!(Web3Storage::new(credentials)),
            Pinner::Fleek => configure!(Fleek::new(credentials)),
        })
    }

    /// Pins a path, a byte stream or a buffer and returns its CID.
    ///
    /// A path that does not exist fails with [`PinnerError::NotFound`] before
    /// any backend is contacted. Backend errors are prefixed with the backend name.
    #[instrument(skip(self, input), fields(pinner = %self.pinner))]
    pub async fn pin(&self, input: impl Into<PinInput>) -> Result<String> {
        let input = input.into();
        if let PinInput::Path(path) = &input {
            ensure_exists(path).await?;
        }

        let adapter = self.adapter()?;
        let shape = input.shape();
        let cid = adapter
            .pin(input)
            .await
            .map_err(|e| e.with_pinner(adapter.pinner()))?;

        debug!(%cid, shape, "Pinned");
        Ok(cid)
    }

    /// Pins content that already exists on the network and returns the CID.
    #[instrument(skip(self), fields(pinner = %self.pinner))]
    pub async fn pin_hash(&self, hash: &str) -> Result<String> {
        let adapter = self.adapter()?;
        let pinner = adapter.pinner();

        let pinned = adapter
            .pin_hash(hash)
            .await
            .map_err(|e| e.with_pinner(pinner))?;
        if !pinned {
            return Err(PinnerError::BackendRejected(format!("{} was not pinned", hash)).with_pinner(pinner));
        }
        Ok(hash.to_string())
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("pinner", &self.pinner)
            .field("apikey", &(!self.apikey.is_empty()).then_some("***"))
            .field("secret", &(!self.secret.is_empty()).then_some("***"))
            .field("endpoint", &self.endpoint)
            .field("retry", &self.retry)
            .field("client", &self.client.is_some())
            .finish()
    }
}

async fn ensure_exists(path: &Path) -> Result<()> {
    match tokio::fs::symlink_metadata(path).await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(PinnerError::NotFound(path.to_path_buf()))
        }
        Err(e) => Err(e.into()),
    }
}
