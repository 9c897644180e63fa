//! # ipfs-pinner
//!
//! Pins files, directories and byte streams to an IPFS pinning service and
//! returns the content identifier.
//!
//! - **Infura**: anonymous or project credentials, pin by hash
//! - **Pinata**: API key pair or JWT, pin by hash
//! - **NFT.Storage**, **Web3.Storage**, **Fleek**: uploads only
//!
//! Uploads are encoded as multipart/form-data. Small trees are encoded in
//! memory; large trees, readers and buffers are streamed through a pipe.
//! Requests answered with 429 or 5xx are retried with linear backoff.
//!
//! ## Example
//!
//! ```rust,ignore
//! use ipfs_pinner::Config;
//!
//! let cfg = Config::new("pinata", apikey, secret);
//! let cid = cfg.pin("site/").await?;
//! let cid = cfg.pin(b"raw bytes".to_vec()).await?;
//! let cid = cfg.pin_hash("bafy...").await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod config;

pub use config::Config;

pub use pinner_core::constants;
pub use pinner_core::{ErrorKind, PinInput, Pinner, PinnerError, Pinning, Result};
pub use pinner_http::RetryPolicy;
pub use pinner_services::{Credentials, Fleek, Infura, NftStorage, Pinata, Web3Storage};

/// Pins `input` with the service named in `cfg`. See [`Config::pin`].
pub async fn pin(cfg: &Config, input: impl Into<PinInput>) -> Result<String> {
    cfg.pin(input).await
}

/// Pins an existing CID with the service named in `cfg`. See [`Config::pin_hash`].
pub async fn pin_hash(cfg: &Config, hash: &str) -> Result<String> {
    cfg.pin_hash(hash).await
}
