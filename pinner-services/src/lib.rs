//! # ipfs-pinner services
//!
//! One adapter per pinning service, each implementing [`Pinning`]:
//!
//! | Adapter | Auth | Pin by hash |
//! |---|---|---|
//! | [`Infura`] | optional basic auth | yes |
//! | [`Pinata`] | key pair or JWT | yes |
//! | [`NftStorage`] | bearer token (required) | no |
//! | [`Web3Storage`] | bearer token (optional) | no |
//! | [`Fleek`] | key pair (required) | no |
//!
//! Every adapter accepts an injected `reqwest::Client`, a base URL override and
//! a [`RetryPolicy`](pinner_http::RetryPolicy).
//!
//! ## Example
//!
//! ```rust,ignore
//! use pinner_services::{Credentials, Pinata};
//! use pinner_core::Pinning;
//!
//! let pinata = Pinata::new(Credentials::new(apikey, secret));
//! let cid = pinata.pin_file("photo.png".as_ref()).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod credentials;
mod response;
mod transport;

pub mod fleek;
pub mod infura;
pub mod nftstorage;
pub mod pinata;
pub mod web3storage;

pub use credentials::Credentials;
pub use fleek::Fleek;
pub use infura::Infura;
pub use nftstorage::NftStorage;
pub use pinata::Pinata;
pub use web3storage::Web3Storage;

pub use pinner_core::Pinning;
