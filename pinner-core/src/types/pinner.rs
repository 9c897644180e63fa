//! Pinning service identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PinnerError;

/// A supported pinning service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pinner {
    /// Infura IPFS API
    Infura,
    /// Pinata
    Pinata,
    /// NFT.Storage
    #[serde(rename = "nftstorage")]
    NftStorage,
    /// Web3.Storage
    #[serde(rename = "web3storage")]
    Web3Storage,
    /// Fleek storage
    Fleek,
}

impl Pinner {
    /// Every supported service.
    pub const ALL: [Pinner; 5] = [
        Pinner::Infura,
        Pinner::Pinata,
        Pinner::NftStorage,
        Pinner::Web3Storage,
        Pinner::Fleek,
    ];

    /// Returns the configuration identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Pinner::Infura => "infura",
            Pinner::Pinata => "pinata",
            Pinner::NftStorage => "nftstorage",
            Pinner::Web3Storage => "web3storage",
            Pinner::Fleek => "fleek",
        }
    }

    /// Returns true if the service can pin an existing CID by reference.
    pub fn supports_pin_hash(&self) -> bool {
        matches!(self, Pinner::Infura | Pinner::Pinata)
    }

    /// Environment variable holding the API key (or project id).
    pub fn api_key_env(&self) -> String {
        format!("IPFS_PINNER_{}_API_KEY", self.as_str().to_uppercase())
    }

    /// Environment variable holding the API secret.
    pub fn secret_env(&self) -> String {
        format!("IPFS_PINNER_{}_SECRET_API_KEY", self.as_str().to_uppercase())
    }
}

impl fmt::Display for Pinner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Pinner {
    type Err = PinnerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s.trim().to_ascii_lowercase();
        Pinner::ALL
            .into_iter()
            .find(|p| p.as_str() == id)
            .ok_or_else(|| PinnerError::UnsupportedPinner(s.to_string()))
    }
}
