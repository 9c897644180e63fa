//! Response decoding helpers.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use pinner_core::error::{PinnerError, Result};

/// Decodes a JSON body, reporting syntax errors with their byte offset.
pub(crate) fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| PinnerError::from_json(e, body))
}

/// An `error` member, either a bare message or a structured object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ErrorField {
    Message(String),
    Detail {
        #[serde(default, alias = "name")]
        reason: Option<String>,
        #[serde(default, alias = "message")]
        details: Option<String>,
    },
}

impl fmt::Display for ErrorField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorField::Message(message) => f.write_str(message),
            ErrorField::Detail { reason, details } => match (reason, details) {
                (Some(reason), Some(details)) => write!(f, "{}: {}", reason, details),
                (Some(only), None) | (None, Some(only)) => f.write_str(only),
                (None, None) => f.write_str("unknown error"),
            },
        }
    }
}

/// `{ "error": ..., "IpfsHash": ... }` as returned by Pinata and Fleek.
#[derive(Debug, Deserialize)]
pub(crate) struct IpfsHashResponse {
    #[serde(default)]
    error: Option<ErrorField>,
    #[serde(rename = "IpfsHash", default)]
    ipfs_hash: Option<String>,
}

impl IpfsHashResponse {
    /// The hash, unless the body carries an error or lacks the hash.
    pub(crate) fn into_hash(self, failure: &str) -> Result<String> {
        if let Some(error) = self.error {
            return Err(PinnerError::BackendRejected(error.to_string()));
        }
        self.ipfs_hash
            .filter(|hash| !hash.is_empty())
            .ok_or_else(|| PinnerError::MalformedResponse(failure.to_string()))
    }
}
