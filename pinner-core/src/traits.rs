//! Common traits for ipfs-pinner.
//!
//! Every backend adapter implements [`Pinning`]. Capabilities a service lacks
//! are not omitted: the default methods report them uniformly as
//! [`PinnerError::NotSupported`] so that callers dispatching through
//! `dyn Pinning` never see a silent success.

use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{PinnerError, Result};
use crate::types::{ByteStream, PinInput, Pinner};

// ═══════════════════════════════════════════════════════════════════════════════
// PINNING TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// The capability set shared by all pinning services.
#[async_trait]
pub trait Pinning: Send + Sync {
    /// The service this adapter talks to.
    fn pinner(&self) -> Pinner;

    /// Pins a regular file or a whole directory tree.
    ///
    /// Returns the CID of the file, or of the top-level folder for directories.
    async fn pin_file(&self, path: &Path) -> Result<String>;

    /// Pins an anonymous byte stream under a generated name.
    async fn pin_with_reader(&self, reader: ByteStream) -> Result<String>;

    /// Pins an in-memory buffer under a generated name.
    async fn pin_with_bytes(&self, bytes: Bytes) -> Result<String>;

    /// Asks the service to pin content that already exists on the network.
    ///
    /// Returns true once the service confirmed the hash.
    async fn pin_hash(&self, hash: &str) -> Result<bool> {
        let _ = hash;
        Err(PinnerError::NotSupported {
            pinner: self.pinner(),
            operation: "pin by hash",
        })
    }

    /// Pins a directory. Services without a dedicated endpoint use `pin_file`.
    async fn pin_dir(&self, path: &Path) -> Result<String> {
        self.pin_file(path).await
    }

    /// Dispatches any input shape to the matching operation.
    async fn pin(&self, input: PinInput) -> Result<String> {
        match input {
            PinInput::Path(path) => self.pin_file(&path).await,
            PinInput::Stream(reader) => self.pin_with_reader(reader).await,
            PinInput::Bytes(bytes) => self.pin_with_bytes(bytes).await,
        }
    }
}
