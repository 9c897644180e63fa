//! Service endpoints and transfer constants.

use std::time::Duration;

// ═══════════════════════════════════════════════════════════════════════════════
// SERVICE ENDPOINTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Infura IPFS API (Kubo-compatible RPC).
pub const INFURA_API: &str = "https://ipfs.infura.io:5001";

/// Pinata pinning API.
pub const PINATA_API: &str = "https://api.pinata.cloud";

/// NFT.Storage API.
pub const NFTSTORAGE_API: &str = "https://api.nft.storage";

/// Web3.Storage API.
pub const WEB3STORAGE_API: &str = "https://api.web3.storage";

/// Fleek storage API.
pub const FLEEK_API: &str = "https://storageapi.fleek.co";

// ═══════════════════════════════════════════════════════════════════════════════
// RETRY POLICY
// ═══════════════════════════════════════════════════════════════════════════════

/// Maximum attempts per logical request, the first one included.
pub const MAX_ATTEMPTS: u32 = 5;

/// Linear backoff step: attempt `n` waits `n * BACKOFF_STEP` before attempt `n + 1`.
pub const BACKOFF_STEP: Duration = Duration::from_secs(10);

// ═══════════════════════════════════════════════════════════════════════════════
// MULTIPART
// ═══════════════════════════════════════════════════════════════════════════════

/// Form field name carrying file content.
pub const FILE_FIELD: &str = "file";

/// Length of generated names for anonymous uploads.
pub const RANDOM_NAME_LEN: usize = 6;

/// Path uploads up to this many bytes are encoded in memory; larger ones are piped.
pub const BUFFER_LIMIT: u64 = 8 * 1024 * 1024;

/// Capacity of each in-process pipe between the multipart producer and a streamed part.
pub const PIPE_CAPACITY: usize = 64 * 1024;

/// Content type of multipart parts that only declare a directory.
pub const DIRECTORY_CONTENT_TYPE: &str = "application/x-directory";

/// Fallback content type of file parts.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
