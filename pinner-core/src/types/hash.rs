//! Content identifier checks for pin-by-hash arguments.

use std::str::FromStr;

use cid::Cid;

use crate::error::{PinnerError, Result};

/// Validates a CID string before it is sent to a backend.
///
/// Accepts CIDv0 (`Qm...`) and any multibase-encoded CIDv1.
pub fn validate_cid(hash: &str) -> Result<()> {
    if hash.is_empty() {
        return Err(PinnerError::InvalidHash(hash.to_string()));
    }

    Cid::from_str(hash)
        .map(|_| ())
        .map_err(|_| PinnerError::InvalidHash(hash.to_string()))
}

/// Returns true if `s` parses as a CID.
pub fn is_cid(s: &str) -> bool {
    validate_cid(s).is_ok()
}
