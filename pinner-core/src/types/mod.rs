//! Domain types for ipfs-pinner.
//!
//! - [`Pinner`]: identifier of a pinning service
//! - [`PinInput`]: the three accepted input shapes
//! - [`validate_cid`]: local check for pin-by-hash arguments

mod hash;
mod input;
mod pinner;

pub use hash::*;
pub use input::*;
pub use pinner::*;
