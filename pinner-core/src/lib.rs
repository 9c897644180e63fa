//! # ipfs-pinner core
//!
//! Core types, errors, and traits shared by every ipfs-pinner crate:
//!
//! - **Types**: the [`Pinner`] identifier and the [`PinInput`] sum type
//! - **Errors**: the [`PinnerError`] taxonomy
//! - **Constants**: service endpoints and transfer limits
//! - **Traits**: the [`Pinning`] capability set implemented by each backend
//!
//! ## Example
//!
//! ```rust
//! use pinner_core::{Pinner, PinInput};
//!
//! let pinner: Pinner = "Pinata".parse().unwrap();
//! assert_eq!(pinner.as_str(), "pinata");
//!
//! let input = PinInput::from(b"hello".to_vec());
//! assert!(!input.is_path());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

pub use error::{ErrorKind, PinnerError, Result};
pub use traits::Pinning;
pub use types::*;
