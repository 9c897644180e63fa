//! # ipfs-pinner HTTP
//!
//! A `reqwest::Client` decorated with bounded retry and linear backoff.
//!
//! Requests are described by a factory so that bodies can be rebuilt for
//! every attempt. A factory that cannot rebuild its body (a one-shot stream)
//! returns `None` and the loop stops with the outcome it already has.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod client;
mod policy;

pub use client::{should_retry, RetryClient};
pub use policy::RetryPolicy;
