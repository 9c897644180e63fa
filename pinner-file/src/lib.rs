//! # ipfs-pinner files
//!
//! Turns local paths and byte sources into multipart/form-data forms.
//!
//! - [`FileNode`]: a regular file or every regular file beneath a directory
//! - [`Envelope`]: an ordered description of parts that becomes a
//!   `reqwest::multipart::Form`, either loaded in memory ([`Envelope::buffered`])
//!   or fed through pipes by a producer task ([`Envelope::piped`])
//!
//! ## Example
//!
//! ```rust,ignore
//! use pinner_file::{Envelope, FileNode, Part};
//!
//! let mut node = FileNode::new("site")?;
//! node.map_directory("my-site");
//!
//! let mut envelope = Envelope::new();
//! envelope.push(Part::json("pinataMetadata", &serde_json::json!({ "name": "my-site" }))?);
//! envelope.push_node(&node, false);
//!
//! let form = envelope.buffered().await?.form()?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod envelope;
mod mime;
mod names;
mod node;

pub use envelope::{BufferedForm, Envelope, Part, PartBody, PipedBody, Producer, StreamSlot};
pub use mime::media_type;
pub use names::random_name;
pub use node::{FileEntry, FileNode, NodeKind, TreeItem};
