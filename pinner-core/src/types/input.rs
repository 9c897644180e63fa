//! The accepted shapes of content to pin.

use std::fmt;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tokio::io::AsyncRead;

/// An owned, one-shot byte stream.
pub type ByteStream = Box<dyn AsyncRead + Send + Unpin + 'static>;

/// Content to pin, resolved once at the facade boundary.
pub enum PinInput {
    /// A regular file or a directory on the local filesystem.
    Path(PathBuf),
    /// An anonymous byte stream, uploaded under a generated name.
    Stream(ByteStream),
    /// An in-memory buffer, uploaded under a generated name.
    Bytes(Bytes),
}

impl PinInput {
    /// Wraps any async reader as a stream input.
    pub fn reader(reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        PinInput::Stream(Box::new(reader))
    }

    /// Returns true for filesystem inputs.
    pub fn is_path(&self) -> bool {
        matches!(self, PinInput::Path(_))
    }

    /// Short label of the variant, used in logs.
    pub fn shape(&self) -> &'static str {
        match self {
            PinInput::Path(_) => "path",
            PinInput::Stream(_) => "stream",
            PinInput::Bytes(_) => "bytes",
        }
    }
}

impl fmt::Debug for PinInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinInput::Path(path) => f.debug_tuple("Path").field(path).finish(),
            PinInput::Stream(_) => f.write_str("Stream(..)"),
            PinInput::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
        }
    }
}

impl From<PathBuf> for PinInput {
    fn from(path: PathBuf) -> Self {
        PinInput::Path(path)
    }
}

impl From<&Path> for PinInput {
    fn from(path: &Path) -> Self {
        PinInput::Path(path.to_path_buf())
    }
}

impl From<&str> for PinInput {
    fn from(path: &str) -> Self {
        PinInput::Path(PathBuf::from(path))
    }
}

impl From<String> for PinInput {
    fn from(path: String) -> Self {
        PinInput::Path(PathBuf::from(path))
    }
}

impl From<Bytes> for PinInput {
    fn from(bytes: Bytes) -> Self {
        PinInput::Bytes(bytes)
    }
}

impl From<Vec<u8>> for PinInput {
    fn from(bytes: Vec<u8>) -> Self {
        PinInput::Bytes(Bytes::from(bytes))
    }
}

impl From<&'static [u8]> for PinInput {
    fn from(bytes: &'static [u8]) -> Self {
        PinInput::Bytes(Bytes::from_static(bytes))
    }
}

impl From<ByteStream> for PinInput {
    fn from(stream: ByteStream) -> Self {
        PinInput::Stream(stream)
    }
}
