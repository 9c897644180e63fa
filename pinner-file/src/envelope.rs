//! Multipart envelopes: an ordered list of parts turned into
//! `multipart/form-data` forms.
//!
//! An envelope is a description, not a body. [`Envelope::buffered`] loads every
//! part into memory and then hands out any number of identical forms.
//! [`Envelope::piped`] builds one form whose file parts read from in-process
//! pipes while a producer task fills them. Paths and buffers can be encoded
//! any number of times; a stream part can be encoded only once.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use reqwest::multipart::{Form, Part as FormPart};
use reqwest::Body;
use serde::Serialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::task::JoinHandle;
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use pinner_core::constants::{DIRECTORY_CONTENT_TYPE, FILE_FIELD, PIPE_CAPACITY};
use pinner_core::error::{PinnerError, Result};
use pinner_core::types::ByteStream;

use crate::mime::media_type;
use crate::node::{FileNode, TreeItem};

// ═══════════════════════════════════════════════════════════════════════════════
// PARTS
// ═══════════════════════════════════════════════════════════════════════════════

/// A one-shot stream shared by the clones of a part.
#[derive(Clone)]
pub struct StreamSlot(Arc<Mutex<Option<ByteStream>>>);

impl StreamSlot {
    /// Wraps a stream.
    pub fn new(stream: ByteStream) -> Self {
        Self(Arc::new(Mutex::new(Some(stream))))
    }

    /// Takes the stream out; later calls return `None`.
    pub fn take(&self) -> Option<ByteStream> {
        self.0.lock().take()
    }

    /// Returns true while the stream has not been taken.
    pub fn is_available(&self) -> bool {
        self.0.lock().is_some()
    }
}

/// Content source of a part.
#[derive(Clone)]
pub enum PartBody {
    /// A plain or JSON field value
    Field(String),
    /// A file read from disk at encoding time
    File(PathBuf),
    /// File content held in memory
    Bytes(Bytes),
    /// File content read from a one-shot stream
    Stream(StreamSlot),
    /// A directory marker without content
    Directory,
}

/// One named section of an envelope.
#[derive(Clone)]
pub struct Part {
    name: String,
    filename: Option<String>,
    content_type: Option<String>,
    body: PartBody,
}

impl Part {
    /// A plain field.
    pub fn field(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            filename: None,
            content_type: None,
            body: PartBody::Field(value.into()),
        }
    }

    /// A field holding `value` serialized as JSON.
    pub fn json<T: Serialize + ?Sized>(name: impl Into<String>, value: &T) -> Result<Self> {
        let json = serde_json::to_string(value).map_err(|e| PinnerError::Multipart(e.to_string()))?;
        Ok(Self::field(name, json))
    }

    /// A `file` part read from `path`, presented as `filename`.
    pub fn file(path: impl Into<PathBuf>, filename: impl Into<String>) -> Self {
        Self::file_part(filename.into(), PartBody::File(path.into()))
    }

    /// A `file` part holding an in-memory buffer.
    pub fn bytes(filename: impl Into<String>, bytes: Bytes) -> Self {
        Self::file_part(filename.into(), PartBody::Bytes(bytes))
    }

    /// A `file` part fed by a one-shot stream.
    pub fn stream(filename: impl Into<String>, stream: ByteStream) -> Self {
        Self::file_part(filename.into(), PartBody::Stream(StreamSlot::new(stream)))
    }

    /// An empty `file` part declaring a directory.
    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: FILE_FIELD.to_string(),
            filename: Some(name.into()),
            content_type: Some(DIRECTORY_CONTENT_TYPE.to_string()),
            body: PartBody::Directory,
        }
    }

    /// Overrides the guessed content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Form field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// File name, for file and directory parts.
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Content source.
    pub fn body(&self) -> &PartBody {
        &self.body
    }

    fn file_part(filename: String, body: PartBody) -> Self {
        Self {
            name: FILE_FIELD.to_string(),
            content_type: Some(media_type(&filename)),
            filename: Some(filename),
            body,
        }
    }

    fn is_replayable(&self) -> bool {
        match &self.body {
            PartBody::Stream(slot) => slot.is_available(),
            _ => true,
        }
    }

    /// Copy of the part with file and stream content read into memory.
    async fn load(&self) -> Result<Part> {
        let body = match &self.body {
            PartBody::File(path) => PartBody::Bytes(Bytes::from(tokio::fs::read(path).await?)),
            PartBody::Stream(slot) => {
                let mut stream = slot.take().ok_or_else(consumed)?;
                let mut content = Vec::new();
                stream.read_to_end(&mut content).await?;
                PartBody::Bytes(Bytes::from(content))
            }
            other => other.clone(),
        };
        Ok(Part {
            body,
            ..self.clone()
        })
    }

    /// Form section carrying `body`, with this part's file name and content type.
    fn form_part(&self, body: Body, length: Option<u64>) -> Result<FormPart> {
        let mut part = match length {
            Some(length) => FormPart::stream_with_length(body, length),
            None => FormPart::stream(body),
        };
        if let Some(filename) = &self.filename {
            part = part.file_name(filename.clone());
        }
        if let Some(content_type) = &self.content_type {
            part = part.mime_str(content_type).map_err(|e| {
                PinnerError::Multipart(format!("invalid content type '{}': {}", content_type, e))
            })?;
        }
        Ok(part)
    }

    /// Appends the part to `form`; only fields, buffers and directories.
    fn append_loaded(&self, form: Form) -> Result<Form> {
        Ok(match &self.body {
            PartBody::Field(value) => form.text(self.name.clone(), value.clone()),
            PartBody::Bytes(bytes) => {
                let length = bytes.len() as u64;
                form.part(self.name.clone(), self.form_part(Body::from(bytes.clone()), Some(length))?)
            }
            PartBody::Directory => {
                form.part(self.name.clone(), self.form_part(Body::from(Bytes::new()), Some(0))?)
            }
            PartBody::File(_) | PartBody::Stream(_) => {
                return Err(PinnerError::Multipart(format!("part '{}' is not loaded", self.name)))
            }
        })
    }

    fn content_len(&self) -> u64 {
        match &self.body {
            PartBody::Field(value) => value.len() as u64,
            PartBody::Bytes(bytes) => bytes.len() as u64,
            _ => 0,
        }
    }
}

impl fmt::Debug for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = match &self.body {
            PartBody::Field(v) => format!("Field({} bytes)", v.len()),
            PartBody::File(p) => format!("File({})", p.display()),
            PartBody::Bytes(b) => format!("Bytes({} bytes)", b.len()),
            PartBody::Stream(_) => "Stream(..)".to_string(),
            PartBody::Directory => "Directory".to_string(),
        };
        f.debug_struct("Part")
            .field("name", &self.name)
            .field("filename", &self.filename)
            .field("body", &body)
            .finish()
    }
}

fn consumed() -> PinnerError {
    PinnerError::Multipart("stream body already consumed".into())
}

fn new_form() -> Form {
    // File names such as `site/css/main.css` go out as written
    Form::new().percent_encode_noop()
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENVELOPE
// ═══════════════════════════════════════════════════════════════════════════════

/// An ordered set of parts.
#[derive(Clone, Debug, Default)]
pub struct Envelope {
    parts: Vec<Part>,
}

impl Envelope {
    /// Creates an empty envelope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parts in encoding order.
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Appends a part.
    pub fn push(&mut self, part: Part) {
        self.parts.push(part);
    }

    /// Appends a part, builder style.
    pub fn part(mut self, part: Part) -> Self {
        self.push(part);
        self
    }

    /// Appends every file of `node`, optionally preceded by directory markers.
    pub fn push_node(&mut self, node: &FileNode, directories: bool) {
        for item in node.tree(directories) {
            match item {
                TreeItem::Directory(name) => self.push(Part::directory(name)),
                TreeItem::File { name, path, .. } => self.push(Part::file(path, name)),
            }
        }
    }

    /// Returns true if every part can be encoded again.
    pub fn is_replayable(&self) -> bool {
        self.parts.iter().all(Part::is_replayable)
    }

    /// Reads every part into memory.
    ///
    /// Stream parts are consumed.
    pub async fn buffered(&self) -> Result<BufferedForm> {
        let mut parts = Vec::with_capacity(self.parts.len());
        for part in &self.parts {
            parts.push(part.load().await?);
        }

        let buffered = BufferedForm { parts };
        debug!(parts = buffered.parts.len(), size = buffered.size(), "Loaded buffered envelope");
        Ok(buffered)
    }

    /// Builds a form whose content parts are fed by a producer task.
    ///
    /// Each file, buffer or stream part reads from its own bounded pipe. The
    /// producer fills the pipes in part order and closes every pipe on every
    /// exit path, so the form always reaches its end. Whether the content was
    /// complete is reported by [`Producer::finish`].
    ///
    /// Stream parts are taken out of the envelope immediately.
    pub fn piped(&self) -> Result<PipedBody> {
        let mut form = new_form();
        let mut jobs = Vec::new();

        for part in &self.parts {
            if matches!(part.body, PartBody::Field(_) | PartBody::Directory) {
                form = part.append_loaded(form)?;
                continue;
            }

            let (reader, pipe) = tokio::io::duplex(PIPE_CAPACITY);
            let section = part.form_part(Body::wrap_stream(ReaderStream::new(reader)), None)?;
            // Taken only once the section is valid
            let source = match &part.body {
                PartBody::File(path) => Source::File(path.clone()),
                PartBody::Bytes(bytes) => Source::Bytes(bytes.clone()),
                PartBody::Stream(slot) => Source::Stream(slot.take().ok_or_else(consumed)?),
                PartBody::Field(_) | PartBody::Directory => continue,
            };
            jobs.push((source, pipe));
            form = form.part(part.name.clone(), section);
        }

        let handle = tokio::spawn(async move {
            let sections = jobs.len();
            let result = produce(jobs).await;
            match &result {
                Ok(written) => debug!(sections, content = written, "Multipart producer finished"),
                Err(err) => warn!(error = %err, "Multipart producer failed"),
            }
            result
        });

        Ok(PipedBody {
            form,
            producer: Producer(handle),
        })
    }
}

/// Envelope content held in memory.
#[derive(Clone, Debug)]
pub struct BufferedForm {
    parts: Vec<Part>,
}

impl BufferedForm {
    /// Builds a fresh form; every call yields the same sections.
    pub fn form(&self) -> Result<Form> {
        self.parts
            .iter()
            .try_fold(new_form(), |form, part| part.append_loaded(form))
    }

    /// Bytes of field and file content.
    pub fn size(&self) -> u64 {
        self.parts.iter().map(Part::content_len).sum()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PIPE
// ═══════════════════════════════════════════════════════════════════════════════

enum Source {
    File(PathBuf),
    Bytes(Bytes),
    Stream(ByteStream),
}

/// Copies each source into its pipe, in order.
///
/// Returning early drops the remaining pipes, which ends their sections.
async fn produce(jobs: Vec<(Source, DuplexStream)>) -> Result<u64> {
    let mut written = 0;
    for (source, mut pipe) in jobs {
        written += match source {
            Source::Bytes(bytes) => {
                pipe.write_all(&bytes).await?;
                bytes.len() as u64
            }
            Source::File(path) => {
                let mut file = tokio::fs::File::open(&path).await?;
                tokio::io::copy(&mut file, &mut pipe).await?
            }
            Source::Stream(mut stream) => tokio::io::copy(&mut stream, &mut pipe).await?,
        };
        pipe.shutdown().await?;
    }
    Ok(written)
}

/// A streaming form plus the producer feeding it.
#[derive(Debug)]
pub struct PipedBody {
    form: Form,
    producer: Producer,
}

impl PipedBody {
    /// Splits into the form and the producer handle.
    pub fn into_parts(self) -> (Form, Producer) {
        (self.form, self.producer)
    }
}

/// Handle on a running multipart producer.
#[derive(Debug)]
pub struct Producer(JoinHandle<Result<u64>>);

impl Producer {
    /// Waits for the producer and returns the number of content bytes written.
    pub async fn finish(self) -> Result<u64> {
        match self.0.await {
            Ok(result) => result,
            Err(e) => Err(PinnerError::Multipart(format!("producer task failed: {}", e))),
        }
    }

    /// Returns true once the producer has exited.
    pub fn is_finished(&self) -> bool {
        self.0.is_finished()
    }

    /// Stops the producer; its pipes are dropped.
    pub fn abort(&self) {
        self.0.abort();
    }
}
