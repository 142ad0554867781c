//! Source buffers and prepared script units.

use std::sync::Arc;

/// Immutable byte source, typically script text.
pub trait Buffer: Send + Sync {
    /// The bytes held by this buffer.
    fn data(&self) -> &[u8];

    /// Number of bytes.
    fn size(&self) -> usize {
        self.data().len()
    }
}

/// A [`Buffer`] over an owned UTF-8 string.
///
/// # Examples
///
/// ```
/// use host_api::{Buffer, StringBuffer};
///
/// let buf = StringBuffer::new("1 + 1");
/// assert_eq!(buf.size(), 5);
/// assert_eq!(buf.data(), b"1 + 1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringBuffer {
    text: String,
}

impl StringBuffer {
    /// Wraps `text`.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// The text as a string slice.
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl Buffer for StringBuffer {
    fn data(&self) -> &[u8] {
        self.text.as_bytes()
    }
}

impl Buffer for Vec<u8> {
    fn data(&self) -> &[u8] {
        self.as_slice()
    }
}

/// Growable byte buffer the host may fill in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutableBuffer {
    bytes: Vec<u8>,
}

impl MutableBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutable access to the bytes.
    pub fn data_mut(&mut self) -> &mut Vec<u8> {
        &mut self.bytes
    }
}

impl From<Vec<u8>> for MutableBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

impl Buffer for MutableBuffer {
    fn data(&self) -> &[u8] {
        &self.bytes
    }
}

/// A script unit prepared for (possibly repeated) evaluation.
pub trait PreparedJavaScript {
    /// Source identifier used for diagnostics and the bytecode cache key.
    fn source_url(&self) -> &str;

    /// The source bytes.
    fn buffer(&self) -> &Arc<dyn Buffer>;
}

/// Prepared unit that simply retains its source for re-evaluation.
#[derive(Clone)]
pub struct SourceJavaScriptPreparation {
    buffer: Arc<dyn Buffer>,
    source_url: String,
}

impl SourceJavaScriptPreparation {
    /// Pairs a buffer with its source identifier.
    pub fn new(buffer: Arc<dyn Buffer>, source_url: impl Into<String>) -> Self {
        Self {
            buffer,
            source_url: source_url.into(),
        }
    }
}

impl PreparedJavaScript for SourceJavaScriptPreparation {
    fn source_url(&self) -> &str {
        &self.source_url
    }

    fn buffer(&self) -> &Arc<dyn Buffer> {
        &self.buffer
    }
}

impl std::fmt::Debug for SourceJavaScriptPreparation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceJavaScriptPreparation")
            .field("source_url", &self.source_url)
            .field("size", &self.buffer.size())
            .finish()
    }
}
