use std::fmt;
use std::io::{self, Read};

/// Text handed from one pipeline stage to the next.
///
/// A `Stream` has exactly one owner. Reading it with [`Stream::read_to_string`]
/// consumes it, and [`Stream::close`] releases it unread, so a consumer can never
/// touch a stream twice. Memory-backed streams carry the whole output of a finished
/// stage; reader-backed streams (the ambient input) are only read if a consumer
/// asks for their content.
pub struct Stream {
    source: Source,
}

enum Source {
    Empty,
    Memory(Vec<u8>),
    Reader(Box<dyn Read>),
}

impl Stream {
    /// A stream with no content.
    pub fn empty() -> Self {
        Self {
            source: Source::Empty,
        }
    }

    /// A memory-backed stream holding `text`.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self::from_bytes(text.into().into_bytes())
    }

    /// A memory-backed stream holding raw bytes, e.g. captured process output.
    pub fn from_bytes(buf: Vec<u8>) -> Self {
        if buf.is_empty() {
            Self::empty()
        } else {
            Self {
                source: Source::Memory(buf),
            }
        }
    }

    /// A lazily-read stream over `reader`; nothing is read until a consumer asks.
    pub fn from_reader(reader: impl Read + 'static) -> Self {
        Self {
            source: Source::Reader(Box::new(reader)),
        }
    }

    /// The ambient stream of an interactive session: the rest of standard input.
    pub fn stdin() -> Self {
        Self::from_reader(io::stdin())
    }

    /// Read the whole stream and release it.
    ///
    /// Invalid UTF-8 is replaced rather than rejected, external programs may emit
    /// arbitrary bytes.
    pub fn read_to_string(self) -> io::Result<String> {
        let bytes = match self.source {
            Source::Empty => return Ok(String::new()),
            Source::Memory(buf) => buf,
            Source::Reader(mut reader) => {
                let mut buf = Vec::new();
                reader.read_to_end(&mut buf)?;
                buf
            }
        };
        match String::from_utf8(bytes) {
            Ok(text) => Ok(text),
            Err(err) => Ok(String::from_utf8_lossy(err.as_bytes()).into_owned()),
        }
    }

    /// Release the stream without reading it.
    pub fn close(self) {
        tracing::trace!(stream = ?self, "closing stream");
    }

    /// Returns `true` if this stream is known to hold no content without reading it.
    pub fn is_empty(&self) -> bool {
        matches!(self.source, Source::Empty)
    }
}

impl Default for Stream {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Source::Empty => f.write_str("Stream::Empty"),
            Source::Memory(buf) => write!(f, "Stream::Memory({} bytes)", buf.len()),
            Source::Reader(_) => f.write_str("Stream::Reader"),
        }
    }
}
