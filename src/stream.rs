//! Decoding readers and encoding writers over byte streams.

use std::io::{self, Write};
use std::sync::Arc;

use crate::buffer::{DecodeBuffer, DecodeOutput};
use crate::codec::{Codec, Flags};
use crate::driver;
use crate::error::CodecError;
use crate::handler::Errors;
use crate::incremental::{StatefulDecoder, StatefulEncoder};
use crate::traits::ByteSource;
use crate::util::split_lines_keepends;

/// Reads text from a [`ByteSource`] of encoded bytes.
///
/// A sequence that is split across two reads from the source is kept in a
/// small internal buffer until the rest of it arrives. At the end of the
/// stream, and whenever a request asks for everything, an incomplete
/// sequence left over goes through the error handler.
///
/// A request that pulls bytes but decodes none of them, because they only
/// start a sequence, keeps pulling one more byte at a time, so that a short
/// read never looks like the end of the text.
#[derive(Debug)]
pub struct StreamReader<R> {
    source: R,
    inner: StatefulDecoder,
}

type Pull<R> = fn(&mut R, Option<usize>) -> io::Result<Vec<u8>>;

impl<R: ByteSource> StreamReader<R> {
    pub fn new(source: R, codec: Arc<Codec>, errors: Errors) -> Self {
        Self {
            source,
            inner: StatefulDecoder::new(codec, errors),
        }
    }

    /// Reads and decodes up to `size` bytes from the source, or all of it
    /// for `None`.
    pub fn read(&mut self, size: Option<usize>) -> Result<String, CodecError> {
        self.iread(size, R::read_bytes)
    }

    /// Reads and decodes one line from the source.
    pub fn readline(&mut self, size: Option<usize>) -> Result<String, CodecError> {
        self.iread(size, R::read_line_bytes)
    }

    /// Reads like [`Self::read`] and splits the text into lines, keeping
    /// line endings.
    pub fn readlines(&mut self, sizehint: Option<usize>) -> Result<Vec<String>, CodecError> {
        let text = self.read(sizehint)?;
        Ok(split_lines_keepends(&text))
    }

    /// Drops pending bytes and returns the decoder to its initial state.
    pub fn reset(&mut self) {
        self.inner.reset();
    }

    pub fn get_ref(&self) -> &R {
        &self.source
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.source
    }

    pub fn into_inner(self) -> R {
        self.source
    }

    fn iread(&mut self, size: Option<usize>, pull: Pull<R>) -> Result<String, CodecError> {
        if size == Some(0) {
            return Ok(String::new());
        }
        let saved = self.inner.pending;
        let result = self.pull_and_decode(size, pull);
        if result.is_err() {
            self.inner.pending = saved;
        }
        result
    }

    fn pull_and_decode(&mut self, mut size: Option<usize>, pull: Pull<R>) -> Result<String, CodecError> {
        let mut out = DecodeOutput::default();
        loop {
            let chunk = pull(&mut self.source, size)?;
            let at_end = chunk.is_empty();

            let mut data = self.inner.pending.as_slice().to_vec();
            data.extend_from_slice(&chunk);
            self.inner.pending.clear();

            let mut buf = DecodeBuffer::with_output(&data, out);
            self.inner.feed(&mut buf, at_end || size.is_none())?;
            out = buf.into_output();

            if size.is_none() || !out.is_empty() || data.is_empty() {
                break;
            }
            size = Some(1);
        }
        Ok(out.into_string())
    }
}

/// Writes text to a byte sink in an encoding.
///
/// Characters that could still combine with the next write are held back
/// until then, or until [`Self::reset`].
#[derive(Debug)]
pub struct StreamWriter<W: Write> {
    sink: W,
    inner: StatefulEncoder,
}

impl<W: Write> StreamWriter<W> {
    pub fn new(sink: W, codec: Arc<Codec>, errors: Errors) -> Self {
        Self {
            sink,
            inner: StatefulEncoder::new(codec, errors),
        }
    }

    pub fn write(&mut self, text: &str) -> Result<(), CodecError> {
        let bytes = self.inner.encode(text, Flags::NONE)?;
        self.sink.write_all(&bytes)?;
        Ok(())
    }

    pub fn writelines<I>(&mut self, lines: I) -> Result<(), CodecError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        for line in lines {
            self.write(line.as_ref())?;
        }
        Ok(())
    }

    /// Encodes whatever is held back, returns to the initial shift state,
    /// and writes the result to the sink.
    ///
    /// The held-back text is dropped even if encoding it fails.
    pub fn reset(&mut self) -> Result<(), CodecError> {
        let pending = self.inner.pending.as_slice().to_vec();
        self.inner.pending.clear();
        let inner = &mut self.inner;
        let bytes = driver::encode(
            &inner.codec,
            &mut inner.state,
            &pending,
            &inner.errors,
            Flags::FLUSH_RESET,
        )?;
        if !bytes.is_empty() {
            self.sink.write_all(&bytes)?;
        }
        Ok(())
    }

    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.sink
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}
