//! Encoders and decoders that carry their state from one call to the next.
//!
//! Input that ends in the middle of a sequence is kept in a small pending
//! buffer and put in front of the next call's input. A call that fails
//! leaves the pending buffer as it was before the call, so the session can
//! go on with the next chunk.

use std::sync::Arc;

use tracing::debug;

use crate::buffer::{DecodeBuffer, EncodeBuffer};
use crate::charset::StateToken;
use crate::codec::{Codec, DecoderState, EncoderState, Flags};
use crate::driver;
use crate::error::CodecError;
use crate::handler::Errors;

/// The most characters an encoder keeps between calls.
pub const MAX_ENCODE_PENDING: usize = 2;

/// The most bytes a decoder keeps between calls.
pub const MAX_DECODE_PENDING: usize = 8;

/// A fixed-capacity buffer for the unconverted tail of a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pending<T: Copy + Default, const N: usize> {
    buf: [T; N],
    len: usize,
}

impl<T: Copy + Default, const N: usize> Default for Pending<T, N> {
    fn default() -> Self {
        Self {
            buf: [T::default(); N],
            len: 0,
        }
    }
}

impl<T: Copy + Default, const N: usize> Pending<T, N> {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[T] {
        &self.buf[..self.len]
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Replaces the contents, failing if `items` doesn't fit.
    pub fn replace(&mut self, items: &[T]) -> Result<(), CodecError> {
        if items.len() > N {
            return Err(CodecError::PendingOverflow);
        }
        self.buf[..items.len()].copy_from_slice(items);
        self.len = items.len();
        Ok(())
    }

    /// The pending items followed by `rest`, as one input.
    fn prepend_to(&self, rest: impl IntoIterator<Item = T>) -> Vec<T> {
        let mut input = self.as_slice().to_vec();
        input.extend(rest);
        input
    }
}

/// A saved [`IncrementalEncoder`] state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EncoderSnapshot {
    pub pending: String,
    pub state: StateToken,
}

/// A saved [`IncrementalDecoder`] state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DecoderSnapshot {
    pub pending: Vec<u8>,
    pub state: StateToken,
}

/// The encoding side shared by [`IncrementalEncoder`] and the stream writer.
#[derive(Debug)]
pub(crate) struct StatefulEncoder {
    pub(crate) codec: Arc<Codec>,
    pub(crate) state: EncoderState,
    pub(crate) errors: Errors,
    pub(crate) pending: Pending<char, MAX_ENCODE_PENDING>,
}

impl StatefulEncoder {
    pub(crate) fn new(codec: Arc<Codec>, errors: Errors) -> Self {
        let state = codec.enc_init();
        Self {
            codec,
            state,
            errors,
            pending: Pending::default(),
        }
    }

    pub(crate) fn encode(&mut self, text: &str, flags: Flags) -> Result<Vec<u8>, CodecError> {
        let input = self.pending.prepend_to(text.chars());
        let saved = self.pending;
        self.pending.clear();
        let result = self.encode_input(&input, flags);
        if result.is_err() {
            self.pending = saved;
        }
        result
    }

    fn encode_input(&mut self, input: &[char], flags: Flags) -> Result<Vec<u8>, CodecError> {
        if input.is_empty() && !flags.reset {
            return Ok(Vec::new());
        }
        let mut buf = EncodeBuffer::new(input)?;
        driver::encode_into(&self.codec, &mut self.state, &mut buf, &self.errors, flags)?;
        let rest = &input[buf.position()..];
        if !rest.is_empty() {
            debug!(codec = self.codec.name(), len = rest.len(), "keeping unencoded characters");
            self.pending.replace(rest)?;
        }
        Ok(buf.into_bytes())
    }

    pub(crate) fn reset(&mut self) {
        debug!(codec = self.codec.name(), "resetting encoder");
        self.state.reset();
        self.pending.clear();
    }
}

/// The decoding side shared by [`IncrementalDecoder`] and the stream reader.
#[derive(Debug)]
pub(crate) struct StatefulDecoder {
    pub(crate) codec: Arc<Codec>,
    pub(crate) state: DecoderState,
    pub(crate) errors: Errors,
    pub(crate) pending: Pending<u8, MAX_DECODE_PENDING>,
}

impl StatefulDecoder {
    pub(crate) fn new(codec: Arc<Codec>, errors: Errors) -> Self {
        let state = codec.dec_init();
        Self {
            codec,
            state,
            errors,
            pending: Pending::default(),
        }
    }

    /// Feeds `buf`, optionally runs the end-of-input error handling, and
    /// keeps whatever is left over as pending input.
    pub(crate) fn feed(&mut self, buf: &mut DecodeBuffer<'_>, last: bool) -> Result<(), CodecError> {
        driver::feed(&self.codec, &mut self.state, buf, &self.errors)?;
        if last {
            driver::finish(&self.codec, buf, &self.errors)?;
        }
        let rest = buf.remaining_input();
        if !rest.is_empty() {
            debug!(codec = self.codec.name(), len = rest.len(), "keeping undecoded bytes");
            self.pending.replace(rest)?;
        }
        Ok(())
    }

    pub(crate) fn reset(&mut self) {
        debug!(codec = self.codec.name(), "resetting decoder");
        self.codec.dec_reset(&mut self.state);
        self.pending.clear();
    }
}

/// Encodes text that arrives in pieces.
///
/// ```
/// use mbcodec::{Errors, IncrementalEncoder, Registry};
///
/// let codec = Registry::cjk().lookup("hz").unwrap();
/// let mut enc = IncrementalEncoder::new(codec, Errors::Strict);
/// let mut out = enc.encode("a中", false).unwrap();
/// out.extend(enc.encode("b", true).unwrap());
/// assert_eq!(out, b"a~{VP~}b");
/// ```
#[derive(Debug)]
pub struct IncrementalEncoder {
    inner: StatefulEncoder,
}

impl IncrementalEncoder {
    pub fn new(codec: Arc<Codec>, errors: Errors) -> Self {
        Self {
            inner: StatefulEncoder::new(codec, errors),
        }
    }

    /// Encodes `text`. When `is_final` is set, any incomplete input is an
    /// error and the output ends in the initial shift state.
    pub fn encode(&mut self, text: &str, is_final: bool) -> Result<Vec<u8>, CodecError> {
        let flags = if is_final { Flags::FLUSH_RESET } else { Flags::NONE };
        self.inner.encode(text, flags)
    }

    /// Drops pending input and returns to the initial state without
    /// producing any output.
    pub fn reset(&mut self) {
        self.inner.reset();
    }

    pub fn getstate(&self) -> EncoderSnapshot {
        EncoderSnapshot {
            pending: self.inner.pending.as_slice().iter().collect(),
            state: self.inner.state.save(),
        }
    }

    pub fn setstate(&mut self, snapshot: &EncoderSnapshot) -> Result<(), CodecError> {
        let pending: Vec<char> = snapshot.pending.chars().collect();
        if pending.len() > MAX_ENCODE_PENDING {
            return Err(CodecError::PendingTooLarge);
        }
        self.inner.state.restore(snapshot.state)?;
        self.inner.pending.replace(&pending)
    }

    pub fn errors(&self) -> &Errors {
        &self.inner.errors
    }
}

/// Decodes bytes that arrive in pieces.
#[derive(Debug)]
pub struct IncrementalDecoder {
    inner: StatefulDecoder,
}

impl IncrementalDecoder {
    pub fn new(codec: Arc<Codec>, errors: Errors) -> Self {
        Self {
            inner: StatefulDecoder::new(codec, errors),
        }
    }

    /// Decodes `input` after any bytes left pending by the previous call.
    ///
    /// An incomplete sequence at the end is kept for the next call, unless
    /// `is_final` is set, in which case it is first handed to the error
    /// handler.
    pub fn decode(&mut self, input: &[u8], is_final: bool) -> Result<String, CodecError> {
        let data = self.inner.pending.prepend_to(input.iter().copied());
        let saved = self.inner.pending;
        self.inner.pending.clear();
        let mut buf = DecodeBuffer::new(&data);
        match self.inner.feed(&mut buf, is_final) {
            Ok(()) => Ok(buf.into_text()),
            Err(err) => {
                self.inner.pending = saved;
                Err(err)
            }
        }
    }

    pub fn reset(&mut self) {
        self.inner.reset();
    }

    pub fn getstate(&self) -> DecoderSnapshot {
        DecoderSnapshot {
            pending: self.inner.pending.as_slice().to_vec(),
            state: self.inner.state.save(),
        }
    }

    pub fn setstate(&mut self, snapshot: &DecoderSnapshot) -> Result<(), CodecError> {
        if snapshot.pending.len() > MAX_DECODE_PENDING {
            return Err(CodecError::PendingTooLarge);
        }
        self.inner.state.restore(snapshot.state)?;
        self.inner.pending.replace(&snapshot.pending)
    }

    pub fn errors(&self) -> &Errors {
        &self.inner.errors
    }
}

#[test]
fn pending_is_bounded() {
    let mut pending: Pending<u8, 2> = Pending::default();
    assert!(pending.is_empty());
    pending.replace(b"ab").unwrap();
    assert_eq!(pending.as_slice(), b"ab");
    assert_eq!(pending.prepend_to(b"cd".iter().copied()), b"abcd");
    assert!(matches!(
        pending.replace(b"abc"),
        Err(CodecError::PendingOverflow)
    ));
    assert_eq!(pending.as_slice(), b"ab");
    pending.clear();
    assert_eq!(pending.len(), 0);
}
