//! The byte ↔ codepoint conversion engines underneath every [`Codec`].
//!
//! A [`Charset`] hands out one [`CharsetEncoder`] or [`CharsetDecoder`] per
//! session. Engines convert as much input as fits into the output they are
//! given and report why they stopped as a [`Conversion`]. They never skip an
//! erroneous sequence on their own: a `Malformed` or `Unmappable` result
//! always starts exactly at the reported read position, so that the error
//! handler machinery decides what happens to it.
//!
//! The concrete engines in this module frame the CJK byte layouts and shift
//! states themselves and look up individual characters in the tables of
//! [`encoding_rs`].
//!
//! [`Codec`]: crate::codec::Codec

use core::fmt;

use crate::error::CodecError;

pub mod dbcs;
pub mod hz;
pub mod iso2022;
pub(crate) mod table;

/// Why an engine stopped converting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Conversion {
    /// Everything that could be converted was. Any unread tail of the input
    /// is the prefix of a sequence that more input could still complete.
    Underflow,

    /// The next unit of output does not fit in the space that was given.
    Overflow,

    /// The given number of input bytes can never be decoded.
    Malformed(usize),

    /// The given number of input characters have no mapping in the encoding.
    Unmappable(usize),
}

/// The result of one call to an engine's `convert`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Converted {
    pub result: Conversion,
    /// How many input units were consumed before the engine stopped.
    pub read: usize,
}

impl Converted {
    pub const fn new(result: Conversion, read: usize) -> Self {
        Self { result, read }
    }
}

/// Returned by the output writers when a write doesn't fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputFull;

/// A byte output window with a fixed amount of room left.
///
/// Writes are all-or-nothing, so an engine that fails a write can report
/// [`Conversion::Overflow`] with its state untouched.
pub struct ByteWriter<'a> {
    buf: &'a mut Vec<u8>,
    limit: usize,
}

impl<'a> ByteWriter<'a> {
    pub fn new(buf: &'a mut Vec<u8>, limit: usize) -> Self {
        Self { buf, limit }
    }

    pub fn room(&self) -> usize {
        self.limit.saturating_sub(self.buf.len())
    }

    pub fn write(&mut self, bytes: &[u8]) -> Result<(), OutputFull> {
        if bytes.len() > self.room() {
            return Err(OutputFull);
        }
        self.buf.extend_from_slice(bytes);
        Ok(())
    }
}

/// A text output window whose room is counted in characters.
pub struct CharWriter<'a> {
    buf: &'a mut String,
    chars: &'a mut usize,
    limit: usize,
}

impl<'a> CharWriter<'a> {
    pub fn new(buf: &'a mut String, chars: &'a mut usize, limit: usize) -> Self {
        Self { buf, chars, limit }
    }

    pub fn room(&self) -> usize {
        self.limit.saturating_sub(*self.chars)
    }

    pub fn write_char(&mut self, c: char) -> Result<(), OutputFull> {
        if self.room() == 0 {
            return Err(OutputFull);
        }
        self.buf.push(c);
        *self.chars += 1;
        Ok(())
    }

    pub fn write_str(&mut self, s: &str) -> Result<(), OutputFull> {
        let n = s.chars().count();
        if n > self.room() {
            return Err(OutputFull);
        }
        self.buf.push_str(s);
        *self.chars += n;
        Ok(())
    }
}

/// An opaque snapshot of an engine's shift state.
///
/// Tokens only need to round-trip through the engine that produced them.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StateToken(pub [u8; 8]);

impl StateToken {
    pub const INITIAL: Self = StateToken([0; 8]);

    pub(crate) const fn from_flags(a: u8, b: u8) -> Self {
        StateToken([a, b, 0, 0, 0, 0, 0, 0])
    }

    /// Returns the first two bytes if the rest of the token is zero.
    pub(crate) fn flags(self) -> Result<(u8, u8), CodecError> {
        match self.0 {
            [a, b, 0, 0, 0, 0, 0, 0] => Ok((a, b)),
            _ => Err(CodecError::InvalidState),
        }
    }
}

/// Factory for the per-session engines of one encoding.
pub trait Charset: fmt::Debug + Send + Sync {
    fn encoder(&self) -> Box<dyn CharsetEncoder>;
    fn decoder(&self) -> Box<dyn CharsetDecoder>;
}

/// Converts characters to bytes, one session at a time.
pub trait CharsetEncoder: Send {
    /// Encodes a prefix of `input` into `out`.
    ///
    /// When `flush` is false an engine may leave a trailing character unread
    /// if a following character could still change how it is encoded.
    fn convert(&mut self, input: &[char], out: &mut ByteWriter<'_>, flush: bool) -> Converted;

    /// Writes whatever returns the output to its initial shift state, and
    /// enters that state. Returns [`Conversion::Underflow`] on success.
    fn flush(&mut self, out: &mut ByteWriter<'_>) -> Conversion;

    /// Enters the initial state without writing anything.
    fn reset(&mut self);

    fn save(&self) -> StateToken;
    fn restore(&mut self, token: StateToken) -> Result<(), CodecError>;
}

/// Converts bytes to characters, one session at a time.
pub trait CharsetDecoder: Send {
    /// Decodes a prefix of `input` into `out`.
    ///
    /// An incomplete sequence at the end of `input` is left unread and
    /// reported as [`Conversion::Underflow`]; whether that is an error is up
    /// to the caller, which knows if more input will follow.
    fn convert(&mut self, input: &[u8], out: &mut CharWriter<'_>) -> Converted;

    fn reset(&mut self);

    fn save(&self) -> StateToken;
    fn restore(&mut self, token: StateToken) -> Result<(), CodecError>;
}

/// A short byte sequence assembled before an all-or-nothing write.
#[derive(Default)]
pub(crate) struct Seq {
    buf: [u8; 8],
    len: usize,
}

impl Seq {
    pub(crate) fn push(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf[self.len..self.len + bytes.len()].copy_from_slice(bytes);
        self.len += bytes.len();
        self
    }

    pub(crate) fn as_slice(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}
