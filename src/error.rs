//! Codec errors and the failure records handed to error handlers.

use core::fmt;
use std::io;

use thiserror::Error;

/// Why a conversion step could not proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reason {
    /// The input contains a sequence that the encoding cannot represent, or
    /// bytes that can never form a valid sequence.
    IllegalSequence,

    /// The input ended in the middle of a sequence and no more input is
    /// coming.
    IncompleteSequence,
}

impl Reason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Reason::IllegalSequence => "illegal multibyte sequence",
            Reason::IncompleteSequence => "incomplete multibyte sequence",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which direction of conversion a failure or error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Encode,
    Decode,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Encode => "encoding",
            Direction::Decode => "decoding",
        })
    }
}

/// Describes characters that could not be encoded.
///
/// Positions are counted in Unicode scalar values from the start of
/// [`Self::object`], which is the whole input of the encode call that failed.
/// `end - start` is always the number of characters the codec reported as
/// belonging to the failed sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeFailure {
    pub(crate) encoding: String,
    pub(crate) object: Vec<char>,
    pub(crate) start: usize,
    pub(crate) end: usize,
    pub(crate) reason: Reason,
}

impl EncodeFailure {
    /// Name of the codec that reported the failure.
    pub fn encoding(&self) -> &str {
        &self.encoding
    }

    /// The complete input being encoded when the failure happened.
    pub fn object(&self) -> &[char] {
        &self.object
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn reason(&self) -> Reason {
        self.reason
    }

    /// The characters in `start..end`.
    pub fn unencodable(&self) -> &[char] {
        self.object.get(self.start..self.end).unwrap_or(&[])
    }
}

impl fmt::Display for EncodeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.unencodable() {
            [c] => write!(
                f,
                "'{}' codec can't encode character '{}' in position {}: {}",
                self.encoding,
                EscapedChar(*c),
                self.start,
                self.reason,
            ),
            _ => write!(
                f,
                "'{}' codec can't encode characters in position {}-{}: {}",
                self.encoding,
                self.start,
                self.end.saturating_sub(1),
                self.reason,
            ),
        }
    }
}

impl std::error::Error for EncodeFailure {}

/// A character written as `\xNN`, `\uNNNN` or `\UNNNNNNNN` by its width.
struct EscapedChar(char);

impl fmt::Display for EscapedChar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match u32::from(self.0) {
            n @ 0..=0xff => write!(f, "\\x{n:02x}"),
            n @ 0x100..=0xffff => write!(f, "\\u{n:04x}"),
            n => write!(f, "\\U{n:08x}"),
        }
    }
}

/// Describes bytes that could not be decoded.
///
/// Positions are byte offsets into [`Self::object`], which is the whole input
/// of the decode call that failed, including any bytes that were pending
/// from an earlier call of an incremental session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeFailure {
    pub(crate) encoding: String,
    pub(crate) object: Vec<u8>,
    pub(crate) start: usize,
    pub(crate) end: usize,
    pub(crate) reason: Reason,
}

impl DecodeFailure {
    /// Name of the codec that reported the failure.
    pub fn encoding(&self) -> &str {
        &self.encoding
    }

    /// The complete input being decoded when the failure happened.
    pub fn object(&self) -> &[u8] {
        &self.object
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn reason(&self) -> Reason {
        self.reason
    }

    /// The bytes in `start..end`.
    pub fn undecodable(&self) -> &[u8] {
        self.object.get(self.start..self.end).unwrap_or(&[])
    }
}

impl fmt::Display for DecodeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.undecodable() {
            [b] => write!(
                f,
                "'{}' codec can't decode byte {:#04x} in position {}: {}",
                self.encoding, b, self.start, self.reason,
            ),
            _ => write!(
                f,
                "'{}' codec can't decode bytes in position {}-{}: {}",
                self.encoding,
                self.start,
                self.end.saturating_sub(1),
                self.reason,
            ),
        }
    }
}

impl std::error::Error for DecodeFailure {}

/// Everything that can make a codec operation fail.
///
/// Conditions the engine can retry on its own (an output buffer that needs
/// to grow, an incomplete sequence at the end of a non-final chunk) never
/// show up here.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Raised by the `strict` handler for text that can't be encoded.
    #[error(transparent)]
    Encode(Box<EncodeFailure>),

    /// Raised by the `strict` handler for bytes that can't be decoded.
    #[error(transparent)]
    Decode(Box<DecodeFailure>),

    /// The charset engine reported something inconsistent with its own
    /// contract, such as a zero-length error or an error past the end of the
    /// input. Never routed to error handlers.
    #[error("internal codec error")]
    Internal,

    /// An error handler returned a replacement of the wrong kind, such as
    /// bytes while decoding.
    #[error("{0} error handler must return (replacement, position)")]
    BadHandlerResult(Direction),

    /// An error handler asked to resume outside of the input.
    #[error("position {0} from error handler out of bounds")]
    PositionOutOfBounds(isize),

    /// More input was left over at the end of an incremental call than the
    /// session can keep for the next one.
    #[error("pending buffer overflow")]
    PendingOverflow,

    /// A saved state carries more pending input than a session can hold.
    #[error("pending buffer too large")]
    PendingTooLarge,

    /// A buffer would need to grow beyond the largest possible allocation.
    #[error("memory allocation overflow")]
    OutOfMemory,

    #[error("unknown encoding: {0}")]
    UnknownEncoding(String),

    #[error("unknown error handler name '{0}'")]
    UnknownErrorHandler(String),

    /// A registered handler was asked to deal with a direction it does not
    /// support, such as `xmlcharrefreplace` while decoding.
    #[error("don't know how to handle {direction} failures in error handler '{name}'")]
    UnsupportedHandler { name: String, direction: Direction },

    /// A saved state token could not be restored into a charset engine.
    #[error("invalid codec state")]
    InvalidState,

    /// Raised by a custom error handler.
    #[error("{0}")]
    Handler(String),

    /// The byte stream underneath a stream reader or writer failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl CodecError {
    /// Returns the encode failure if this is a strict encode error.
    pub fn as_encode_failure(&self) -> Option<&EncodeFailure> {
        match self {
            CodecError::Encode(f) => Some(f),
            _ => None,
        }
    }

    /// Returns the decode failure if this is a strict decode error.
    pub fn as_decode_failure(&self) -> Option<&DecodeFailure> {
        match self {
            CodecError::Decode(f) => Some(f),
            _ => None,
        }
    }
}

#[test]
fn encode_messages_escape_the_character() {
    let failure = |c: char| EncodeFailure {
        encoding: "euc_kr".to_owned(),
        object: vec!['a', c],
        start: 1,
        end: 2,
        reason: Reason::IllegalSequence,
    };
    assert_eq!(
        failure('é').to_string(),
        "'euc_kr' codec can't encode character '\\xe9' in position 1: illegal multibyte sequence"
    );
    assert_eq!(
        failure('€').to_string(),
        "'euc_kr' codec can't encode character '\\u20ac' in position 1: illegal multibyte sequence"
    );
    assert_eq!(
        failure('😀').to_string(),
        "'euc_kr' codec can't encode character '\\U0001f600' in position 1: illegal multibyte sequence"
    );
}
