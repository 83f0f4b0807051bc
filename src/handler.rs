//! Error handlers and the dispatch that runs them when a conversion step
//! fails.
//!
//! `strict`, `ignore` and `replace` are handled inline. Every other handler
//! is a callback that receives the failure and answers with a replacement
//! and the input position to resume from.

use std::collections::HashMap;
use std::fmt;
use std::fmt::Write as _;
use std::sync::Arc;

use tracing::debug;

use crate::buffer::{DecodeBuffer, EncodeBuffer};
use crate::codec::{Codec, EncoderState, Flags, Status};
use crate::driver;
use crate::error::{CodecError, DecodeFailure, Direction, EncodeFailure, Reason};

/// What an error handler puts in place of the failed input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Replacement {
    /// Text, which is encoded with the session's own codec when encoding.
    Text(String),
    /// Bytes written to the output verbatim. Only valid when encoding.
    Bytes(Vec<u8>),
}

/// The failure an error handler is asked to deal with.
#[derive(Debug, Clone, Copy)]
pub enum Failure<'a> {
    Encode(&'a EncodeFailure),
    Decode(&'a DecodeFailure),
}

impl Failure<'_> {
    pub fn direction(&self) -> Direction {
        match self {
            Failure::Encode(_) => Direction::Encode,
            Failure::Decode(_) => Direction::Decode,
        }
    }

    pub fn start(&self) -> usize {
        match self {
            Failure::Encode(f) => f.start(),
            Failure::Decode(f) => f.start(),
        }
    }

    pub fn end(&self) -> usize {
        match self {
            Failure::Encode(f) => f.end(),
            Failure::Decode(f) => f.end(),
        }
    }

    pub fn reason(&self) -> Reason {
        match self {
            Failure::Encode(f) => f.reason(),
            Failure::Decode(f) => f.reason(),
        }
    }
}

/// The callback signature of a custom error handler.
///
/// The returned position may be negative, in which case it counts back from
/// the end of the input when encoding and from the failure's position in the
/// input when decoding.
pub type HandlerFn = dyn Fn(Failure<'_>) -> Result<(Replacement, isize), CodecError> + Send + Sync;

/// A named custom error handler.
#[derive(Clone)]
pub struct Handler {
    name: Arc<str>,
    func: Arc<HandlerFn>,
}

impl Handler {
    pub fn new<F>(name: &str, func: F) -> Self
    where
        F: Fn(Failure<'_>) -> Result<(Replacement, isize), CodecError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, failure: Failure<'_>) -> Result<(Replacement, isize), CodecError> {
        (*self.func)(failure)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handler").field(&self.name).finish()
    }
}

/// The error handling policy of a session.
#[derive(Debug, Clone, Default)]
pub enum Errors {
    /// Fail with the failure record.
    #[default]
    Strict,
    /// Drop the failed input.
    Ignore,
    /// Write `?` when encoding and U+FFFD when decoding.
    Replace,
    Custom(Handler),
}

impl Errors {
    /// Wraps a callback as a handler without registering it anywhere.
    pub fn custom<F>(name: &str, func: F) -> Self
    where
        F: Fn(Failure<'_>) -> Result<(Replacement, isize), CodecError> + Send + Sync + 'static,
    {
        Errors::Custom(Handler::new(name, func))
    }

    pub fn name(&self) -> &str {
        match self {
            Errors::Strict => "strict",
            Errors::Ignore => "ignore",
            Errors::Replace => "replace",
            Errors::Custom(h) => h.name(),
        }
    }
}

/// Named error handlers that sessions can be configured with.
///
/// The default set holds `backslashreplace` and `xmlcharrefreplace` next to
/// the inline `strict`, `ignore` and `replace`.
#[derive(Debug, Clone)]
pub struct ErrorHandlers {
    handlers: HashMap<String, Handler>,
}

impl Default for ErrorHandlers {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ErrorHandlers {
    pub fn builder() -> ErrorHandlersBuilder {
        ErrorHandlersBuilder::default()
            .register("backslashreplace", backslash_replace)
            .register("xmlcharrefreplace", xml_char_ref_replace)
    }

    pub fn lookup(&self, name: &str) -> Result<Errors, CodecError> {
        match name {
            "strict" => Ok(Errors::Strict),
            "ignore" => Ok(Errors::Ignore),
            "replace" => Ok(Errors::Replace),
            _ => self
                .handlers
                .get(name)
                .cloned()
                .map(Errors::Custom)
                .ok_or_else(|| CodecError::UnknownErrorHandler(name.to_owned())),
        }
    }
}

#[derive(Debug, Default)]
pub struct ErrorHandlersBuilder {
    handlers: HashMap<String, Handler>,
}

impl ErrorHandlersBuilder {
    /// Registers a handler, replacing any earlier one of the same name.
    ///
    /// The names `strict`, `ignore` and `replace` always resolve to the
    /// inline handlers and can't be overridden.
    pub fn register<F>(mut self, name: &str, func: F) -> Self
    where
        F: Fn(Failure<'_>) -> Result<(Replacement, isize), CodecError> + Send + Sync + 'static,
    {
        self.handlers.insert(name.to_owned(), Handler::new(name, func));
        self
    }

    pub fn build(self) -> ErrorHandlers {
        ErrorHandlers {
            handlers: self.handlers,
        }
    }
}

fn backslash_replace(failure: Failure<'_>) -> Result<(Replacement, isize), CodecError> {
    let mut text = String::new();
    match failure {
        Failure::Encode(f) => {
            for &c in f.unencodable() {
                let _ = match c as u32 {
                    n @ 0..=0xff => write!(text, "\\x{n:02x}"),
                    n @ 0x100..=0xffff => write!(text, "\\u{n:04x}"),
                    n => write!(text, "\\U{n:08x}"),
                };
            }
        }
        Failure::Decode(f) => {
            for b in f.undecodable() {
                let _ = write!(text, "\\x{b:02x}");
            }
        }
    }
    Ok((Replacement::Text(text), failure.end() as isize))
}

fn xml_char_ref_replace(failure: Failure<'_>) -> Result<(Replacement, isize), CodecError> {
    let Failure::Encode(f) = failure else {
        return Err(CodecError::UnsupportedHandler {
            name: "xmlcharrefreplace".to_owned(),
            direction: failure.direction(),
        });
    };
    let mut text = String::new();
    for &c in f.unencodable() {
        let _ = write!(text, "&#{};", c as u32);
    }
    Ok((Replacement::Text(text), f.end() as isize))
}

/// Deals with a non-success status from an encode step. Returns `Ok` when
/// the driving loop should go on.
pub(crate) fn encode_error(
    codec: &Codec,
    state: &mut EncoderState,
    buf: &mut EncodeBuffer<'_>,
    errors: &Errors,
    status: Status,
) -> Result<(), CodecError> {
    let (len, reason) = match status {
        Status::Success => return Ok(()),
        Status::TooSmall => return buf.expand_output(1),
        Status::TooFew => (buf.remaining(), Reason::IncompleteSequence),
        Status::Internal => return Err(CodecError::Internal),
        Status::Error(n) => (n, Reason::IllegalSequence),
    };
    debug!(
        codec = codec.name(),
        position = buf.position(),
        len,
        %reason,
        errors = errors.name(),
        "dispatching encode error"
    );

    let handler = match errors {
        Errors::Strict => {
            let failure = buf.record_failure(codec.name(), len, reason);
            return Err(CodecError::Encode(Box::new(failure.clone())));
        }
        Errors::Ignore => {
            buf.skip(len);
            return Ok(());
        }
        Errors::Replace => {
            replace_with_question_mark(codec, state, buf)?;
            buf.skip(len);
            return Ok(());
        }
        Errors::Custom(handler) => handler,
    };

    let failure = buf.record_failure(codec.name(), len, reason);
    let (replacement, pos) = handler.call(Failure::Encode(failure))?;
    match replacement {
        Replacement::Bytes(bytes) => buf.append(&bytes)?,
        Replacement::Text(text) => {
            let chars: Vec<char> = text.chars().collect();
            let bytes = driver::encode(codec, state, &chars, &Errors::Strict, Flags::FLUSH)?;
            buf.append(&bytes)?;
        }
    }

    let limit = buf.input().len();
    let pos = if pos < 0 { pos + limit as isize } else { pos };
    buf.set_position(check_position(pos, limit)?);
    Ok(())
}

/// Deals with a non-success status from a decode step. Returns `Ok` when
/// the driving loop should go on.
pub(crate) fn decode_error(
    codec: &Codec,
    buf: &mut DecodeBuffer<'_>,
    errors: &Errors,
    status: Status,
) -> Result<(), CodecError> {
    let (len, reason) = match status {
        Status::Success => return Ok(()),
        Status::TooSmall => return buf.expand_output(1),
        Status::TooFew => (buf.remaining(), Reason::IncompleteSequence),
        Status::Internal => return Err(CodecError::Internal),
        Status::Error(n) => (n, Reason::IllegalSequence),
    };
    debug!(
        codec = codec.name(),
        position = buf.position(),
        len,
        %reason,
        errors = errors.name(),
        "dispatching decode error"
    );

    let handler = match errors {
        Errors::Strict => {
            let failure = buf.record_failure(codec.name(), len, reason);
            return Err(CodecError::Decode(Box::new(failure.clone())));
        }
        Errors::Ignore => {
            buf.skip(len);
            return Ok(());
        }
        Errors::Replace => {
            buf.append("\u{FFFD}")?;
            buf.skip(len);
            return Ok(());
        }
        Errors::Custom(handler) => handler,
    };

    let failure = buf.record_failure(codec.name(), len, reason);
    let (replacement, pos) = handler.call(Failure::Decode(failure))?;
    let Replacement::Text(text) = replacement else {
        return Err(CodecError::BadHandlerResult(Direction::Decode));
    };
    buf.append(&text)?;

    let pos = if pos < 0 {
        pos + buf.position() as isize
    } else {
        pos
    };
    buf.set_position(check_position(pos, buf.input().len())?);
    Ok(())
}

fn replace_with_question_mark(
    codec: &Codec,
    state: &mut EncoderState,
    buf: &mut EncodeBuffer<'_>,
) -> Result<(), CodecError> {
    const QUESTION_MARK: &[char] = &['?'];

    let (input, pos) = buf.swap_input(QUESTION_MARK, 0);
    let status = loop {
        match codec.encode_step(state, buf, Flags::NONE) {
            Status::TooSmall => {
                if let Err(err) = buf.expand_output(1) {
                    buf.swap_input(input, pos);
                    return Err(err);
                }
            }
            status => break status,
        }
    };
    buf.swap_input(input, pos);
    if status != Status::Success {
        buf.append(b"?")?;
    }
    Ok(())
}

fn check_position(pos: isize, limit: usize) -> Result<usize, CodecError> {
    match usize::try_from(pos) {
        Ok(p) if p <= limit => Ok(p),
        _ => Err(CodecError::PositionOutOfBounds(pos)),
    }
}

#[test]
fn positions_are_bounds_checked() {
    assert_eq!(check_position(0, 0).unwrap(), 0);
    assert_eq!(check_position(3, 3).unwrap(), 3);
    assert!(matches!(
        check_position(4, 3),
        Err(CodecError::PositionOutOfBounds(4))
    ));
    assert!(matches!(
        check_position(-1, 3),
        Err(CodecError::PositionOutOfBounds(-1))
    ));
}

#[test]
fn lookup_names() {
    let handlers = ErrorHandlers::default();
    assert!(matches!(handlers.lookup("strict"), Ok(Errors::Strict)));
    assert!(matches!(handlers.lookup("ignore"), Ok(Errors::Ignore)));
    assert!(matches!(handlers.lookup("replace"), Ok(Errors::Replace)));
    assert_eq!(
        handlers.lookup("backslashreplace").unwrap().name(),
        "backslashreplace"
    );
    assert!(matches!(
        handlers.lookup("surrogateescape"),
        Err(CodecError::UnknownErrorHandler(name)) if name == "surrogateescape"
    ));

    let handlers = ErrorHandlers::builder()
        .register("dash", |f| Ok((Replacement::Text("-".into()), f.end() as isize)))
        .build();
    assert_eq!(handlers.lookup("dash").unwrap().name(), "dash");
}
