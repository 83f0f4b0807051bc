//! Encoding descriptions and the single conversion steps they perform.

use std::fmt;
use std::sync::Arc;

use crate::buffer::{DecodeBuffer, EncodeBuffer};
use crate::charset::{Charset, CharsetDecoder, CharsetEncoder, Conversion, Converted, StateToken};
use crate::driver;
use crate::error::CodecError;
use crate::handler::Errors;

/// How an encoding relates to its conversion history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// Every unit converts independently of what came before it.
    Stateless,
    /// Stateless, but the engine needs per-session setup.
    StatelessWithInit,
    /// Output depends on a shift state carried between units.
    Stateful,
    /// Shift state switched by ISO 2022 escape and locking-shift sequences.
    Iso2022,
}

impl Kind {
    /// Whether encoding can end in a shift state that has to be returned
    /// from with extra bytes.
    pub const fn can_enc_reset(self) -> bool {
        matches!(self, Kind::Stateful | Kind::Iso2022)
    }
}

/// Modifiers for one encode run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Flags {
    /// No more input follows, so incomplete input is an error.
    pub flush: bool,
    /// Return to the initial shift state after the input is done.
    pub reset: bool,
}

impl Flags {
    pub const NONE: Self = Flags {
        flush: false,
        reset: false,
    };
    pub const FLUSH: Self = Flags {
        flush: true,
        reset: false,
    };
    pub const FLUSH_RESET: Self = Flags {
        flush: true,
        reset: true,
    };
}

/// Outcome of a single conversion step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// All of the input was converted.
    Success,
    /// The output needs to grow before the step can go on.
    TooSmall,
    /// The input ends in the middle of a sequence.
    TooFew,
    /// The engine broke its own contract.
    Internal,
    /// This many input units starting at the cursor can't be converted.
    Error(usize),
}

/// One session's engine together with the result of its latest step.
pub struct CoderState<T: ?Sized> {
    pub(crate) inner: Box<T>,
    last_result: Option<Conversion>,
}

pub type EncoderState = CoderState<dyn CharsetEncoder>;
pub type DecoderState = CoderState<dyn CharsetDecoder>;

impl<T: ?Sized> CoderState<T> {
    /// The most recent thing the engine reported, if it ran at all.
    pub fn last_result(&self) -> Option<Conversion> {
        self.last_result
    }
}

impl<T: ?Sized> fmt::Debug for CoderState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoderState")
            .field("last_result", &self.last_result)
            .finish_non_exhaustive()
    }
}

impl CoderState<dyn CharsetEncoder> {
    pub fn reset(&mut self) {
        self.inner.reset();
        self.last_result = None;
    }

    pub fn save(&self) -> StateToken {
        self.inner.save()
    }

    pub fn restore(&mut self, token: StateToken) -> Result<(), CodecError> {
        self.inner.restore(token)
    }
}

impl CoderState<dyn CharsetDecoder> {
    pub fn reset(&mut self) {
        self.inner.reset();
        self.last_result = None;
    }

    pub fn save(&self) -> StateToken {
        self.inner.save()
    }

    pub fn restore(&mut self, token: StateToken) -> Result<(), CodecError> {
        self.inner.restore(token)
    }
}

/// A named encoding: its conversion engine and what kind of encoding it is.
///
/// A `Codec` never changes once built and is shared between sessions behind
/// an [`Arc`]. The `encode_step`/`decode_step` methods are the building
/// blocks of the driving loops; [`Codec::encode`] and [`Codec::decode`]
/// convert a whole input in one call.
pub struct Codec {
    name: String,
    charset: Arc<dyn Charset>,
    kind: Kind,
}

impl fmt::Debug for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Codec")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl Codec {
    pub fn new(name: impl Into<String>, charset: Arc<dyn Charset>, kind: Kind) -> Self {
        Self {
            name: name.into(),
            charset,
            kind,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn can_enc_reset(&self) -> bool {
        self.kind.can_enc_reset()
    }

    pub fn enc_init(&self) -> EncoderState {
        CoderState {
            inner: self.charset.encoder(),
            last_result: None,
        }
    }

    pub fn dec_init(&self) -> DecoderState {
        CoderState {
            inner: self.charset.decoder(),
            last_result: None,
        }
    }

    /// Runs the engine once over the rest of the input, into whatever room
    /// the output has left, and moves the cursor past everything converted.
    pub fn encode_step(&self, state: &mut EncoderState, buf: &mut EncodeBuffer<'_>, flags: Flags) -> Status {
        let (input, mut out) = buf.step();
        let Converted { result, read } = state.inner.convert(input, &mut out, flags.flush);
        state.last_result = Some(result);
        let status = classify(result, read, input.len());
        if status != Status::Internal {
            buf.skip(read);
        }
        status
    }

    pub fn decode_step(&self, state: &mut DecoderState, buf: &mut DecodeBuffer<'_>) -> Status {
        let (input, mut out) = buf.step();
        let Converted { result, read } = state.inner.convert(input, &mut out);
        state.last_result = Some(result);
        let status = classify(result, read, input.len());
        if status != Status::Internal {
            buf.skip(read);
        }
        status
    }

    /// Writes the bytes that return the output to the initial shift state.
    ///
    /// Does nothing for encodings without shift states.
    pub fn enc_reset(&self, state: &mut EncoderState, buf: &mut EncodeBuffer<'_>) -> Status {
        if !self.can_enc_reset() {
            return Status::Success;
        }
        let (_, mut out) = buf.step();
        let result = state.inner.flush(&mut out);
        state.last_result = Some(result);
        match result {
            Conversion::Underflow => Status::Success,
            Conversion::Overflow => Status::TooSmall,
            Conversion::Malformed(_) | Conversion::Unmappable(_) => Status::Internal,
        }
    }

    pub fn dec_reset(&self, state: &mut DecoderState) {
        state.reset();
    }

    /// Encodes all of `text`, returning the bytes and the number of
    /// characters consumed.
    pub fn encode(&self, text: &str, errors: &Errors) -> Result<(Vec<u8>, usize), CodecError> {
        let input: Vec<char> = text.chars().collect();
        let mut state = self.enc_init();
        let bytes = driver::encode(self, &mut state, &input, errors, Flags::FLUSH_RESET)?;
        Ok((bytes, input.len()))
    }

    /// Decodes all of `data`, returning the text and the number of bytes
    /// consumed.
    pub fn decode(&self, data: &[u8], errors: &Errors) -> Result<(String, usize), CodecError> {
        let mut state = self.dec_init();
        let text = driver::decode(self, &mut state, data, errors)?;
        Ok((text, data.len()))
    }
}

fn classify(result: Conversion, read: usize, len: usize) -> Status {
    if read > len {
        return Status::Internal;
    }
    match result {
        Conversion::Overflow => Status::TooSmall,
        Conversion::Underflow if read == len => Status::Success,
        Conversion::Underflow => Status::TooFew,
        Conversion::Malformed(n) | Conversion::Unmappable(n) => {
            if n == 0 || n > len - read {
                Status::Internal
            } else {
                Status::Error(n)
            }
        }
    }
}

#[test]
fn kinds_that_reset() {
    assert!(!Kind::Stateless.can_enc_reset());
    assert!(!Kind::StatelessWithInit.can_enc_reset());
    assert!(Kind::Stateful.can_enc_reset());
    assert!(Kind::Iso2022.can_enc_reset());
}

#[test]
fn classify_engine_results() {
    assert_eq!(classify(Conversion::Underflow, 4, 4), Status::Success);
    assert_eq!(classify(Conversion::Underflow, 3, 4), Status::TooFew);
    assert_eq!(classify(Conversion::Overflow, 1, 4), Status::TooSmall);
    assert_eq!(classify(Conversion::Malformed(2), 2, 4), Status::Error(2));
    assert_eq!(classify(Conversion::Unmappable(1), 0, 4), Status::Error(1));
    assert_eq!(classify(Conversion::Malformed(0), 0, 4), Status::Internal);
    assert_eq!(classify(Conversion::Malformed(3), 2, 4), Status::Internal);
    assert_eq!(classify(Conversion::Underflow, 5, 4), Status::Internal);
}
