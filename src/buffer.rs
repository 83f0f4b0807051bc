//! Input cursors and growable outputs for a single encode or decode call.

use tracing::debug;

use crate::charset::{ByteWriter, CharWriter};
use crate::error::{CodecError, DecodeFailure, EncodeFailure, Reason};

/// Largest input an encode call accepts: the initial output of two bytes per
/// character plus slack must still be allocatable.
pub const MAX_ENCODE_INPUT: usize = (isize::MAX as usize - 16) / 2;

/// Returns the capacity an output of `old` units grows to when at least
/// `min_extra` more units are needed.
///
/// Growth is by half the current size (rounded up to odd), or by exactly
/// `min_extra` if that is larger.
pub fn grown_capacity(old: usize, min_extra: usize) -> Result<usize, CodecError> {
    let inc = if min_extra < old >> 1 {
        (old >> 1) | 1
    } else {
        min_extra
    };
    let limit = isize::MAX as usize;
    if inc > limit || old > limit - inc {
        return Err(CodecError::OutOfMemory);
    }
    Ok(old + inc)
}

/// The state of one encode call: a cursor over the input characters and the
/// bytes produced so far.
///
/// The output has a logical capacity that a codec step may fill but not
/// exceed; the driving loop grows it whenever a step reports that the next
/// unit did not fit.
#[derive(Debug)]
pub struct EncodeBuffer<'a> {
    input: &'a [char],
    pos: usize,
    out: Vec<u8>,
    capacity: usize,
    failure: Option<Box<EncodeFailure>>,
}

impl<'a> EncodeBuffer<'a> {
    pub fn new(input: &'a [char]) -> Result<Self, CodecError> {
        if input.len() > MAX_ENCODE_INPUT {
            return Err(CodecError::OutOfMemory);
        }
        let capacity = input.len() * 2 + 16;
        Ok(Self {
            input,
            pos: 0,
            out: Vec::with_capacity(capacity),
            capacity,
            failure: None,
        })
    }

    pub fn input(&self) -> &'a [char] {
        self.input
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.input.len() - self.pos
    }

    /// True once the cursor has reached the end of the input.
    pub fn is_full(&self) -> bool {
        self.pos >= self.input.len()
    }

    pub fn output(&self) -> &[u8] {
        &self.out
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn expand_output(&mut self, min_extra: usize) -> Result<(), CodecError> {
        let capacity = grown_capacity(self.capacity, min_extra)?;
        debug!(from = self.capacity, to = capacity, "growing encode output");
        self.out.reserve_exact(capacity - self.out.len());
        self.capacity = capacity;
        Ok(())
    }

    /// Appends bytes, growing the output if they don't fit.
    pub fn append(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        if self.capacity - self.out.len() < bytes.len() {
            self.expand_output(bytes.len())?;
        }
        self.out.extend_from_slice(bytes);
        Ok(())
    }

    /// Moves the cursor. The caller has already checked `pos` against the
    /// input length.
    pub(crate) fn set_position(&mut self, pos: usize) {
        debug_assert!(pos <= self.input.len());
        self.pos = pos;
    }

    pub(crate) fn skip(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.input.len());
    }

    /// The unconverted input and a writer over the remaining output room.
    pub(crate) fn step(&mut self) -> (&'a [char], ByteWriter<'_>) {
        let input: &'a [char] = self.input;
        (&input[self.pos..], ByteWriter::new(&mut self.out, self.capacity))
    }

    /// Swaps in a different input, returning the previous input and cursor.
    pub(crate) fn swap_input(&mut self, input: &'a [char], pos: usize) -> (&'a [char], usize) {
        let prev = (self.input, self.pos);
        self.input = input;
        self.pos = pos;
        prev
    }

    /// Fills in the failure record for the error at the cursor, reusing the
    /// record from an earlier error in the same call.
    pub(crate) fn record_failure(&mut self, encoding: &str, len: usize, reason: Reason) -> &EncodeFailure {
        let input = self.input;
        let (start, end) = (self.pos, self.pos + len);
        let failure = self.failure.get_or_insert_with(|| {
            Box::new(EncodeFailure {
                encoding: encoding.to_owned(),
                object: input.to_vec(),
                start,
                end,
                reason,
            })
        });
        failure.start = start;
        failure.end = end;
        failure.reason = reason;
        failure
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.out
    }
}

/// Decoded text with its logical capacity, counted in characters.
///
/// Kept apart from [`DecodeBuffer`] so that a stream reader can keep
/// accumulating into it while feeding several input chunks.
#[derive(Debug, Default)]
pub struct DecodeOutput {
    text: String,
    chars: usize,
    capacity: usize,
}

impl DecodeOutput {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Number of characters decoded so far.
    pub fn len(&self) -> usize {
        self.chars
    }

    pub fn is_empty(&self) -> bool {
        self.chars == 0
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

/// The state of one decode call: a cursor over the input bytes and the text
/// produced so far.
#[derive(Debug)]
pub struct DecodeBuffer<'a> {
    input: &'a [u8],
    pos: usize,
    out: DecodeOutput,
    failure: Option<Box<DecodeFailure>>,
}

impl<'a> DecodeBuffer<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self::with_output(input, DecodeOutput::default())
    }

    /// Continues decoding into text produced from earlier input.
    pub fn with_output(input: &'a [u8], mut out: DecodeOutput) -> Self {
        let needed = out.chars.saturating_add(input.len());
        if out.capacity < needed {
            out.text.reserve(needed - out.capacity);
            out.capacity = needed;
        }
        Self {
            input,
            pos: 0,
            out,
            failure: None,
        }
    }

    pub fn input(&self) -> &'a [u8] {
        self.input
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.input.len() - self.pos
    }

    /// The input the cursor has not reached yet.
    pub fn remaining_input(&self) -> &'a [u8] {
        &self.input[self.pos..]
    }

    pub fn is_full(&self) -> bool {
        self.pos >= self.input.len()
    }

    pub fn output(&self) -> &DecodeOutput {
        &self.out
    }

    pub fn expand_output(&mut self, min_extra: usize) -> Result<(), CodecError> {
        let capacity = grown_capacity(self.out.capacity, min_extra)?;
        debug!(from = self.out.capacity, to = capacity, "growing decode output");
        self.out.text.reserve(capacity - self.out.chars);
        self.out.capacity = capacity;
        Ok(())
    }

    /// Appends text, growing the output if it doesn't fit.
    pub fn append(&mut self, s: &str) -> Result<(), CodecError> {
        let n = s.chars().count();
        if self.out.capacity - self.out.chars < n {
            self.expand_output(n)?;
        }
        self.out.text.push_str(s);
        self.out.chars += n;
        Ok(())
    }

    pub(crate) fn set_position(&mut self, pos: usize) {
        debug_assert!(pos <= self.input.len());
        self.pos = pos;
    }

    pub(crate) fn skip(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.input.len());
    }

    pub(crate) fn step(&mut self) -> (&'a [u8], CharWriter<'_>) {
        let input: &'a [u8] = self.input;
        let out = &mut self.out;
        (
            &input[self.pos..],
            CharWriter::new(&mut out.text, &mut out.chars, out.capacity),
        )
    }

    pub(crate) fn record_failure(&mut self, encoding: &str, len: usize, reason: Reason) -> &DecodeFailure {
        let input = self.input;
        let (start, end) = (self.pos, self.pos + len);
        let failure = self.failure.get_or_insert_with(|| {
            Box::new(DecodeFailure {
                encoding: encoding.to_owned(),
                object: input.to_vec(),
                start,
                end,
                reason,
            })
        });
        failure.start = start;
        failure.end = end;
        failure.reason = reason;
        failure
    }

    pub fn into_output(self) -> DecodeOutput {
        self.out
    }

    pub fn into_text(self) -> String {
        self.out.text
    }
}

#[test]
fn growth_follows_half_size_rule() {
    assert_eq!(grown_capacity(16, 0).unwrap(), 25);
    assert_eq!(grown_capacity(16, 7).unwrap(), 25);
    assert_eq!(grown_capacity(16, 8).unwrap(), 24);
    assert_eq!(grown_capacity(16, 100).unwrap(), 116);
    assert_eq!(grown_capacity(0, 0).unwrap(), 0);
    assert_eq!(grown_capacity(0, 1).unwrap(), 1);
    assert!(matches!(
        grown_capacity(isize::MAX as usize, 1),
        Err(CodecError::OutOfMemory)
    ));
}

#[test]
fn encode_buffer_records_one_failure() {
    let input: Vec<char> = "ab€".chars().collect();
    let mut buf = EncodeBuffer::new(&input).unwrap();
    assert_eq!(buf.capacity(), 22);

    buf.skip(2);
    let first = buf.record_failure("gb2312", 1, Reason::IllegalSequence).clone();
    assert_eq!((first.start(), first.end()), (2, 3));
    assert_eq!(first.unencodable(), &['€']);

    buf.set_position(0);
    let second = buf.record_failure("gb2312", 3, Reason::IncompleteSequence);
    assert_eq!((second.start(), second.end()), (0, 3));
    assert_eq!(second.reason(), Reason::IncompleteSequence);
    assert_eq!(second.object(), first.object());
}

#[test]
fn decode_output_carries_over() {
    let mut buf = DecodeBuffer::new(b"ab");
    buf.append("xy").unwrap();
    buf.skip(2);
    assert!(buf.is_full());

    let mut buf = DecodeBuffer::with_output(b"cd", buf.into_output());
    assert_eq!(buf.position(), 0);
    buf.append("z").unwrap();
    let out = buf.into_output();
    assert_eq!(out.as_str(), "xyz");
    assert_eq!(out.len(), 3);
}
