//! The loops that alternate conversion steps with error handling until an
//! input is done.

use tracing::trace;

use crate::buffer::{DecodeBuffer, EncodeBuffer};
use crate::codec::{Codec, DecoderState, EncoderState, Flags, Status};
use crate::error::CodecError;
use crate::handler::{decode_error, encode_error, Errors};

/// Encodes `input` within the session `state`.
///
/// Without [`Flags::flush`], an incomplete sequence at the end of the input
/// is left unconverted; use [`encode_into`] to find out where it starts.
pub fn encode(
    codec: &Codec,
    state: &mut EncoderState,
    input: &[char],
    errors: &Errors,
    flags: Flags,
) -> Result<Vec<u8>, CodecError> {
    if input.is_empty() && !flags.reset {
        return Ok(Vec::new());
    }
    let mut buf = EncodeBuffer::new(input)?;
    encode_into(codec, state, &mut buf, errors, flags)?;
    Ok(buf.into_bytes())
}

/// Runs the encode loop over an existing buffer, leaving its cursor at the
/// first character that was not consumed.
pub fn encode_into(
    codec: &Codec,
    state: &mut EncoderState,
    buf: &mut EncodeBuffer<'_>,
    errors: &Errors,
    flags: Flags,
) -> Result<(), CodecError> {
    while !buf.is_full() {
        let status = codec.encode_step(state, buf, flags);
        trace!(codec = codec.name(), ?status, position = buf.position(), "encode step");
        match status {
            Status::Success => break,
            Status::TooFew if !flags.flush => break,
            _ => {}
        }
        encode_error(codec, state, buf, errors, status)?;
        if status == Status::TooFew {
            break;
        }
    }

    if codec.can_enc_reset() && flags.reset {
        loop {
            let status = codec.enc_reset(state, buf);
            trace!(codec = codec.name(), ?status, "encode reset step");
            if status == Status::Success {
                break;
            }
            encode_error(codec, state, buf, errors, status)?;
        }
    }
    Ok(())
}

/// Decodes all of `data` within the session `state`. An incomplete sequence
/// at the end goes through the error handler.
pub fn decode(
    codec: &Codec,
    state: &mut DecoderState,
    data: &[u8],
    errors: &Errors,
) -> Result<String, CodecError> {
    if data.is_empty() {
        return Ok(String::new());
    }
    let mut buf = DecodeBuffer::new(data);
    while !buf.is_full() {
        let status = codec.decode_step(state, &mut buf);
        trace!(codec = codec.name(), ?status, position = buf.position(), "decode step");
        if status == Status::Success {
            break;
        }
        decode_error(codec, &mut buf, errors, status)?;
    }
    Ok(buf.into_text())
}

/// Decodes as much of the buffer's input as possible, stopping short of an
/// incomplete sequence at the end.
pub fn feed(
    codec: &Codec,
    state: &mut DecoderState,
    buf: &mut DecodeBuffer<'_>,
    errors: &Errors,
) -> Result<(), CodecError> {
    while !buf.is_full() {
        let status = codec.decode_step(state, buf);
        trace!(codec = codec.name(), ?status, position = buf.position(), "feed step");
        if matches!(status, Status::Success | Status::TooFew) {
            break;
        }
        decode_error(codec, buf, errors, status)?;
    }
    Ok(())
}

/// Sends an incomplete sequence left at the end of the buffer's input
/// through the error handler, as at the end of the final chunk.
pub(crate) fn finish(codec: &Codec, buf: &mut DecodeBuffer<'_>, errors: &Errors) -> Result<(), CodecError> {
    if buf.is_full() {
        return Ok(());
    }
    decode_error(codec, buf, errors, Status::TooFew)
}
