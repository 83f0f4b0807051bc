//! 7-bit ISO 2022 encodings that switch character sets with escape
//! sequences (ISO-2022-JP) or with shift-out/shift-in (ISO-2022-KR).

use super::{
    table, ByteWriter, CharWriter, Charset, CharsetDecoder, CharsetEncoder, Conversion, Converted,
    Seq, StateToken,
};
use crate::error::CodecError;

const ESC: u8 = 0x1b;
const SO: u8 = 0x0e;
const SI: u8 = 0x0f;

enum Escape<T> {
    /// The input ends inside what may still become a known sequence.
    Incomplete,
    Unknown,
    /// A known sequence of the given length.
    Known(T, usize),
}

fn escape<T: Copy>(rest: &[u8], known: &[(&[u8], T)]) -> Escape<T> {
    for &(seq, value) in known {
        if rest.starts_with(seq) {
            return Escape::Known(value, seq.len());
        }
    }
    if known.iter().any(|(seq, _)| seq.starts_with(rest)) {
        return Escape::Incomplete;
    }
    Escape::Unknown
}

/// The character set designated to G0 in ISO-2022-JP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum G0 {
    Ascii = 0,
    JisRoman = 1,
    Jis0208 = 2,
}

impl G0 {
    const fn designation(self) -> &'static [u8] {
        match self {
            G0::Ascii => b"\x1b(B",
            G0::JisRoman => b"\x1b(J",
            G0::Jis0208 => b"\x1b$B",
        }
    }

    fn from_flag(flag: u8) -> Result<Self, CodecError> {
        Ok(match flag {
            0 => G0::Ascii,
            1 => G0::JisRoman,
            2 => G0::Jis0208,
            _ => return Err(CodecError::InvalidState),
        })
    }
}

const JP_ESCAPES: &[(&[u8], G0)] = &[
    (b"\x1b(B", G0::Ascii),
    (b"\x1b(J", G0::JisRoman),
    (b"\x1b$@", G0::Jis0208),
    (b"\x1b$B", G0::Jis0208),
];

/// ISO-2022-JP (RFC 1468): ASCII, JIS X 0201 Roman and JIS X 0208.
#[derive(Debug, Clone, Copy, Default)]
pub struct Iso2022Jp;

pub static ISO2022_JP: Iso2022Jp = Iso2022Jp;

impl Charset for Iso2022Jp {
    fn encoder(&self) -> Box<dyn CharsetEncoder> {
        Box::new(Iso2022JpEncoder { g0: G0::Ascii })
    }

    fn decoder(&self) -> Box<dyn CharsetDecoder> {
        Box::new(Iso2022JpDecoder { g0: G0::Ascii })
    }
}

struct Iso2022JpEncoder {
    g0: G0,
}

impl CharsetEncoder for Iso2022JpEncoder {
    fn convert(&mut self, input: &[char], out: &mut ByteWriter<'_>, _flush: bool) -> Converted {
        for (i, &c) in input.iter().enumerate() {
            let (g0, byte) = match c {
                // JIS X 0201 Roman differs from ASCII only at these two.
                '\\' | '~' => (G0::Ascii, c as u8),
                _ if c.is_ascii() && self.g0 == G0::JisRoman => (G0::JisRoman, c as u8),
                _ if c.is_ascii() => (G0::Ascii, c as u8),
                '\u{a5}' => (G0::JisRoman, b'\\'),
                '\u{203e}' => (G0::JisRoman, b'~'),
                _ => match table::jis0208_pair(c) {
                    Some(pair) => {
                        let mut seq = Seq::default();
                        if self.g0 != G0::Jis0208 {
                            seq.push(G0::Jis0208.designation());
                        }
                        seq.push(&pair);
                        if out.write(seq.as_slice()).is_err() {
                            return Converted::new(Conversion::Overflow, i);
                        }
                        self.g0 = G0::Jis0208;
                        continue;
                    }
                    None => return Converted::new(Conversion::Unmappable(1), i),
                },
            };
            let mut seq = Seq::default();
            if self.g0 != g0 {
                seq.push(g0.designation());
            }
            seq.push(&[byte]);
            if out.write(seq.as_slice()).is_err() {
                return Converted::new(Conversion::Overflow, i);
            }
            self.g0 = g0;
        }
        Converted::new(Conversion::Underflow, input.len())
    }

    fn flush(&mut self, out: &mut ByteWriter<'_>) -> Conversion {
        if self.g0 != G0::Ascii {
            if out.write(G0::Ascii.designation()).is_err() {
                return Conversion::Overflow;
            }
            self.g0 = G0::Ascii;
        }
        Conversion::Underflow
    }

    fn reset(&mut self) {
        self.g0 = G0::Ascii;
    }

    fn save(&self) -> StateToken {
        StateToken::from_flags(self.g0 as u8, 0)
    }

    fn restore(&mut self, token: StateToken) -> Result<(), CodecError> {
        match token.flags()? {
            (flag, 0) => self.g0 = G0::from_flag(flag)?,
            _ => return Err(CodecError::InvalidState),
        }
        Ok(())
    }
}

struct Iso2022JpDecoder {
    g0: G0,
}

impl CharsetDecoder for Iso2022JpDecoder {
    fn convert(&mut self, input: &[u8], out: &mut CharWriter<'_>) -> Converted {
        let mut read = 0;
        while read < input.len() {
            let c = input[read];
            if c == ESC {
                match escape(&input[read..], JP_ESCAPES) {
                    Escape::Known(g0, len) => {
                        self.g0 = g0;
                        read += len;
                        continue;
                    }
                    Escape::Incomplete => return Converted::new(Conversion::Underflow, read),
                    Escape::Unknown => return Converted::new(Conversion::Malformed(1), read),
                }
            }
            if c >= 0x80 || c == SO || c == SI {
                return Converted::new(Conversion::Malformed(1), read);
            }

            if self.g0 != G0::Jis0208 || !table::is_gl(c) {
                let ch = match (self.g0, c) {
                    (G0::JisRoman, b'\\') => '\u{a5}',
                    (G0::JisRoman, b'~') => '\u{203e}',
                    _ => c as char,
                };
                if out.write_char(ch).is_err() {
                    return Converted::new(Conversion::Overflow, read);
                }
                read += 1;
                continue;
            }

            let Some(&c2) = input.get(read + 1) else {
                return Converted::new(Conversion::Underflow, read);
            };
            let Some(text) = table::decode_jis0208_pair(c, c2) else {
                return Converted::new(Conversion::Malformed(1), read);
            };
            if out.write_str(&text).is_err() {
                return Converted::new(Conversion::Overflow, read);
            }
            read += 2;
        }
        Converted::new(Conversion::Underflow, read)
    }

    fn reset(&mut self) {
        self.g0 = G0::Ascii;
    }

    fn save(&self) -> StateToken {
        StateToken::from_flags(self.g0 as u8, 0)
    }

    fn restore(&mut self, token: StateToken) -> Result<(), CodecError> {
        match token.flags()? {
            (flag, 0) => self.g0 = G0::from_flag(flag)?,
            _ => return Err(CodecError::InvalidState),
        }
        Ok(())
    }
}

const KSC5601_DESIGNATION: &[u8] = b"\x1b$)C";

/// ISO-2022-KR (RFC 1557): KS X 1001 designated to G1 once, then shifted in
/// and out with SO and SI.
#[derive(Debug, Clone, Copy, Default)]
pub struct Iso2022Kr;

pub static ISO2022_KR: Iso2022Kr = Iso2022Kr;

impl Charset for Iso2022Kr {
    fn encoder(&self) -> Box<dyn CharsetEncoder> {
        Box::new(Iso2022KrEncoder::default())
    }

    fn decoder(&self) -> Box<dyn CharsetDecoder> {
        Box::new(Iso2022KrDecoder::default())
    }
}

#[derive(Default)]
struct ShiftState {
    designated: bool,
    shifted: bool,
}

impl ShiftState {
    fn token(&self) -> StateToken {
        StateToken::from_flags(self.designated as u8, self.shifted as u8)
    }

    fn restore(&mut self, token: StateToken) -> Result<(), CodecError> {
        let (designated, shifted) = match token.flags()? {
            (0, 0) => (false, false),
            (1, 0) => (true, false),
            (1, 1) => (true, true),
            _ => return Err(CodecError::InvalidState),
        };
        self.designated = designated;
        self.shifted = shifted;
        Ok(())
    }
}

#[derive(Default)]
struct Iso2022KrEncoder {
    state: ShiftState,
}

impl CharsetEncoder for Iso2022KrEncoder {
    fn convert(&mut self, input: &[char], out: &mut ByteWriter<'_>, _flush: bool) -> Converted {
        for (i, &c) in input.iter().enumerate() {
            let mut seq = Seq::default();
            let shifted = if c.is_ascii() {
                if self.state.shifted {
                    seq.push(&[SI]);
                }
                seq.push(&[c as u8]);
                false
            } else {
                let Some(pair) = table::ksx1001_pair(c) else {
                    return Converted::new(Conversion::Unmappable(1), i);
                };
                if !self.state.designated {
                    seq.push(KSC5601_DESIGNATION);
                }
                if !self.state.shifted {
                    seq.push(&[SO]);
                }
                seq.push(&pair);
                true
            };
            if out.write(seq.as_slice()).is_err() {
                return Converted::new(Conversion::Overflow, i);
            }
            self.state.designated |= shifted;
            self.state.shifted = shifted;
        }
        Converted::new(Conversion::Underflow, input.len())
    }

    fn flush(&mut self, out: &mut ByteWriter<'_>) -> Conversion {
        if self.state.shifted {
            if out.write(&[SI]).is_err() {
                return Conversion::Overflow;
            }
            self.state.shifted = false;
        }
        Conversion::Underflow
    }

    fn reset(&mut self) {
        self.state = ShiftState::default();
    }

    fn save(&self) -> StateToken {
        self.state.token()
    }

    fn restore(&mut self, token: StateToken) -> Result<(), CodecError> {
        self.state.restore(token)
    }
}

#[derive(Default)]
struct Iso2022KrDecoder {
    state: ShiftState,
}

impl CharsetDecoder for Iso2022KrDecoder {
    fn convert(&mut self, input: &[u8], out: &mut CharWriter<'_>) -> Converted {
        let mut read = 0;
        while read < input.len() {
            let c = input[read];
            match c {
                ESC => match escape(&input[read..], &[(KSC5601_DESIGNATION, ())]) {
                    Escape::Known((), len) => {
                        self.state.designated = true;
                        read += len;
                        continue;
                    }
                    Escape::Incomplete => return Converted::new(Conversion::Underflow, read),
                    Escape::Unknown => return Converted::new(Conversion::Malformed(1), read),
                },
                SO if self.state.designated => {
                    self.state.shifted = true;
                    read += 1;
                    continue;
                }
                SI => {
                    self.state.shifted = false;
                    read += 1;
                    continue;
                }
                SO | 0x80..=0xff => return Converted::new(Conversion::Malformed(1), read),
                _ => {}
            }

            if !self.state.shifted || !table::is_gl(c) {
                if out.write_char(c as char).is_err() {
                    return Converted::new(Conversion::Overflow, read);
                }
                read += 1;
                continue;
            }

            let Some(&c2) = input.get(read + 1) else {
                return Converted::new(Conversion::Underflow, read);
            };
            let Some(text) = table::decode_ksx1001_pair(c, c2) else {
                return Converted::new(Conversion::Malformed(1), read);
            };
            if out.write_str(&text).is_err() {
                return Converted::new(Conversion::Overflow, read);
            }
            read += 2;
        }
        Converted::new(Conversion::Underflow, read)
    }

    fn reset(&mut self) {
        self.state = ShiftState::default();
    }

    fn save(&self) -> StateToken {
        self.state.token()
    }

    fn restore(&mut self, token: StateToken) -> Result<(), CodecError> {
        self.state.restore(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(charset: &dyn Charset, input: &str) -> Vec<u8> {
        let input: Vec<char> = input.chars().collect();
        let mut bytes = Vec::new();
        let mut encoder = charset.encoder();
        let mut out = ByteWriter::new(&mut bytes, 256);
        let converted = encoder.convert(&input, &mut out, true);
        assert_eq!(converted.result, Conversion::Underflow);
        assert_eq!(encoder.flush(&mut out), Conversion::Underflow);
        bytes
    }

    fn decode(charset: &dyn Charset, input: &[u8]) -> (String, Converted) {
        let mut text = String::new();
        let mut chars = 0;
        let mut out = CharWriter::new(&mut text, &mut chars, 256);
        let converted = charset.decoder().convert(input, &mut out);
        (text, converted)
    }

    #[test]
    fn iso2022_jp_designates_per_character_set() {
        let bytes = encode(&ISO2022_JP, "A日\u{a5}");
        assert_eq!(bytes, b"A\x1b$BF|\x1b(J\\\x1b(B");

        let (text, converted) = decode(&ISO2022_JP, &bytes);
        assert_eq!(text, "A日\u{a5}");
        assert_eq!(converted, Converted::new(Conversion::Underflow, bytes.len()));
    }

    #[test]
    fn iso2022_jp_leaves_partial_escape_unread() {
        let (text, converted) = decode(&ISO2022_JP, b"A\x1b$");
        assert_eq!(text, "A");
        assert_eq!(converted, Converted::new(Conversion::Underflow, 1));

        let (_, converted) = decode(&ISO2022_JP, b"A\x1b$Z");
        assert_eq!(converted, Converted::new(Conversion::Malformed(1), 1));
    }

    #[test]
    fn iso2022_kr_designates_once() {
        let bytes = encode(&ISO2022_KR, "a한b한");
        assert_eq!(bytes, b"a\x1b$)C\x0eGQ\x0fb\x0eGQ\x0f");

        let (text, _) = decode(&ISO2022_KR, &bytes);
        assert_eq!(text, "a한b한");

        // Shifting out before the designation is an error.
        let (_, converted) = decode(&ISO2022_KR, b"\x0eGQ");
        assert_eq!(converted, Converted::new(Conversion::Malformed(1), 0));
    }

    #[test]
    fn state_tokens_round_trip() {
        let mut encoder = ISO2022_KR.encoder();
        let mut bytes = Vec::new();
        let mut out = ByteWriter::new(&mut bytes, 64);
        encoder.convert(&['한'], &mut out, false);
        let token = encoder.save();

        let mut other = ISO2022_KR.encoder();
        other.restore(token).unwrap();
        assert_eq!(other.save(), token);
        assert!(other.restore(StateToken([0, 1, 0, 0, 0, 0, 0, 0])).is_err());
    }
}
