//! HZ (RFC 1843): GB 2312 in 7-bit form between `~{` and `~}` shifts.

use super::{
    table, ByteWriter, CharWriter, Charset, CharsetDecoder, CharsetEncoder, Conversion, Converted,
    Seq, StateToken,
};
use crate::error::CodecError;

#[derive(Debug, Clone, Copy, Default)]
pub struct Hz;

pub static HZ: Hz = Hz;

impl Charset for Hz {
    fn encoder(&self) -> Box<dyn CharsetEncoder> {
        Box::new(HzEncoder { gb: false })
    }

    fn decoder(&self) -> Box<dyn CharsetDecoder> {
        Box::new(HzDecoder { gb: false })
    }
}

struct HzEncoder {
    /// In GB 2312 mode.
    gb: bool,
}

impl CharsetEncoder for HzEncoder {
    fn convert(&mut self, input: &[char], out: &mut ByteWriter<'_>, _flush: bool) -> Converted {
        for (i, &c) in input.iter().enumerate() {
            let mut seq = Seq::default();
            let gb = if c.is_ascii() {
                if self.gb {
                    seq.push(b"~}");
                }
                seq.push(&[c as u8]);
                if c == '~' {
                    seq.push(b"~");
                }
                false
            } else {
                let Some(pair) = table::gb2312_pair(c) else {
                    return Converted::new(Conversion::Unmappable(1), i);
                };
                if !self.gb {
                    seq.push(b"~{");
                }
                seq.push(&pair);
                true
            };
            if out.write(seq.as_slice()).is_err() {
                return Converted::new(Conversion::Overflow, i);
            }
            self.gb = gb;
        }
        Converted::new(Conversion::Underflow, input.len())
    }

    fn flush(&mut self, out: &mut ByteWriter<'_>) -> Conversion {
        if self.gb {
            if out.write(b"~}").is_err() {
                return Conversion::Overflow;
            }
            self.gb = false;
        }
        Conversion::Underflow
    }

    fn reset(&mut self) {
        self.gb = false;
    }

    fn save(&self) -> StateToken {
        StateToken::from_flags(self.gb as u8, 0)
    }

    fn restore(&mut self, token: StateToken) -> Result<(), CodecError> {
        self.gb = match token.flags()? {
            (0, 0) => false,
            (1, 0) => true,
            _ => return Err(CodecError::InvalidState),
        };
        Ok(())
    }
}

struct HzDecoder {
    gb: bool,
}

impl CharsetDecoder for HzDecoder {
    fn convert(&mut self, input: &[u8], out: &mut CharWriter<'_>) -> Converted {
        let mut read = 0;
        while read < input.len() {
            let c = input[read];
            if c == b'~' {
                let Some(&c2) = input.get(read + 1) else {
                    return Converted::new(Conversion::Underflow, read);
                };
                match (c2, self.gb) {
                    (b'~', false) => {
                        if out.write_char('~').is_err() {
                            return Converted::new(Conversion::Overflow, read);
                        }
                    }
                    (b'{', false) => self.gb = true,
                    (b'}', true) => self.gb = false,
                    // line continuation
                    (b'\n', false) => {}
                    _ => return Converted::new(Conversion::Malformed(1), read),
                }
                read += 2;
                continue;
            }
            if c & 0x80 != 0 {
                return Converted::new(Conversion::Malformed(1), read);
            }
            if !self.gb {
                if out.write_char(c as char).is_err() {
                    return Converted::new(Conversion::Overflow, read);
                }
                read += 1;
                continue;
            }

            let Some(&c2) = input.get(read + 1) else {
                return Converted::new(Conversion::Underflow, read);
            };
            let Some(text) = table::decode_gb2312_pair(c, c2) else {
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
        self.gb = false;
    }

    fn save(&self) -> StateToken {
        StateToken::from_flags(self.gb as u8, 0)
    }

    fn restore(&mut self, token: StateToken) -> Result<(), CodecError> {
        self.gb = match token.flags()? {
            (0, 0) => false,
            (1, 0) => true,
            _ => return Err(CodecError::InvalidState),
        };
        Ok(())
    }
}

#[test]
fn hz_shifts_around_gb2312() {
    let input: Vec<char> = "A中~x".chars().collect();
    let mut bytes = Vec::new();
    let mut encoder = HZ.encoder();
    let mut out = ByteWriter::new(&mut bytes, 64);
    assert_eq!(
        encoder.convert(&input, &mut out, true),
        Converted::new(Conversion::Underflow, 4)
    );
    assert_eq!(bytes, b"A~{VP~}~~x");

    let mut text = String::new();
    let mut chars = 0;
    let mut decoder = HZ.decoder();
    let mut out = CharWriter::new(&mut text, &mut chars, 64);
    assert_eq!(
        decoder.convert(b"A~{VP~}~~x~\ny", &mut out),
        Converted::new(Conversion::Underflow, 13)
    );
    assert_eq!(text, "A中~xy");
}

#[test]
fn hz_flush_returns_to_ascii() {
    let mut bytes = Vec::new();
    let mut encoder = HZ.encoder();
    let mut out = ByteWriter::new(&mut bytes, 64);
    encoder.convert(&['中'], &mut out, false);
    assert_eq!(encoder.save(), StateToken::from_flags(1, 0));
    assert_eq!(encoder.flush(&mut out), Conversion::Underflow);
    assert_eq!(bytes, b"~{VP~}");
    assert_eq!(encoder.save(), StateToken::INITIAL);
}
