//! Stateless multibyte encodings: every sequence is decoded on its own,
//! starting from a lead byte that tells how long the sequence is.

use std::collections::HashMap;
use std::sync::OnceLock;

use encoding_rs::{Encoding, BIG5, EUC_JP, EUC_KR, GBK, SHIFT_JIS};

use super::{
    table, ByteWriter, CharWriter, Charset, CharsetDecoder, CharsetEncoder, Conversion, Converted,
    StateToken,
};
use crate::error::CodecError;

/// The byte layout of a stateless multibyte encoding.
///
/// Decoding first checks a sequence against the layout and only then looks
/// it up in the mapping table, so that an invalid trail byte is reported
/// alone and can be tried again as the start of the next sequence.
#[derive(Clone, Copy)]
pub struct MultiByte {
    name: &'static str,
    table: &'static Encoding,
    /// Sequence length by lead byte; `None` if the byte can't start one.
    length: fn(u8) -> Option<usize>,
    /// Whether a byte is valid at the given index after the lead byte.
    trail: fn(u8, usize, u8) -> bool,
    /// Whether the table's encoding of a character belongs to this layout.
    encodable: fn(&[u8]) -> bool,
}

impl core::fmt::Debug for MultiByte {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MultiByte").field("name", &self.name).finish()
    }
}

impl MultiByte {
    /// The number of bytes in a sequence beginning with `lead`.
    fn sequence_len(&self, lead: u8) -> Option<usize> {
        (self.length)(lead)
    }
}

impl Charset for MultiByte {
    fn encoder(&self) -> Box<dyn CharsetEncoder> {
        Box::new(MultiByteEncoder { layout: *self })
    }

    fn decoder(&self) -> Box<dyn CharsetDecoder> {
        Box::new(MultiByteDecoder { layout: *self })
    }
}

struct MultiByteEncoder {
    layout: MultiByte,
}

impl CharsetEncoder for MultiByteEncoder {
    fn convert(&mut self, input: &[char], out: &mut ByteWriter<'_>, _flush: bool) -> Converted {
        for (i, &c) in input.iter().enumerate() {
            let written = if c.is_ascii() {
                out.write(&[c as u8])
            } else {
                match table::encode_char(self.layout.table, c) {
                    Some(bytes) if (self.layout.encodable)(&bytes) => out.write(&bytes),
                    _ => return Converted::new(Conversion::Unmappable(1), i),
                }
            };
            if written.is_err() {
                return Converted::new(Conversion::Overflow, i);
            }
        }
        Converted::new(Conversion::Underflow, input.len())
    }

    fn flush(&mut self, _out: &mut ByteWriter<'_>) -> Conversion {
        Conversion::Underflow
    }

    fn reset(&mut self) {}

    fn save(&self) -> StateToken {
        StateToken::INITIAL
    }

    fn restore(&mut self, token: StateToken) -> Result<(), CodecError> {
        stateless_restore(token)
    }
}

struct MultiByteDecoder {
    layout: MultiByte,
}

impl CharsetDecoder for MultiByteDecoder {
    fn convert(&mut self, input: &[u8], out: &mut CharWriter<'_>) -> Converted {
        let layout = &self.layout;
        let mut read = 0;
        while read < input.len() {
            let lead = input[read];
            let Some(len) = layout.sequence_len(lead) else {
                return Converted::new(Conversion::Malformed(1), read);
            };
            let avail = len.min(input.len() - read);
            if (1..avail).any(|i| !(layout.trail)(lead, i, input[read + i])) {
                // Only the lead is reported; the offending byte may well start
                // the next sequence.
                return Converted::new(Conversion::Malformed(1), read);
            }
            if avail < len {
                return Converted::new(Conversion::Underflow, read);
            }

            let written = if lead < 0x80 {
                out.write_char(lead as char)
            } else {
                match table::decode_sequence(layout.table, &input[read..read + len]) {
                    Some(text) => out.write_str(&text),
                    None => return Converted::new(Conversion::Malformed(len), read),
                }
            };
            if written.is_err() {
                return Converted::new(Conversion::Overflow, read);
            }
            read += len;
        }
        Converted::new(Conversion::Underflow, read)
    }

    fn reset(&mut self) {}

    fn save(&self) -> StateToken {
        StateToken::INITIAL
    }

    fn restore(&mut self, token: StateToken) -> Result<(), CodecError> {
        stateless_restore(token)
    }
}

fn stateless_restore(token: StateToken) -> Result<(), CodecError> {
    if token != StateToken::INITIAL {
        return Err(CodecError::InvalidState);
    }
    Ok(())
}

fn single_or_pair(b: u8, lead: core::ops::RangeInclusive<u8>) -> Option<usize> {
    if b < 0x80 {
        Some(1)
    } else if b >= *lead.start() && b <= *lead.end() {
        Some(2)
    } else {
        None
    }
}

fn two_high_bytes(bytes: &[u8]) -> bool {
    matches!(bytes, &[b1, b2] if b1 >= 0xa1 && b2 >= 0xa1)
}

/// GBK (code page 936), including the single-byte euro sign at 0x80.
pub static GBK_LAYOUT: MultiByte = MultiByte {
    name: "gbk",
    table: GBK,
    length: |b| match b {
        0x80 => Some(1),
        _ => single_or_pair(b, 0x81..=0xfe),
    },
    trail: |_, _, b| matches!(b, 0x40..=0x7e | 0x80..=0xfe),
    encodable: |_| true,
};

/// GB 2312 in its EUC-CN form.
pub static GB2312_LAYOUT: MultiByte = MultiByte {
    name: "gb2312",
    table: GBK,
    length: |b| single_or_pair(b, 0xa1..=0xf7),
    trail: |_, _, b| matches!(b, 0xa1..=0xfe),
    encodable: |bytes| two_high_bytes(bytes) && bytes[0] <= 0xf7,
};

/// Big5 without the HKSCS extension rows.
pub static BIG5_LAYOUT: MultiByte = MultiByte {
    name: "big5",
    table: BIG5,
    length: |b| single_or_pair(b, 0xa1..=0xf9),
    trail: |_, _, b| matches!(b, 0x40..=0x7e | 0xa1..=0xfe),
    encodable: |bytes| matches!(bytes, &[0xa1..=0xf9, _]),
};

/// Big5 with the Hong Kong Supplementary Character Set rows.
///
/// Its encoder only covers the rows shared with Big5; [`BIG5HKSCS`] is the
/// complete codec.
pub static BIG5HKSCS_LAYOUT: MultiByte = MultiByte {
    name: "big5hkscs",
    table: BIG5,
    length: |b| single_or_pair(b, 0x81..=0xfe),
    trail: |_, _, b| matches!(b, 0x40..=0x7e | 0xa1..=0xfe),
    encodable: |bytes| bytes.len() == 2,
};

/// Big5-HKSCS.
///
/// Four codes stand for a letter followed by a combining mark, so the encoder
/// holds a trailing `Ê` or `ê` back until it knows what comes next.
#[derive(Debug, Clone, Copy)]
pub struct Big5Hkscs;

pub static BIG5HKSCS: Big5Hkscs = Big5Hkscs;

impl Charset for Big5Hkscs {
    fn encoder(&self) -> Box<dyn CharsetEncoder> {
        Box::new(Big5HkscsEncoder {
            extension: hkscs_extension(),
        })
    }

    fn decoder(&self) -> Box<dyn CharsetDecoder> {
        BIG5HKSCS_LAYOUT.decoder()
    }
}

const HKSCS_PAIRS: [(char, char, [u8; 2]); 4] = [
    ('\u{ca}', '\u{304}', [0x88, 0x62]),
    ('\u{ca}', '\u{30c}', [0x88, 0x64]),
    ('\u{ea}', '\u{304}', [0x88, 0xa3]),
    ('\u{ea}', '\u{30c}', [0x88, 0xa5]),
];

fn hkscs_pair(base: char, mark: char) -> Option<[u8; 2]> {
    HKSCS_PAIRS
        .iter()
        .find(|&&(b, m, _)| b == base && m == mark)
        .map(|&(_, _, code)| code)
}

/// Reverse mapping for the rows below 0xa1, which the Big5 encoder of
/// `encoding_rs` never produces. Built on first use.
fn hkscs_extension() -> &'static HashMap<char, [u8; 2]> {
    static EXTENSION: OnceLock<HashMap<char, [u8; 2]>> = OnceLock::new();
    EXTENSION.get_or_init(|| {
        let mut map = HashMap::new();
        for lead in 0x81..=0xa0_u8 {
            for trail in (0x40..=0x7e_u8).chain(0xa1..=0xfe) {
                let seq = [lead, trail];
                let Some(text) = table::decode_sequence(BIG5, &seq) else {
                    continue;
                };
                let mut chars = text.chars();
                if let (Some(c), None) = (chars.next(), chars.next()) {
                    map.entry(c).or_insert([lead, trail]);
                }
            }
        }
        tracing::debug!(entries = map.len(), "built big5hkscs extension table");
        map
    })
}

struct Big5HkscsEncoder {
    extension: &'static HashMap<char, [u8; 2]>,
}

impl Big5HkscsEncoder {
    fn single(&self, c: char) -> Option<[u8; 2]> {
        match table::encode_char(BIG5, c).as_deref() {
            Some(&[b1, b2]) if b1 >= 0xa1 => Some([b1, b2]),
            _ => self.extension.get(&c).copied(),
        }
    }
}

impl CharsetEncoder for Big5HkscsEncoder {
    fn convert(&mut self, input: &[char], out: &mut ByteWriter<'_>, flush: bool) -> Converted {
        let mut i = 0;
        while i < input.len() {
            let c = input[i];
            let mut used = 1;
            let written = if c.is_ascii() {
                out.write(&[c as u8])
            } else {
                let is_base = HKSCS_PAIRS.iter().any(|&(b, _, _)| b == c);
                let pair = match input.get(i + 1) {
                    Some(&mark) if is_base => hkscs_pair(c, mark),
                    None if is_base && !flush => {
                        return Converted::new(Conversion::Underflow, i);
                    }
                    _ => None,
                };
                match pair {
                    Some(code) => {
                        used = 2;
                        out.write(&code)
                    }
                    None => match self.single(c) {
                        Some(code) => out.write(&code),
                        None => return Converted::new(Conversion::Unmappable(1), i),
                    },
                }
            };
            if written.is_err() {
                return Converted::new(Conversion::Overflow, i);
            }
            i += used;
        }
        Converted::new(Conversion::Underflow, input.len())
    }

    fn flush(&mut self, _out: &mut ByteWriter<'_>) -> Conversion {
        Conversion::Underflow
    }

    fn reset(&mut self) {}

    fn save(&self) -> StateToken {
        StateToken::INITIAL
    }

    fn restore(&mut self, token: StateToken) -> Result<(), CodecError> {
        stateless_restore(token)
    }
}

pub static SHIFT_JIS_LAYOUT: MultiByte = MultiByte {
    name: "shift_jis",
    table: SHIFT_JIS,
    length: |b| match b {
        0x00..=0x80 | 0xa1..=0xdf => Some(1),
        0x81..=0x9f | 0xe0..=0xfc => Some(2),
        _ => None,
    },
    trail: |_, _, b| matches!(b, 0x40..=0x7e | 0x80..=0xfc),
    encodable: |_| true,
};

/// EUC-JP with JIS X 0208, half-width katakana and JIS X 0212 (decode only).
pub static EUC_JP_LAYOUT: MultiByte = MultiByte {
    name: "euc_jp",
    table: EUC_JP,
    length: |b| match b {
        0x00..=0x7f => Some(1),
        0x8e | 0xa1..=0xfe => Some(2),
        0x8f => Some(3),
        _ => None,
    },
    trail: |lead, _, b| match lead {
        0x8e => matches!(b, 0xa1..=0xdf),
        _ => matches!(b, 0xa1..=0xfe),
    },
    encodable: |_| true,
};

/// EUC-KR restricted to KS X 1001.
pub static EUC_KR_LAYOUT: MultiByte = MultiByte {
    name: "euc_kr",
    table: EUC_KR,
    length: |b| single_or_pair(b, 0xa1..=0xfe),
    trail: |_, _, b| matches!(b, 0xa1..=0xfe),
    encodable: two_high_bytes,
};

/// Unified Hangul Code (code page 949), a superset of EUC-KR.
pub static CP949_LAYOUT: MultiByte = MultiByte {
    name: "cp949",
    table: EUC_KR,
    length: |b| single_or_pair(b, 0x81..=0xfe),
    trail: |_, _, b| matches!(b, 0x41..=0x5a | 0x61..=0x7a | 0x81..=0xfe),
    encodable: |bytes| bytes.len() == 2,
};

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(layout: &MultiByte, input: &[u8]) -> (String, Converted) {
        let mut text = String::new();
        let mut chars = 0;
        let mut out = CharWriter::new(&mut text, &mut chars, usize::MAX);
        let converted = layout.decoder().convert(input, &mut out);
        (text, converted)
    }

    fn encode_all(layout: &MultiByte, input: &str) -> (Vec<u8>, Converted) {
        let chars: Vec<char> = input.chars().collect();
        let mut bytes = Vec::new();
        let mut out = ByteWriter::new(&mut bytes, usize::MAX);
        let converted = layout.encoder().convert(&chars, &mut out, true);
        (bytes, converted)
    }

    #[test]
    fn decodes_complete_sequences() {
        let (text, converted) = decode_all(&GBK_LAYOUT, b"A\xd6\xd0\x80");
        assert_eq!(text, "A中€");
        assert_eq!(converted, Converted::new(Conversion::Underflow, 4));

        let (text, _) = decode_all(&SHIFT_JIS_LAYOUT, b"\x93\xfa\x96\x7b\xb1");
        assert_eq!(text, "日本ｱ");

        let (text, _) = decode_all(&EUC_JP_LAYOUT, b"\xc6\xfc\x8e\xb1");
        assert_eq!(text, "日ｱ");

        let (text, _) = decode_all(&BIG5_LAYOUT, b"\xa4\xa4");
        assert_eq!(text, "中");
    }

    #[test]
    fn leaves_incomplete_tail_unread() {
        let (text, converted) = decode_all(&GBK_LAYOUT, b"A\xd6");
        assert_eq!(text, "A");
        assert_eq!(converted, Converted::new(Conversion::Underflow, 1));

        let (_, converted) = decode_all(&EUC_JP_LAYOUT, b"\x8f\xa2");
        assert_eq!(converted, Converted::new(Conversion::Underflow, 0));
    }

    #[test]
    fn reports_malformed_without_consuming() {
        // 0xff can never start a sequence.
        let (text, converted) = decode_all(&GBK_LAYOUT, b"AB\xffC");
        assert_eq!(text, "AB");
        assert_eq!(converted, Converted::new(Conversion::Malformed(1), 2));

        // A bad trail byte blames the lead alone.
        let (_, converted) = decode_all(&GB2312_LAYOUT, b"\xd6\x41");
        assert_eq!(converted, Converted::new(Conversion::Malformed(1), 0));

        // Bad trails are noticed even before the sequence is complete.
        let (_, converted) = decode_all(&EUC_JP_LAYOUT, b"\x8f\x41");
        assert_eq!(converted, Converted::new(Conversion::Malformed(1), 0));
    }

    #[test]
    fn encodes_through_layout() {
        let (bytes, converted) = encode_all(&GBK_LAYOUT, "A中");
        assert_eq!(bytes, b"A\xd6\xd0");
        assert_eq!(converted, Converted::new(Conversion::Underflow, 2));

        // 丂 is a GBK extension character outside GB 2312.
        let (bytes, converted) = encode_all(&GB2312_LAYOUT, "中丂");
        assert_eq!(bytes, b"\xd6\xd0");
        assert_eq!(converted, Converted::new(Conversion::Unmappable(1), 1));
    }

    #[test]
    fn hkscs_pairs_encode_as_one_code() {
        let encode = |input: &str, flush: bool| {
            let chars: Vec<char> = input.chars().collect();
            let mut bytes = Vec::new();
            let mut out = ByteWriter::new(&mut bytes, usize::MAX);
            let converted = BIG5HKSCS.encoder().convert(&chars, &mut out, flush);
            (bytes, converted)
        };

        let (bytes, converted) = encode("\u{ca}\u{304}\u{ea}\u{30c}", true);
        assert_eq!(bytes, b"\x88\x62\x88\xa5");
        assert_eq!(converted, Converted::new(Conversion::Underflow, 4));

        // Without a mark the letter has a code of its own.
        let (bytes, _) = encode("\u{ca}a\u{ea}", true);
        assert_eq!(bytes, b"\x88\x66a\x88\xa7");

        // A letter at the end waits for more input unless flushing.
        let (bytes, converted) = encode("a\u{ca}", false);
        assert_eq!(bytes, b"a");
        assert_eq!(converted, Converted::new(Conversion::Underflow, 1));

        // A mark on its own has no code.
        let (_, converted) = encode("\u{304}", true);
        assert_eq!(converted, Converted::new(Conversion::Unmappable(1), 0));
    }

    #[test]
    fn hkscs_extension_rows_round_trip() {
        let (text, _) = decode_all(&BIG5HKSCS_LAYOUT, b"\x88\x62\x88\x66\xa4\xa4");
        assert_eq!(text, "\u{ca}\u{304}\u{ca}中");

        let chars: Vec<char> = text.chars().collect();
        let mut bytes = Vec::new();
        let mut out = ByteWriter::new(&mut bytes, usize::MAX);
        BIG5HKSCS.encoder().convert(&chars, &mut out, true);
        assert_eq!(bytes, b"\x88\x62\x88\x66\xa4\xa4");
    }

    #[test]
    fn stops_before_output_overflows() {
        let chars: Vec<char> = "A中".chars().collect();
        let mut bytes = Vec::new();
        let mut out = ByteWriter::new(&mut bytes, 2);
        let converted = GBK_LAYOUT.encoder().convert(&chars, &mut out, false);
        assert_eq!(converted, Converted::new(Conversion::Overflow, 1));
        assert_eq!(bytes, b"A");
    }
}
