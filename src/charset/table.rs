//! Character lookups in the `encoding_rs` mapping tables.
//!
//! The engines only ever ask about one complete sequence or one character at
//! a time; framing and shift states are handled by the callers.

use std::borrow::Cow;

use encoding_rs::{Encoding, EUC_JP, EUC_KR, GBK};

/// Decodes one complete sequence, or `None` if the table has no mapping.
pub(crate) fn decode_sequence<'a>(
    encoding: &'static Encoding,
    seq: &'a [u8],
) -> Option<Cow<'a, str>> {
    encoding
        .decode_without_bom_handling_and_without_replacement(seq)
        .filter(|s| !s.is_empty())
}

/// Encodes one character, or `None` if the table has no mapping.
pub(crate) fn encode_char(encoding: &'static Encoding, c: char) -> Option<Vec<u8>> {
    let mut utf8 = [0_u8; 4];
    let (bytes, _, unmappable) = encoding.encode(c.encode_utf8(&mut utf8));
    if unmappable || bytes.is_empty() {
        return None;
    }
    Some(bytes.into_owned())
}

/// Decodes a 94×94 pair given in its 7-bit (GL) form through the EUC form
/// of `encoding`.
pub(crate) fn decode_gl_pair(encoding: &'static Encoding, b1: u8, b2: u8) -> Option<Cow<'static, str>> {
    if !is_gl(b1) || !is_gl(b2) {
        return None;
    }
    decode_sequence(encoding, &[b1 | 0x80, b2 | 0x80]).map(|s| Cow::Owned(s.into_owned()))
}

/// Encodes a character into a 94×94 pair in 7-bit (GL) form, going through
/// the EUC form of `encoding`.
fn encode_gl_pair(encoding: &'static Encoding, c: char) -> Option<[u8; 2]> {
    match encode_char(encoding, c)?.as_slice() {
        &[b1, b2] if b1 >= 0xa1 && b2 >= 0xa1 && b1 != 0xff && b2 != 0xff => {
            Some([b1 & 0x7f, b2 & 0x7f])
        }
        _ => None,
    }
}

/// GB 2312 in GL form, rows 0x21..=0x77.
pub(crate) fn gb2312_pair(c: char) -> Option<[u8; 2]> {
    encode_gl_pair(GBK, c).filter(|p| p[0] <= 0x77)
}

pub(crate) fn decode_gb2312_pair(b1: u8, b2: u8) -> Option<Cow<'static, str>> {
    if b1 > 0x77 {
        return None;
    }
    decode_gl_pair(GBK, b1, b2)
}

/// JIS X 0208 in GL form.
pub(crate) fn jis0208_pair(c: char) -> Option<[u8; 2]> {
    encode_gl_pair(EUC_JP, c)
}

pub(crate) fn decode_jis0208_pair(b1: u8, b2: u8) -> Option<Cow<'static, str>> {
    decode_gl_pair(EUC_JP, b1, b2)
}

/// KS X 1001 in GL form.
pub(crate) fn ksx1001_pair(c: char) -> Option<[u8; 2]> {
    encode_gl_pair(EUC_KR, c)
}

pub(crate) fn decode_ksx1001_pair(b1: u8, b2: u8) -> Option<Cow<'static, str>> {
    decode_gl_pair(EUC_KR, b1, b2)
}

pub(crate) const fn is_gl(b: u8) -> bool {
    matches!(b, 0x21..=0x7e)
}

#[test]
fn gl_pairs_round_trip() {
    assert_eq!(gb2312_pair('中'), Some([0x56, 0x50]));
    assert_eq!(decode_gb2312_pair(0x56, 0x50).as_deref(), Some("中"));
    assert_eq!(jis0208_pair('日'), Some([0x46, 0x7c]));
    assert_eq!(decode_jis0208_pair(0x46, 0x7c).as_deref(), Some("日"));
    assert_eq!(ksx1001_pair('한'), Some([0x47, 0x51]));
    assert_eq!(decode_ksx1001_pair(0x47, 0x51).as_deref(), Some("한"));

    // GBK extension characters have no GB 2312 pair.
    assert_eq!(gb2312_pair('丂'), None);
    assert_eq!(decode_gl_pair(GBK, 0x80, 0x21), None);
}

#[test]
fn sequences_decode_from_borrowed_input() {
    let owned = vec![b'A', 0xd6, 0xd0];
    let text = decode_sequence(GBK, &owned[1..]);
    assert_eq!(text.as_deref(), Some("中"));
    assert_eq!(decode_sequence(GBK, &owned[..1]).as_deref(), Some("A"));

    // An unmapped sequence is `None`, not replacement text.
    assert_eq!(decode_sequence(GBK, &[0xff]), None);
    assert_eq!(decode_sequence(GBK, &[]), None);
}
