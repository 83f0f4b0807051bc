use super::*;

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use proptest::prelude::*;

use crate::buffer::EncodeBuffer;
use crate::charset::{
    ByteWriter, CharWriter, Charset, CharsetDecoder, CharsetEncoder, Conversion, Converted,
};

/// A two-byte stateless encoding that knows ASCII and `中` (0xb1 0xe9).
///
/// Its encoder holds back a trailing non-ASCII character unless flushing,
/// and it reports zero-length errors for U+FFFE and 0xff so that the
/// internal error path can be reached.
#[derive(Debug)]
struct Toy;

impl Charset for Toy {
    fn encoder(&self) -> Box<dyn CharsetEncoder> {
        Box::new(ToyEncoder)
    }

    fn decoder(&self) -> Box<dyn CharsetDecoder> {
        Box::new(ToyDecoder)
    }
}

struct ToyEncoder;

impl CharsetEncoder for ToyEncoder {
    fn convert(&mut self, input: &[char], out: &mut ByteWriter<'_>, flush: bool) -> Converted {
        for (i, &c) in input.iter().enumerate() {
            if !flush && !c.is_ascii() && i + 1 == input.len() {
                return Converted::new(Conversion::Underflow, i);
            }
            let written = match c {
                '中' => out.write(&[0xb1, 0xe9]),
                '\u{fffe}' => return Converted::new(Conversion::Unmappable(0), i),
                c if c.is_ascii() => out.write(&[c as u8]),
                _ => return Converted::new(Conversion::Unmappable(1), i),
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

    fn restore(&mut self, _token: StateToken) -> Result<(), CodecError> {
        Ok(())
    }
}

struct ToyDecoder;

impl CharsetDecoder for ToyDecoder {
    fn convert(&mut self, input: &[u8], out: &mut CharWriter<'_>) -> Converted {
        let mut read = 0;
        while read < input.len() {
            let (c, len) = match input[read] {
                0xff => return Converted::new(Conversion::Malformed(0), read),
                b @ 0x00..=0x7f => (b as char, 1),
                _ if read + 1 == input.len() => return Converted::new(Conversion::Underflow, read),
                0xb1 if input[read + 1] == 0xe9 => ('中', 2),
                _ => return Converted::new(Conversion::Malformed(2), read),
            };
            if out.write_char(c).is_err() {
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

    fn restore(&mut self, _token: StateToken) -> Result<(), CodecError> {
        Ok(())
    }
}

fn toy() -> Arc<Codec> {
    Arc::new(Codec::new("toy", Arc::new(Toy), Kind::Stateless))
}

fn codec(name: &str) -> Arc<Codec> {
    Registry::cjk().lookup(name).unwrap()
}

#[test]
fn one_shot_two_byte_codec() {
    let toy = toy();
    assert_eq!(
        toy.encode("A中", &Errors::Strict).unwrap(),
        (b"A\xb1\xe9".to_vec(), 2)
    );
    assert_eq!(
        toy.decode(b"A\xb1\xe9", &Errors::Strict).unwrap(),
        ("A中".to_owned(), 3)
    );

    let gbk = codec("gbk");
    assert_eq!(
        gbk.encode("A中", &Errors::Strict).unwrap(),
        (b"A\xd6\xd0".to_vec(), 2)
    );
    assert_eq!(
        gbk.decode(b"A\xd6\xd0", &Errors::Strict).unwrap(),
        ("A中".to_owned(), 3)
    );
}

#[test]
fn incremental_decode_split_mid_sequence() {
    let mut dec = IncrementalDecoder::new(toy(), Errors::Strict);
    assert_eq!(dec.decode(b"A\xb1", false).unwrap(), "A");
    assert_eq!(dec.getstate().pending, b"\xb1");
    assert_eq!(dec.decode(b"\xe9", true).unwrap(), "中");
    assert!(dec.getstate().pending.is_empty());
}

#[test]
fn big5hkscs_combining_pairs_round_trip() {
    let hkscs = codec("big5hkscs");
    let bytes = b"\x88\x62\x88\x64\x88\xa3\x88\xa5";
    let (text, _) = hkscs.decode(bytes, &Errors::Strict).unwrap();
    assert_eq!(text, "\u{ca}\u{304}\u{ca}\u{30c}\u{ea}\u{304}\u{ea}\u{30c}");
    assert_eq!(hkscs.encode(&text, &Errors::Strict).unwrap(), (bytes.to_vec(), 8));

    // The letter is held back until the next call shows whether a mark follows.
    let mut enc = IncrementalEncoder::new(hkscs.clone(), Errors::Strict);
    assert_eq!(enc.encode("\u{ca}", false).unwrap(), b"");
    assert_eq!(enc.getstate().pending, "\u{ca}");
    assert_eq!(enc.encode("\u{304}", true).unwrap(), b"\x88\x62");
    assert!(enc.getstate().pending.is_empty());

    let mut enc = IncrementalEncoder::new(hkscs, Errors::Strict);
    assert_eq!(enc.encode("\u{ea}", false).unwrap(), b"");
    assert_eq!(enc.encode("b", false).unwrap(), b"\x88\xa7b");
    assert_eq!(enc.encode("\u{ca}", true).unwrap(), b"\x88\x66");
}

#[test]
fn encode_cjk() {
    table_test(
        |(name, text): (&str, &str)| codec(name).encode(text, &Errors::Strict).unwrap().0,
        &[
            TableTest {
                input: ("gbk", "A中"),
                want: b"A\xd6\xd0".to_vec(),
            },
            TableTest {
                input: ("gb2312", "中文"),
                want: b"\xd6\xd0\xce\xc4".to_vec(),
            },
            TableTest {
                input: ("hz", "a中b"),
                want: b"a~{VP~}b".to_vec(),
            },
            TableTest {
                input: ("hz", "~"),
                want: b"~~".to_vec(),
            },
            TableTest {
                input: ("big5", "中文"),
                want: b"\xa4\xa4\xa4\xe5".to_vec(),
            },
            TableTest {
                input: ("big5hkscs", "中"),
                want: b"\xa4\xa4".to_vec(),
            },
            TableTest {
                input: ("shift_jis", "日本"),
                want: b"\x93\xfa\x96\x7b".to_vec(),
            },
            TableTest {
                input: ("euc_jp", "日本"),
                want: b"\xc6\xfc\xcb\xdc".to_vec(),
            },
            TableTest {
                input: ("iso2022_jp", "日本"),
                want: b"\x1b$BF|K\\\x1b(B".to_vec(),
            },
            TableTest {
                input: ("euc_kr", "한국"),
                want: b"\xc7\xd1\xb1\xb9".to_vec(),
            },
            TableTest {
                input: ("cp949", "한"),
                want: b"\xc7\xd1".to_vec(),
            },
            TableTest {
                input: ("iso2022_kr", "한"),
                want: b"\x1b$)C\x0eGQ\x0f".to_vec(),
            },
        ],
    );
}

#[test]
fn decode_cjk() {
    table_test(
        |(name, bytes): (&str, &[u8])| codec(name).decode(bytes, &Errors::Strict).unwrap().0,
        &[
            TableTest {
                input: ("gbk", b"A\xd6\xd0\x80".as_slice()),
                want: "A中€".to_owned(),
            },
            TableTest {
                input: ("hz", b"a~{VP~}~~b".as_slice()),
                want: "a中~b".to_owned(),
            },
            TableTest {
                input: ("shift_jis", b"\x93\xfa\xb1".as_slice()),
                want: "日ｱ".to_owned(),
            },
            TableTest {
                input: ("iso2022_jp", b"\x1b$BF|\x1b(J\\\x1b(B".as_slice()),
                want: "日¥".to_owned(),
            },
            TableTest {
                input: ("iso2022_kr", b"\x1b$)C\x0eGQ\x0fa".as_slice()),
                want: "한a".to_owned(),
            },
        ],
    );
}

#[test]
fn strict_is_default_and_reports_position() {
    assert!(matches!(Errors::default(), Errors::Strict));

    let err = codec("gbk")
        .decode(b"ab\xff", &Errors::default())
        .unwrap_err();
    let failure = err.as_decode_failure().unwrap();
    assert_eq!((failure.start(), failure.end()), (2, 3));
    assert_eq!(failure.reason(), Reason::IllegalSequence);
    assert_eq!(failure.object(), b"ab\xff");
    assert_eq!(
        err.to_string(),
        "'gbk' codec can't decode byte 0xff in position 2: illegal multibyte sequence"
    );

    let err = codec("gbk").decode(b"A\x81", &Errors::Strict).unwrap_err();
    assert_eq!(
        err.to_string(),
        "'gbk' codec can't decode byte 0x81 in position 1: incomplete multibyte sequence"
    );

    let err = codec("gb2312").encode("ab€c", &Errors::Strict).unwrap_err();
    let failure = err.as_encode_failure().unwrap();
    assert_eq!((failure.start(), failure.end()), (2, 3));
    assert_eq!(failure.unencodable(), &['€']);
    assert_eq!(
        err.to_string(),
        "'gb2312' codec can't encode character '\\u20ac' in position 2: illegal multibyte sequence"
    );
}

#[test]
fn ignore_drops_the_malformed_unit() {
    let gbk = codec("gbk");
    let (ignored, _) = gbk.decode(b"A\xffB\xd6\xd0", &Errors::Ignore).unwrap();
    let (removed, _) = gbk.decode(b"AB\xd6\xd0", &Errors::Strict).unwrap();
    assert_eq!(ignored, removed);

    let (bytes, _) = codec("gb2312").encode("a€b", &Errors::Ignore).unwrap();
    assert_eq!(bytes, b"ab");
}

#[test]
fn replace_substitutes_per_error() {
    let (text, _) = codec("gbk")
        .decode(b"\xff\xd6\xd0\xff", &Errors::Replace)
        .unwrap();
    assert_eq!(text, "\u{FFFD}中\u{FFFD}");

    let (bytes, _) = codec("gb2312").encode("a丂€b", &Errors::Replace).unwrap();
    assert_eq!(bytes, b"a??b");

    // The question mark goes through the shift state like any other
    // character.
    let (bytes, _) = codec("hz").encode("中€", &Errors::Replace).unwrap();
    assert_eq!(bytes, b"~{VP~}?");
}

#[test]
fn handler_repositions_the_cursor() {
    let skip_one = Errors::custom("skip-one", |f| {
        Ok((Replacement::Text("X".into()), f.start() as isize + 1))
    });
    let (text, _) = toy().decode(b"\xb2\xb3A", &skip_one).unwrap();
    assert_eq!(text, "XXA");

    // The incomplete tail is handed over as well.
    let (text, _) = toy().decode(b"A\xb2\xb3", &skip_one).unwrap();
    assert_eq!(text, "AXX");
}

#[test]
fn handler_text_is_encoded_with_the_session() {
    let marker = Errors::custom("marker", |f| {
        Ok((Replacement::Text("中".into()), f.end() as isize))
    });
    let (bytes, _) = codec("hz").encode("a€b", &marker).unwrap();
    assert_eq!(bytes, b"a~{VP~}b");

    let raw = Errors::custom("raw", |f| {
        Ok((Replacement::Bytes(vec![0x80]), f.end() as isize))
    });
    let (bytes, _) = codec("gb2312").encode("a€b", &raw).unwrap();
    assert_eq!(bytes, b"a\x80b");

    // A replacement the codec can't encode fails strictly.
    let euro = Errors::custom("euro", |f| {
        Ok((Replacement::Text("€".into()), f.end() as isize))
    });
    let err = codec("gb2312").encode("a丂", &euro).unwrap_err();
    assert_eq!(err.as_encode_failure().unwrap().object(), &['€']);
}

#[test]
fn builtin_callback_handlers() {
    let handlers = ErrorHandlers::default();
    let backslash = handlers.lookup("backslashreplace").unwrap();
    let xml = handlers.lookup("xmlcharrefreplace").unwrap();

    let (bytes, _) = codec("gb2312").encode("a€😀", &backslash).unwrap();
    assert_eq!(bytes, b"a\\u20ac\\U0001f600");
    let (bytes, _) = codec("gb2312").encode("a€", &xml).unwrap();
    assert_eq!(bytes, b"a&#8364;");

    let (text, _) = codec("gbk").decode(b"a\xff", &backslash).unwrap();
    assert_eq!(text, "a\\xff");
    assert!(matches!(
        codec("gbk").decode(b"a\xff", &xml),
        Err(CodecError::UnsupportedHandler {
            direction: Direction::Decode,
            ..
        })
    ));
}

#[test]
fn negative_positions() {
    // Counted from the end of the input when encoding.
    let from_end = Errors::custom("from-end", |_| Ok((Replacement::Text("[x]".into()), -1)));
    let (bytes, _) = codec("gb2312").encode("a€b", &from_end).unwrap();
    assert_eq!(bytes, b"a[x]b");

    // Counted from the failure position when decoding.
    let calls = AtomicUsize::new(0);
    let back_once = Errors::custom("back-once", move |f| {
        if calls.fetch_add(1, Ordering::Relaxed) == 0 {
            Ok((Replacement::Text("<".into()), -1))
        } else {
            Ok((Replacement::Text(">".into()), f.end() as isize))
        }
    });
    let (text, _) = codec("gbk").decode(b"a\xffb", &back_once).unwrap();
    assert_eq!(text, "a<a>b");
}

#[test]
fn bad_handler_results() {
    let bytes = Errors::custom("bytes", |f| {
        Ok((Replacement::Bytes(b"?".to_vec()), f.end() as isize))
    });
    assert!(matches!(
        codec("gbk").decode(b"\xff", &bytes),
        Err(CodecError::BadHandlerResult(Direction::Decode))
    ));

    let far = Errors::custom("far", |_| Ok((Replacement::Text(String::new()), 10)));
    assert!(matches!(
        codec("gbk").decode(b"\xff", &far),
        Err(CodecError::PositionOutOfBounds(10))
    ));
    assert!(matches!(
        codec("gb2312").encode("€", &far),
        Err(CodecError::PositionOutOfBounds(10))
    ));

    let before = Errors::custom("before", |_| Ok((Replacement::Text(String::new()), -5)));
    assert!(matches!(
        codec("gbk").decode(b"a\xff", &before),
        Err(CodecError::PositionOutOfBounds(-4))
    ));

    let failing = Errors::custom("failing", |_| Err(CodecError::Handler("nope".into())));
    let err = codec("gbk").decode(b"\xff", &failing).unwrap_err();
    assert_eq!(err.to_string(), "nope");
}

#[test]
fn internal_errors_bypass_handlers() {
    assert!(matches!(
        toy().decode(b"a\xff", &Errors::Ignore),
        Err(CodecError::Internal)
    ));
    assert!(matches!(
        toy().encode("a\u{fffe}", &Errors::Replace),
        Err(CodecError::Internal)
    ));
}

#[test]
fn pending_overflow_is_fatal() {
    let rewind = Errors::custom("rewind", |f| match f.reason() {
        Reason::IncompleteSequence => Ok((Replacement::Text(String::new()), 0)),
        Reason::IllegalSequence => Ok((Replacement::Text("?".into()), f.end() as isize)),
    });
    let mut dec = IncrementalDecoder::new(codec("gbk"), rewind);
    assert_eq!(dec.decode(b"\xd6", false).unwrap(), "");

    assert!(matches!(
        dec.decode(b"0123456789\x81", true),
        Err(CodecError::PendingOverflow)
    ));
    // The failed call leaves the session as it was.
    assert_eq!(dec.getstate().pending, b"\xd6");
    assert_eq!(dec.decode(b"\xd0", true).unwrap(), "中");
}

#[test]
fn failed_call_restores_pending() {
    let mut dec = IncrementalDecoder::new(codec("gbk"), Errors::Strict);
    assert_eq!(dec.decode(b"a\xd6", false).unwrap(), "a");
    assert!(dec.decode(b"\xd0\xff", false).is_err());
    assert_eq!(dec.getstate().pending, b"\xd6");

    let mut enc = IncrementalEncoder::new(toy(), Errors::Strict);
    assert_eq!(enc.encode("A中", false).unwrap(), b"A");
    assert_eq!(enc.getstate().pending, "中");
    assert!(enc.encode("é", true).is_err());
    assert_eq!(enc.getstate().pending, "中");
    assert_eq!(enc.encode("", true).unwrap(), b"\xb1\xe9");
    assert!(enc.getstate().pending.is_empty());
}

#[test]
fn reset_on_fresh_session_is_noop() {
    let mut fresh = IncrementalEncoder::new(codec("iso2022_jp"), Errors::Strict);
    let mut reset = IncrementalEncoder::new(codec("iso2022_jp"), Errors::Strict);
    reset.reset();
    assert_eq!(
        reset.encode("a日", true).unwrap(),
        fresh.encode("a日", true).unwrap()
    );

    let mut dec = IncrementalDecoder::new(codec("hz"), Errors::Strict);
    dec.reset();
    assert_eq!(dec.decode(b"~{VP~}", true).unwrap(), "中");
}

#[test]
fn reset_drops_shift_state() {
    let mut enc = IncrementalEncoder::new(codec("iso2022_jp"), Errors::Strict);
    assert_eq!(enc.encode("日", false).unwrap(), b"\x1b$BF|");
    enc.reset();
    assert_eq!(enc.encode("a", true).unwrap(), b"a");

    let mut dec = IncrementalDecoder::new(codec("hz"), Errors::Strict);
    assert_eq!(dec.decode(b"~{VP", false).unwrap(), "中");
    dec.reset();
    assert_eq!(dec.decode(b"VP", true).unwrap(), "VP");
}

#[test]
fn final_encode_returns_to_initial_state() {
    let mut enc = IncrementalEncoder::new(codec("iso2022_kr"), Errors::Strict);
    assert_eq!(enc.encode("한", false).unwrap(), b"\x1b$)C\x0eGQ");
    assert_eq!(enc.encode("", true).unwrap(), b"\x0f");
    assert_eq!(enc.encode("", true).unwrap(), b"");
}

#[test]
fn snapshots_round_trip() {
    let mut enc = IncrementalEncoder::new(codec("iso2022_jp"), Errors::Strict);
    enc.encode("日", false).unwrap();
    let snapshot = enc.getstate();
    assert_ne!(snapshot.state, StateToken::INITIAL);

    let mut other = IncrementalEncoder::new(codec("iso2022_jp"), Errors::Strict);
    other.setstate(&snapshot).unwrap();
    assert_eq!(other.encode("本", true).unwrap(), b"K\\\x1b(B");

    let mut dec = IncrementalDecoder::new(codec("gbk"), Errors::Strict);
    dec.decode(b"A\xd6", false).unwrap();
    let snapshot = dec.getstate();
    let mut other = IncrementalDecoder::new(codec("gbk"), Errors::Strict);
    other.setstate(&snapshot).unwrap();
    assert_eq!(other.decode(b"\xd0", true).unwrap(), "中");
}

#[test]
fn oversized_snapshots_are_rejected() {
    let mut dec = IncrementalDecoder::new(codec("gbk"), Errors::Strict);
    let snapshot = DecoderSnapshot {
        pending: vec![0x81; incremental::MAX_DECODE_PENDING + 1],
        state: StateToken::INITIAL,
    };
    assert!(matches!(
        dec.setstate(&snapshot),
        Err(CodecError::PendingTooLarge)
    ));

    let mut enc = IncrementalEncoder::new(codec("gbk"), Errors::Strict);
    let snapshot = EncoderSnapshot {
        pending: "abc".into(),
        state: StateToken::INITIAL,
    };
    assert!(matches!(
        enc.setstate(&snapshot),
        Err(CodecError::PendingTooLarge)
    ));

    let snapshot = EncoderSnapshot {
        pending: String::new(),
        state: StateToken([1, 0, 0, 0, 0, 0, 0, 0]),
    };
    assert!(matches!(
        enc.setstate(&snapshot),
        Err(CodecError::InvalidState)
    ));
}

#[test]
fn outputs_grow_as_needed() {
    let hz = codec("hz");
    let text = "a中".repeat(100);
    let (bytes, consumed) = hz.encode(&text, &Errors::Strict).unwrap();
    assert_eq!(consumed, 200);
    assert_eq!(bytes.len(), 100 * 7);
    assert_eq!(hz.decode(&bytes, &Errors::Strict).unwrap().0, text);

    let long = Errors::custom("long", |f| {
        Ok((Replacement::Text("<invalid>".into()), f.end() as isize))
    });
    let (text, _) = codec("gbk").decode(b"\xff\xff", &long).unwrap();
    assert_eq!(text, "<invalid><invalid>");
}

#[test]
fn codec_steps() {
    let hz = codec("hz");
    let input: Vec<char> = "中".chars().collect();
    let mut state = hz.enc_init();
    let mut buf = EncodeBuffer::new(&input).unwrap();

    assert_eq!(hz.encode_step(&mut state, &mut buf, Flags::FLUSH), Status::Success);
    assert_eq!(buf.output(), b"~{VP");
    assert!(buf.is_full());
    assert_eq!(state.last_result(), Some(Conversion::Underflow));

    assert_eq!(hz.enc_reset(&mut state, &mut buf), Status::Success);
    assert_eq!(buf.into_bytes(), b"~{VP~}");
}

#[test]
fn stream_reader_chunks() {
    let mut reader = StreamReader::new(
        Cursor::new(b"A\xd6\xd0B".to_vec()),
        codec("gbk"),
        Errors::Strict,
    );
    assert_eq!(reader.read(Some(2)).unwrap(), "A");
    assert_eq!(reader.read(Some(1)).unwrap(), "中");
    assert_eq!(reader.read(Some(0)).unwrap(), "");
    assert_eq!(reader.read(None).unwrap(), "B");
    assert_eq!(reader.read(None).unwrap(), "");
}

#[test]
fn stream_reader_retries_one_byte() {
    let mut reader = StreamReader::new(
        Cursor::new(b"\xd6\xd0x".to_vec()),
        codec("gbk"),
        Errors::Strict,
    );
    assert_eq!(reader.read(Some(1)).unwrap(), "中");
    assert_eq!(reader.get_ref().position(), 2);
}

#[test]
fn stream_reader_end_of_stream() {
    let mut reader = StreamReader::new(Cursor::new(b"A\xd6".to_vec()), codec("gbk"), Errors::Strict);
    let err = reader.read(None).unwrap_err();
    assert_eq!(
        err.as_decode_failure().unwrap().reason(),
        Reason::IncompleteSequence
    );

    let mut reader = StreamReader::new(Cursor::new(b"A\xd6".to_vec()), codec("gbk"), Errors::Replace);
    assert_eq!(reader.read(None).unwrap(), "A\u{FFFD}");
}

#[test]
fn stream_reader_lines() {
    let mut reader = StreamReader::new(
        Cursor::new(b"a\xd6\xd0\nb\r\nc".to_vec()),
        codec("gbk"),
        Errors::Strict,
    );
    assert_eq!(reader.readline(None).unwrap(), "a中\n");
    assert_eq!(reader.readlines(None).unwrap(), ["b\r\n", "c"]);

    assert_eq!(reader.readline(None).unwrap(), "");
    reader.reset();
    assert_eq!(reader.into_inner().position(), 8);
}

#[test]
fn stream_writer_shift_states() {
    let mut writer = StreamWriter::new(Vec::new(), codec("iso2022_jp"), Errors::Strict);
    writer.write("日").unwrap();
    writer.write("a").unwrap();
    writer.reset().unwrap();
    assert_eq!(writer.get_ref(), b"\x1b$BF|\x1b(Ba");

    let mut writer = StreamWriter::new(Vec::new(), codec("iso2022_jp"), Errors::Strict);
    writer.writelines(["日", "本"]).unwrap();
    writer.reset().unwrap();
    assert_eq!(writer.into_inner(), b"\x1b$BF|K\\\x1b(B");
}

#[test]
fn stream_writer_reset_drops_failed_pending() {
    let mut writer = StreamWriter::new(Vec::new(), toy(), Errors::Strict);
    writer.write("aé").unwrap();
    assert_eq!(writer.get_ref(), b"a");

    assert!(writer.reset().is_err());
    writer.reset().unwrap();
    writer.write("b").unwrap();
    assert_eq!(writer.get_ref(), b"ab");
}

fn split_at(data: &[u8], cuts: &[usize]) -> Vec<Vec<u8>> {
    let mut cuts: Vec<usize> = cuts.iter().map(|c| c % (data.len() + 1)).collect();
    cuts.sort_unstable();
    let mut chunks = Vec::new();
    let mut start = 0;
    for cut in cuts {
        chunks.push(data[start..cut].to_vec());
        start = cut;
    }
    chunks.push(data[start..].to_vec());
    chunks
}

proptest! {
    #[test]
    fn chunked_decode_matches_one_shot(
        name in prop::sample::select(vec![
            "gbk", "big5", "shift_jis", "euc_jp", "euc_kr", "hz", "iso2022_jp", "iso2022_kr",
        ]),
        data in prop::collection::vec(any::<u8>(), 0..48),
        cuts in prop::collection::vec(any::<usize>(), 0..6),
    ) {
        let codec = codec(name);
        let (whole, _) = codec.decode(&data, &Errors::Replace).unwrap();

        let mut dec = IncrementalDecoder::new(codec, Errors::Replace);
        let mut chunked = String::new();
        for chunk in split_at(&data, &cuts) {
            chunked.push_str(&dec.decode(&chunk, false).unwrap());
        }
        chunked.push_str(&dec.decode(b"", true).unwrap());
        prop_assert_eq!(whole, chunked);
    }

    #[test]
    fn representable_text_round_trips(
        name in prop::sample::select(vec!["gbk", "hz", "iso2022_jp"]),
        chars in prop::collection::vec(
            prop::sample::select(vec!['a', 'Z', '0', ' ', '~', '\n', '中', '日', '本', '字']),
            0..32,
        ),
    ) {
        let text: String = chars.into_iter().collect();
        let codec = codec(name);
        let (bytes, consumed) = codec.encode(&text, &Errors::Strict).unwrap();
        prop_assert_eq!(consumed, text.chars().count());
        let (decoded, len) = codec.decode(&bytes, &Errors::Strict).unwrap();
        prop_assert_eq!(len, bytes.len());
        prop_assert_eq!(decoded, text);
    }

    #[test]
    fn chunked_encode_matches_one_shot(
        name in prop::sample::select(vec!["hz", "iso2022_jp", "iso2022_kr", "big5hkscs"]),
        pieces in prop::collection::vec(
            prop::sample::select(vec![
                "a", " ", "日", "한", "中", "\u{ca}", "\u{ea}", "\u{ca}\u{304}", "\u{ea}\u{30c}",
            ]),
            0..24,
        ),
        cuts in prop::collection::vec(any::<usize>(), 0..4),
    ) {
        let codec = codec(name);
        let text: String = pieces
            .into_iter()
            .filter(|piece| codec.encode(piece, &Errors::Strict).is_ok())
            .collect();
        let (whole, _) = codec.encode(&text, &Errors::Strict).unwrap();

        let chars: Vec<char> = text.chars().collect();
        let mut enc = IncrementalEncoder::new(codec, Errors::Strict);
        let mut chunked = Vec::new();
        let mut start = 0;
        let mut cuts: Vec<usize> = cuts.iter().map(|c| c % (chars.len() + 1)).collect();
        cuts.sort_unstable();
        for cut in cuts {
            let piece: String = chars[start..cut].iter().collect();
            chunked.extend(enc.encode(&piece, false).unwrap());
            start = cut;
        }
        let rest: String = chars[start..].iter().collect();
        chunked.extend(enc.encode(&rest, true).unwrap());
        prop_assert_eq!(whole, chunked);
    }
}

struct TableTest<In, Out> {
    pub input: In,
    pub want: Out,
}

fn table_test<In, Out>(run: impl Fn(In) -> Out, tests: &[TableTest<In, Out>])
where
    In: core::fmt::Debug + Clone,
    Out: core::fmt::Debug + std::cmp::PartialEq,
{
    let mut fails = 0;
    for test in tests {
        let got = run(test.input.clone());
        if got != test.want {
            eprintln!("- test failure");
            eprintln!("    input: {:02x?}", test.input);
            eprintln!("    got:   {:02x?}", got);
            eprintln!("    want:  {:02x?}", test.want);
            fails += 1;
        }
    }
    if fails != 0 {
        panic!("{fails} tests failed");
    }
}
