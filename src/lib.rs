//! `mbcodec` encodes Unicode text to, and decodes it from, the legacy
//! multibyte encodings of Chinese, Japanese and Korean: GBK, GB 2312, HZ,
//! Big5, Big5-HKSCS, Shift_JIS, EUC-JP, ISO-2022-JP, EUC-KR, CP949 and
//! ISO-2022-KR.
//!
//! Codecs are found by name in a [`Registry`]. Each [`Codec`] can convert a
//! whole input at once, and hands out [`IncrementalEncoder`] and
//! [`IncrementalDecoder`] sessions for input that arrives in pieces, or
//! wraps byte streams as [`StreamReader`] and [`StreamWriter`].
//!
//! ```
//! use mbcodec::{Errors, Registry};
//!
//! let registry = Registry::cjk();
//! let gbk = registry.lookup("gbk").unwrap();
//! let (bytes, consumed) = gbk.encode("A中", &Errors::Strict).unwrap();
//! assert_eq!(bytes, b"A\xd6\xd0");
//! assert_eq!(consumed, 2);
//!
//! let (text, _) = gbk.decode(b"A\xd6\xd0\xff", &Errors::Replace).unwrap();
//! assert_eq!(text, "A中\u{FFFD}");
//! ```
//!
//! # Error handling
//!
//! What happens to input that can't be converted is decided by [`Errors`]:
//! `strict` fails with the position and reason, `ignore` drops the input,
//! `replace` substitutes `?` or U+FFFD, and a custom handler can substitute
//! anything and continue from any position in the input. Named handlers,
//! including custom ones, are kept in [`ErrorHandlers`].
//!
//! # Features
//!
//! The `serde` feature makes the saved states of incremental sessions
//! serializable.

pub mod buffer;
pub mod charset;
pub mod codec;
pub mod driver;
pub mod error;
pub mod handler;
pub mod incremental;
pub mod registry;
pub mod stream;
pub mod traits;
pub mod util;

pub use crate::charset::StateToken;
pub use crate::codec::{Codec, Flags, Kind, Status};
pub use crate::error::{CodecError, DecodeFailure, Direction, EncodeFailure, Reason};
pub use crate::handler::{ErrorHandlers, Errors, Failure, Replacement};
pub use crate::incremental::{
    DecoderSnapshot, EncoderSnapshot, IncrementalDecoder, IncrementalEncoder,
};
pub use crate::registry::Registry;
pub use crate::stream::{StreamReader, StreamWriter};
pub use crate::traits::ByteSource;

#[cfg(test)]
mod tests;
