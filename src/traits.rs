use std::io::{self, BufRead, Read};

/// A source of encoded bytes for a [`StreamReader`].
///
/// Any [`BufRead`] is a byte source. An empty result means the end of the
/// stream has been reached.
///
/// [`StreamReader`]: crate::stream::StreamReader
pub trait ByteSource {
    /// Reads up to `size` bytes, or everything up to the end of the stream
    /// if `size` is `None`.
    fn read_bytes(&mut self, size: Option<usize>) -> io::Result<Vec<u8>>;

    /// Reads up to and including the next `\n`, stopping early after `size`
    /// bytes.
    fn read_line_bytes(&mut self, size: Option<usize>) -> io::Result<Vec<u8>>;
}

impl<R: BufRead> ByteSource for R {
    fn read_bytes(&mut self, size: Option<usize>) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        match size {
            None => self.read_to_end(&mut buf)?,
            Some(n) => self.by_ref().take(n as u64).read_to_end(&mut buf)?,
        };
        Ok(buf)
    }

    fn read_line_bytes(&mut self, size: Option<usize>) -> io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        match size {
            None => self.read_until(b'\n', &mut buf)?,
            Some(n) => self.by_ref().take(n as u64).read_until(b'\n', &mut buf)?,
        };
        Ok(buf)
    }
}

#[test]
fn buf_read_sources() {
    let mut src = io::Cursor::new(b"ab\ncd\nef".to_vec());
    assert_eq!(src.read_line_bytes(None).unwrap(), b"ab\n");
    assert_eq!(src.read_line_bytes(Some(1)).unwrap(), b"c");
    assert_eq!(src.read_bytes(Some(3)).unwrap(), b"d\ne");
    assert_eq!(src.read_bytes(None).unwrap(), b"f");
    assert_eq!(src.read_bytes(None).unwrap(), b"");
}
