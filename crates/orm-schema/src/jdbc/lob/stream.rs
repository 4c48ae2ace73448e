//! Re-readable streams backing LOB proxies.

use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::path::Path;

/// A readable stream that can be rewound to its start.
pub trait LobStream: Read + Send {
    /// Rewind to the beginning.
    ///
    /// # Errors
    ///
    /// When the stream cannot be rewound.
    fn reset(&mut self) -> io::Result<()>;
}

impl LobStream for Cursor<Vec<u8>> {
    fn reset(&mut self) -> io::Result<()> {
        self.set_position(0);
        Ok(())
    }
}

impl<S: LobStream + ?Sized> LobStream for Box<S> {
    fn reset(&mut self) -> io::Result<()> {
        (**self).reset()
    }
}

/// A file read from its start.
#[derive(Debug)]
pub struct FileLobStream {
    file: File,
}

impl FileLobStream {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self {
            file: File::open(path)?,
        })
    }
}

impl Read for FileLobStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl LobStream for FileLobStream {
    fn reset(&mut self) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(0)).map(|_| ())
    }
}

/// A stream that can be read once; resetting fails.
#[derive(Debug)]
pub struct SinglePassStream<R> {
    inner: R,
}

impl<R: Read + Send> SinglePassStream<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

impl<R: Read + Send> Read for SinglePassStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<R: Read + Send> LobStream for SinglePassStream<R> {
    fn reset(&mut self) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "mark/reset not supported",
        ))
    }
}

/// Initial buffer for [`extract_bytes`]; the requested length is only an upper bound.
const BUFFER_SIZE: usize = 4096;

/// Skip `start` bytes, then read at most `length` bytes.
pub(crate) fn extract_bytes(stream: &mut dyn Read, start: u64, length: usize) -> io::Result<Vec<u8>> {
    io::copy(&mut Read::take(&mut *stream, start), &mut io::sink())?;
    let mut bytes = Vec::with_capacity(length.min(BUFFER_SIZE));
    Read::take(&mut *stream, length as u64).read_to_end(&mut bytes)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_extract_bytes_caps_initial_buffer() {
        let mut stream = Cursor::new(b"abc".to_vec());
        let bytes = extract_bytes(&mut stream, 0, i32::MAX as usize).unwrap();
        assert_eq!(bytes, b"abc");
        assert!(bytes.capacity() <= BUFFER_SIZE);
    }

    #[test]
    fn test_cursor_reset() {
        let mut stream = Cursor::new(b"abc".to_vec());
        let mut first = String::new();
        stream.read_to_string(&mut first).unwrap();
        stream.reset().unwrap();
        let mut second = String::new();
        stream.read_to_string(&mut second).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_file_stream_reset() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"payload").unwrap();
        let mut stream = FileLobStream::open(file.path()).unwrap();
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).unwrap();
        stream.reset().unwrap();
        buf.clear();
        stream.read_to_end(&mut buf).unwrap();
        assert_eq!(buf, b"payload");
    }

    #[test]
    fn test_single_pass_stream_cannot_reset() {
        let mut stream = SinglePassStream::new(&b"x"[..]);
        assert_eq!(stream.reset().unwrap_err().kind(), io::ErrorKind::Unsupported);
    }

    #[test]
    fn test_extract_bytes_stops_at_end() {
        let mut stream = Cursor::new(b"0123456789".to_vec());
        assert_eq!(extract_bytes(&mut stream, 2, 3).unwrap(), b"234");
        let mut stream = Cursor::new(b"0123456789".to_vec());
        assert_eq!(extract_bytes(&mut stream, 8, 5).unwrap(), b"89");
    }
}
