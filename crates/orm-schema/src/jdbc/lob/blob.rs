//! BLOB access and the non-contextual [`BlobProxy`].

use std::fmt;
use std::io::{self, Cursor, Read};

use super::stream::{extract_bytes, LobStream};
use super::{
    check_length, check_start, not_manipulable, read_failed, reset_failed, start_exceeds_length,
};
use crate::error::Result;

/// Binary large object. Positions are 1-based, as in JDBC.
pub trait Blob: fmt::Debug + Send {
    /// Number of bytes.
    fn length(&self) -> Result<u64>;

    /// Up to `length` bytes starting at `start`.
    fn get_bytes(&mut self, start: i64, length: i32) -> Result<Vec<u8>>;

    fn get_binary_stream(&mut self) -> Result<Box<dyn Read + '_>>;

    /// A stream over `length` bytes starting at `start`.
    fn get_binary_stream_range(&mut self, start: i64, length: i64) -> Result<Box<dyn Read + '_>>;

    fn set_bytes(&mut self, position: i64, bytes: &[u8]) -> Result<usize>;

    fn truncate(&mut self, length: i64) -> Result<()>;

    fn position(&mut self, pattern: &[u8], start: i64) -> Result<i64>;

    /// Release the backing data.
    fn free(&mut self) -> Result<()>;
}

/// A BLOB built without a connection, backed by bytes or a stream.
///
/// Only reads are supported. The backing stream is reset before every read
/// but the first.
pub struct BlobProxy {
    stream: Box<dyn LobStream>,
    length: u64,
    needs_reset: bool,
}

impl BlobProxy {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let length = bytes.len() as u64;
        Self::from_stream(Cursor::new(bytes), length)
    }

    pub fn from_stream(stream: impl LobStream + 'static, length: u64) -> Self {
        Self {
            stream: Box::new(stream),
            length,
            needs_reset: false,
        }
    }

    fn stream(&mut self) -> Result<&mut dyn LobStream> {
        if self.needs_reset {
            self.stream.reset().map_err(reset_failed)?;
        }
        self.needs_reset = true;
        Ok(self.stream.as_mut())
    }
}

impl Blob for BlobProxy {
    fn length(&self) -> Result<u64> {
        Ok(self.length)
    }

    fn get_bytes(&mut self, start: i64, length: i32) -> Result<Vec<u8>> {
        let start = check_start(start)?;
        let length = check_length(i64::from(length))?;
        let stream = self.stream()?;
        extract_bytes(stream, start - 1, length as usize).map_err(read_failed)
    }

    fn get_binary_stream(&mut self) -> Result<Box<dyn Read + '_>> {
        Ok(Box::new(self.stream()?))
    }

    fn get_binary_stream_range(&mut self, start: i64, length: i64) -> Result<Box<dyn Read + '_>> {
        let start = check_start(start)?;
        if start > self.length {
            return Err(start_exceeds_length(start, self.length, "BLOB"));
        }
        let length = check_length(length)?;
        let stream = self.stream()?;
        io::copy(&mut Read::take(&mut *stream, start - 1), &mut io::sink()).map_err(read_failed)?;
        Ok(Box::new(Read::take(stream, length)))
    }

    fn set_bytes(&mut self, _position: i64, _bytes: &[u8]) -> Result<usize> {
        Err(not_manipulable("Blob"))
    }

    fn truncate(&mut self, _length: i64) -> Result<()> {
        Err(not_manipulable("Blob"))
    }

    fn position(&mut self, _pattern: &[u8], _start: i64) -> Result<i64> {
        Err(not_manipulable("Blob"))
    }

    fn free(&mut self) -> Result<()> {
        self.stream = Box::new(Cursor::new(Vec::new()));
        self.length = 0;
        self.needs_reset = false;
        Ok(())
    }
}

impl fmt::Debug for BlobProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlobProxy")
            .field("length", &self.length)
            .field("needs_reset", &self.needs_reset)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OrmError;
    use crate::jdbc::lob::stream::SinglePassStream;
    use proptest::prelude::*;

    fn read_all(mut reader: Box<dyn Read + '_>) -> Vec<u8> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_bytes_and_streams() {
        let mut blob = BlobProxy::from_bytes(b"0123456789".to_vec());
        assert_eq!(blob.length().unwrap(), 10);
        assert_eq!(blob.get_bytes(1, 4).unwrap(), b"0123");
        assert_eq!(read_all(blob.get_binary_stream().unwrap()), b"0123456789");
        assert_eq!(read_all(blob.get_binary_stream_range(3, 2).unwrap()), b"23");
    }

    #[test]
    fn test_range_validation() {
        let mut blob = BlobProxy::from_bytes(b"abc".to_vec());
        let err = blob.get_bytes(0, 1).unwrap_err();
        assert_eq!(err.to_string(), "Start position 1-based; must be 1 or more.");
        let err = blob.get_bytes(1, -1).unwrap_err();
        assert_eq!(err.to_string(), "Length must be great-than-or-equal to zero.");
        let err = blob.get_binary_stream_range(4, 1).err().unwrap();
        assert_eq!(
            err.to_string(),
            "Start position [4] cannot exceed overall BLOB length [3]"
        );
        assert!(matches!(
            blob.get_binary_stream_range(0, 1).err().unwrap(),
            OrmError::Sql(_)
        ));
        assert!(matches!(
            blob.get_binary_stream_range(1, -2).err().unwrap(),
            OrmError::Sql(_)
        ));
    }

    #[test]
    fn test_get_bytes_does_not_check_upper_bound() {
        let mut blob = BlobProxy::from_bytes(b"abc".to_vec());
        assert!(blob.get_bytes(5, 2).unwrap().is_empty());
    }

    #[test]
    fn test_get_bytes_with_huge_length_reads_what_exists() {
        let mut blob = BlobProxy::from_bytes(b"abc".to_vec());
        let bytes = blob.get_bytes(1, i32::MAX).unwrap();
        assert_eq!(bytes, b"abc");
        assert!(bytes.capacity() < 1 << 16);
    }

    #[test]
    fn test_single_pass_stream_reads_once() {
        let mut blob = BlobProxy::from_stream(SinglePassStream::new(&b"once"[..]), 4);
        assert_eq!(blob.get_bytes(1, 4).unwrap(), b"once");
        let err = blob.get_binary_stream().err().unwrap();
        assert_eq!(err.to_string(), "could not reset reader");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_resettable_stream_reads_repeatedly() {
        let mut blob = BlobProxy::from_stream(Cursor::new(b"again".to_vec()), 5);
        assert_eq!(blob.get_bytes(1, 5).unwrap(), b"again");
        assert_eq!(blob.get_bytes(1, 5).unwrap(), b"again");
    }

    #[test]
    fn test_mutators_are_unsupported() {
        let mut blob = BlobProxy::from_bytes(Vec::new());
        let err = blob.set_bytes(1, b"x").unwrap_err();
        assert!(matches!(err, OrmError::UnsupportedOperation(_)));
        assert!(err.to_string().contains("Blob may not be manipulated from creating session"));
        assert!(blob.truncate(0).is_err());
        assert!(blob.position(b"x", 1).is_err());
    }

    #[test]
    fn test_free_releases_data() {
        let mut blob = BlobProxy::from_bytes(b"abc".to_vec());
        blob.free().unwrap();
        assert_eq!(blob.length().unwrap(), 0);
    }

    proptest! {
        #[test]
        fn prop_range_returns_requested_or_remaining(
            data in proptest::collection::vec(any::<u8>(), 1..64),
            start_offset in 0usize..64,
            length in 0i64..80,
        ) {
            let start = (start_offset % data.len()) as i64 + 1;
            let mut blob = BlobProxy::from_bytes(data.clone());
            let remaining = data.len() as i64 - start + 1;
            let expected = length.min(remaining) as usize;
            let read = read_all(blob.get_binary_stream_range(start, length).unwrap());
            prop_assert_eq!(read.len(), expected);
            let bytes = blob.get_bytes(start, length as i32).unwrap();
            prop_assert_eq!(bytes.len(), expected);
        }

        #[test]
        fn prop_start_below_one_always_fails(start in i64::MIN..1, length in 0i32..10) {
            let mut blob = BlobProxy::from_bytes(b"data".to_vec());
            prop_assert!(blob.get_bytes(start, length).is_err());
            prop_assert!(blob.get_binary_stream_range(start, i64::from(length)).is_err());
        }
    }
}
