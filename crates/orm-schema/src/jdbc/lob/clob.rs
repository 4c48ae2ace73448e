//! CLOB/NCLOB access and the non-contextual proxies.
//!
//! Character streams yield UTF-8. Lengths and positions count characters.

use std::fmt;
use std::io::{Cursor, Read};

use super::stream::LobStream;
use super::{
    check_length, check_start, not_manipulable, read_failed, reset_failed, start_exceeds_length,
};
use crate::error::Result;

/// Character large object. Positions are 1-based, as in JDBC.
pub trait Clob: fmt::Debug + Send {
    /// Number of characters.
    fn length(&self) -> Result<u64>;

    fn get_sub_string(&mut self, start: i64, length: i32) -> Result<String>;

    fn get_character_stream(&mut self) -> Result<Box<dyn Read + '_>>;

    fn get_character_stream_range(&mut self, start: i64, length: i64) -> Result<Box<dyn Read + '_>>;

    fn get_ascii_stream(&mut self) -> Result<Box<dyn Read + '_>>;

    fn set_string(&mut self, position: i64, value: &str) -> Result<usize>;

    fn truncate(&mut self, length: i64) -> Result<()>;

    fn position(&mut self, pattern: &str, start: i64) -> Result<i64>;

    fn free(&mut self) -> Result<()>;
}

/// National-character CLOB.
pub trait NClob: Clob {}

/// A CLOB built without a connection, backed by a string or a stream.
pub struct ClobProxy {
    stream: Box<dyn LobStream>,
    length: u64,
    needs_reset: bool,
    kind: &'static str,
}

impl ClobProxy {
    pub fn from_string(value: impl Into<String>) -> Self {
        let value = value.into();
        let length = value.chars().count() as u64;
        Self::from_stream(Cursor::new(value.into_bytes()), length)
    }

    /// `length` counts characters of the UTF-8 stream.
    pub fn from_stream(stream: impl LobStream + 'static, length: u64) -> Self {
        Self {
            stream: Box::new(stream),
            length,
            needs_reset: false,
            kind: "Clob",
        }
    }

    fn stream(&mut self) -> Result<&mut dyn LobStream> {
        if self.needs_reset {
            self.stream.reset().map_err(reset_failed)?;
        }
        self.needs_reset = true;
        Ok(self.stream.as_mut())
    }

    fn read_range(&mut self, start: u64, length: u64) -> Result<String> {
        let mut content = String::new();
        self.stream()?
            .read_to_string(&mut content)
            .map_err(read_failed)?;
        Ok(content
            .chars()
            .skip((start - 1) as usize)
            .take(length as usize)
            .collect())
    }
}

impl Clob for ClobProxy {
    fn length(&self) -> Result<u64> {
        Ok(self.length)
    }

    fn get_sub_string(&mut self, start: i64, length: i32) -> Result<String> {
        let start = check_start(start)?;
        // a substring may start one past the end and come back empty
        if start > self.length + 1 {
            return Err(start_exceeds_length(start, self.length, "CLOB"));
        }
        let length = check_length(i64::from(length))?;
        self.read_range(start, length)
    }

    fn get_character_stream(&mut self) -> Result<Box<dyn Read + '_>> {
        Ok(Box::new(self.stream()?))
    }

    fn get_character_stream_range(&mut self, start: i64, length: i64) -> Result<Box<dyn Read + '_>> {
        let start = check_start(start)?;
        if start > self.length {
            return Err(start_exceeds_length(start, self.length, "CLOB"));
        }
        let length = check_length(length)?;
        let range = self.read_range(start, length)?;
        Ok(Box::new(Cursor::new(range.into_bytes())))
    }

    fn get_ascii_stream(&mut self) -> Result<Box<dyn Read + '_>> {
        self.get_character_stream()
    }

    fn set_string(&mut self, _position: i64, _value: &str) -> Result<usize> {
        Err(not_manipulable(self.kind))
    }

    fn truncate(&mut self, _length: i64) -> Result<()> {
        Err(not_manipulable(self.kind))
    }

    fn position(&mut self, _pattern: &str, _start: i64) -> Result<i64> {
        Err(not_manipulable(self.kind))
    }

    fn free(&mut self) -> Result<()> {
        self.stream = Box::new(Cursor::new(Vec::new()));
        self.length = 0;
        self.needs_reset = false;
        Ok(())
    }
}

impl fmt::Debug for ClobProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClobProxy")
            .field("kind", &self.kind)
            .field("length", &self.length)
            .field("needs_reset", &self.needs_reset)
            .finish()
    }
}

/// An NCLOB built without a connection.
#[derive(Debug)]
pub struct NClobProxy(ClobProxy);

impl NClobProxy {
    pub fn from_string(value: impl Into<String>) -> Self {
        Self::from_clob(ClobProxy::from_string(value))
    }

    pub fn from_stream(stream: impl LobStream + 'static, length: u64) -> Self {
        Self::from_clob(ClobProxy::from_stream(stream, length))
    }

    fn from_clob(mut clob: ClobProxy) -> Self {
        clob.kind = "NClob";
        Self(clob)
    }
}

impl Clob for NClobProxy {
    fn length(&self) -> Result<u64> {
        self.0.length()
    }

    fn get_sub_string(&mut self, start: i64, length: i32) -> Result<String> {
        self.0.get_sub_string(start, length)
    }

    fn get_character_stream(&mut self) -> Result<Box<dyn Read + '_>> {
        self.0.get_character_stream()
    }

    fn get_character_stream_range(&mut self, start: i64, length: i64) -> Result<Box<dyn Read + '_>> {
        self.0.get_character_stream_range(start, length)
    }

    fn get_ascii_stream(&mut self) -> Result<Box<dyn Read + '_>> {
        self.0.get_ascii_stream()
    }

    fn set_string(&mut self, position: i64, value: &str) -> Result<usize> {
        self.0.set_string(position, value)
    }

    fn truncate(&mut self, length: i64) -> Result<()> {
        self.0.truncate(length)
    }

    fn position(&mut self, pattern: &str, start: i64) -> Result<i64> {
        self.0.position(pattern, start)
    }

    fn free(&mut self) -> Result<()> {
        self.0.free()
    }
}

impl NClob for NClobProxy {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OrmError;
    use crate::jdbc::lob::stream::SinglePassStream;
    use proptest::prelude::*;

    fn read_string(mut reader: Box<dyn Read + '_>) -> String {
        let mut buf = String::new();
        reader.read_to_string(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_sub_string_counts_characters() {
        let mut clob = ClobProxy::from_string("héllo wörld");
        assert_eq!(clob.length().unwrap(), 11);
        assert_eq!(clob.get_sub_string(1, 5).unwrap(), "héllo");
        assert_eq!(clob.get_sub_string(7, 100).unwrap(), "wörld");
        assert_eq!(read_string(clob.get_character_stream().unwrap()), "héllo wörld");
        assert_eq!(read_string(clob.get_character_stream_range(2, 3).unwrap()), "éll");
    }

    #[test]
    fn test_sub_string_and_stream_range_validate_independently() {
        let mut clob = ClobProxy::from_string("abc");
        assert_eq!(clob.get_sub_string(4, 1).unwrap(), "");
        let err = clob.get_sub_string(5, 1).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Start position [5] cannot exceed overall CLOB length [3]"
        );
        let err = clob.get_character_stream_range(4, 1).err().unwrap();
        assert_eq!(
            err.to_string(),
            "Start position [4] cannot exceed overall CLOB length [3]"
        );
        assert!(clob.get_sub_string(0, 1).is_err());
        assert!(clob.get_sub_string(1, -1).is_err());
        assert!(clob.get_character_stream_range(1, -1).is_err());
    }

    #[test]
    fn test_stream_backed_clob_resets() {
        let mut clob = ClobProxy::from_stream(Cursor::new(b"text".to_vec()), 4);
        assert_eq!(clob.get_sub_string(1, 4).unwrap(), "text");
        assert_eq!(clob.get_sub_string(2, 2).unwrap(), "ex");

        let mut clob = ClobProxy::from_stream(SinglePassStream::new(&b"text"[..]), 4);
        assert_eq!(read_string(clob.get_character_stream().unwrap()), "text");
        let err = clob.get_sub_string(1, 1).unwrap_err();
        assert!(matches!(err, OrmError::Sql(_)));
        assert_eq!(err.to_string(), "could not reset reader");
    }

    #[test]
    fn test_nclob_reports_own_kind() {
        let mut nclob = NClobProxy::from_string("x");
        assert_eq!(nclob.get_sub_string(1, 1).unwrap(), "x");
        let err = nclob.set_string(1, "y").unwrap_err();
        assert!(err.to_string().contains("NClob may not be manipulated from creating session"));
        let mut clob = ClobProxy::from_string("x");
        let err = clob.truncate(0).unwrap_err();
        assert!(err.to_string().contains("Clob may not be manipulated from creating session"));
    }

    proptest! {
        #[test]
        fn prop_sub_string_length_is_requested_or_remaining(
            text in "[a-zé]{1,40}",
            start_offset in 0usize..40,
            length in 0i32..50,
        ) {
            let total = text.chars().count();
            let start = (start_offset % total) as i64 + 1;
            let mut clob = ClobProxy::from_string(text);
            let remaining = total as i64 - start + 1;
            let sub = clob.get_sub_string(start, length).unwrap();
            prop_assert_eq!(sub.chars().count() as i64, i64::from(length).min(remaining));
        }
    }
}
