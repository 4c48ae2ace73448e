//! Serializable wrappers around driver LOBs.
//!
//! The wrapped LOB is not serialized. A wrapper that went through
//! serialization no longer has it, and every access fails.

use std::fmt;
use std::io::Read;

use serde::{Deserialize, Serialize};

use super::blob::Blob;
use super::clob::{Clob, NClob};
use crate::error::{OrmError, Result};

/// Serializable handle on a [`Blob`].
#[derive(Default, Serialize, Deserialize)]
pub struct SerializableBlobProxy {
    #[serde(skip)]
    blob: Option<Box<dyn Blob>>,
}

impl SerializableBlobProxy {
    pub fn new(blob: Box<dyn Blob>) -> Self {
        Self { blob: Some(blob) }
    }

    /// The wrapped LOB itself.
    ///
    /// # Errors
    ///
    /// `IllegalState` after deserialization.
    pub fn get_wrapped_blob(&self) -> Result<&dyn Blob> {
        self.blob
            .as_deref()
            .ok_or_else(|| OrmError::IllegalState("Blobs may not be accessed after serialization".to_string()))
    }

    fn wrapped(&mut self) -> Result<&mut dyn Blob> {
        match self.blob.as_deref_mut() {
            Some(blob) => Ok(blob),
            None => Err(OrmError::IllegalState(
                "Blobs may not be accessed after serialization".to_string(),
            )),
        }
    }
}

impl Blob for SerializableBlobProxy {
    fn length(&self) -> Result<u64> {
        self.get_wrapped_blob()?.length()
    }

    fn get_bytes(&mut self, start: i64, length: i32) -> Result<Vec<u8>> {
        self.wrapped()?.get_bytes(start, length)
    }

    fn get_binary_stream(&mut self) -> Result<Box<dyn Read + '_>> {
        self.wrapped()?.get_binary_stream()
    }

    fn get_binary_stream_range(&mut self, start: i64, length: i64) -> Result<Box<dyn Read + '_>> {
        self.wrapped()?.get_binary_stream_range(start, length)
    }

    fn set_bytes(&mut self, position: i64, bytes: &[u8]) -> Result<usize> {
        self.wrapped()?.set_bytes(position, bytes)
    }

    fn truncate(&mut self, length: i64) -> Result<()> {
        self.wrapped()?.truncate(length)
    }

    fn position(&mut self, pattern: &[u8], start: i64) -> Result<i64> {
        self.wrapped()?.position(pattern, start)
    }

    fn free(&mut self) -> Result<()> {
        self.wrapped()?.free()
    }
}

impl fmt::Debug for SerializableBlobProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerializableBlobProxy")
            .field("blob", &self.blob)
            .finish()
    }
}

/// Serializable handle on a [`Clob`].
#[derive(Default, Serialize, Deserialize)]
pub struct SerializableClobProxy {
    #[serde(skip)]
    clob: Option<Box<dyn Clob>>,
}

impl SerializableClobProxy {
    pub fn new(clob: Box<dyn Clob>) -> Self {
        Self { clob: Some(clob) }
    }

    /// The wrapped LOB itself.
    ///
    /// # Errors
    ///
    /// `IllegalState` after deserialization.
    pub fn get_wrapped_clob(&self) -> Result<&dyn Clob> {
        self.clob
            .as_deref()
            .ok_or_else(|| OrmError::IllegalState("Clobs may not be accessed after serialization".to_string()))
    }

    fn wrapped(&mut self) -> Result<&mut dyn Clob> {
        match self.clob.as_deref_mut() {
            Some(clob) => Ok(clob),
            None => Err(OrmError::IllegalState(
                "Clobs may not be accessed after serialization".to_string(),
            )),
        }
    }
}

impl Clob for SerializableClobProxy {
    fn length(&self) -> Result<u64> {
        self.get_wrapped_clob()?.length()
    }

    fn get_sub_string(&mut self, start: i64, length: i32) -> Result<String> {
        self.wrapped()?.get_sub_string(start, length)
    }

    fn get_character_stream(&mut self) -> Result<Box<dyn Read + '_>> {
        self.wrapped()?.get_character_stream()
    }

    fn get_character_stream_range(&mut self, start: i64, length: i64) -> Result<Box<dyn Read + '_>> {
        self.wrapped()?.get_character_stream_range(start, length)
    }

    fn get_ascii_stream(&mut self) -> Result<Box<dyn Read + '_>> {
        self.wrapped()?.get_ascii_stream()
    }

    fn set_string(&mut self, position: i64, value: &str) -> Result<usize> {
        self.wrapped()?.set_string(position, value)
    }

    fn truncate(&mut self, length: i64) -> Result<()> {
        self.wrapped()?.truncate(length)
    }

    fn position(&mut self, pattern: &str, start: i64) -> Result<i64> {
        self.wrapped()?.position(pattern, start)
    }

    fn free(&mut self) -> Result<()> {
        self.wrapped()?.free()
    }
}

impl fmt::Debug for SerializableClobProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerializableClobProxy")
            .field("clob", &self.clob)
            .finish()
    }
}

/// Serializable handle on an [`NClob`].
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SerializableNClobProxy(SerializableClobProxy);

impl SerializableNClobProxy {
    pub fn new(nclob: Box<dyn Clob>) -> Self {
        Self(SerializableClobProxy::new(nclob))
    }

    pub fn get_wrapped_nclob(&self) -> Result<&dyn Clob> {
        self.0.get_wrapped_clob()
    }
}

impl Clob for SerializableNClobProxy {
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

impl NClob for SerializableNClobProxy {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jdbc::lob::{BlobProxy, ClobProxy, NClobProxy};

    #[test]
    fn test_wrapped_blob_is_the_original() {
        let blob: Box<dyn Blob> = Box::new(BlobProxy::from_bytes(b"abc".to_vec()));
        let original = blob.as_ref() as *const dyn Blob as *const u8;
        let proxy = SerializableBlobProxy::new(blob);
        let wrapped = proxy.get_wrapped_blob().unwrap() as *const dyn Blob as *const u8;
        assert!(std::ptr::eq(wrapped, original));
        assert_eq!(proxy.length().unwrap(), 3);
    }

    #[test]
    fn test_blob_unusable_after_round_trip() {
        let proxy = SerializableBlobProxy::new(Box::new(BlobProxy::from_bytes(b"abc".to_vec())));
        let json = serde_json::to_string(&proxy).unwrap();
        let mut restored: SerializableBlobProxy = serde_json::from_str(&json).unwrap();
        assert!(matches!(
            restored.get_wrapped_blob().unwrap_err(),
            OrmError::IllegalState(_)
        ));
        assert!(matches!(restored.get_bytes(1, 1).unwrap_err(), OrmError::IllegalState(_)));
    }

    #[test]
    fn test_clob_delegates_then_fails_after_round_trip() {
        let mut proxy = SerializableClobProxy::new(Box::new(ClobProxy::from_string("hello")));
        assert_eq!(proxy.get_sub_string(1, 2).unwrap(), "he");
        let json = serde_json::to_string(&proxy).unwrap();
        let restored: SerializableClobProxy = serde_json::from_str(&json).unwrap();
        let err = restored.get_wrapped_clob().unwrap_err();
        assert_eq!(err.to_string(), "Illegal state: Clobs may not be accessed after serialization");
    }

    #[test]
    fn test_nclob_wrapper() {
        let proxy = SerializableNClobProxy::new(Box::new(NClobProxy::from_string("n")));
        assert_eq!(proxy.get_wrapped_nclob().unwrap().length().unwrap(), 1);
        let json = serde_json::to_string(&proxy).unwrap();
        let restored: SerializableNClobProxy = serde_json::from_str(&json).unwrap();
        assert!(restored.get_wrapped_nclob().is_err());
    }
}
