//! LOB creation.
//!
//! Contextual creation asks the connection for native LOBs. Non-contextual
//! creation builds proxies locally. Stream-backed LOBs are always proxies.

use tracing::{debug, info};

use super::blob::{Blob, BlobProxy};
use super::clob::{Clob, ClobProxy, NClobProxy};
use super::serializable::{SerializableBlobProxy, SerializableClobProxy, SerializableNClobProxy};
use super::stream::LobStream;
use crate::config::settings::{self, Settings};
use crate::error::Result;
use crate::jdbc::exception::SqlResult;

/// Native LOB creation offered by a connection.
pub trait LobConnection {
    /// Whether the driver can create LOBs at all.
    fn supports_lob_creation(&self) -> bool;

    fn create_blob(&self, bytes: &[u8]) -> SqlResult<Box<dyn Blob>>;

    fn create_clob(&self, value: &str) -> SqlResult<Box<dyn Clob>>;

    fn create_nclob(&self, value: &str) -> SqlResult<Box<dyn Clob>>;
}

/// Creates LOB values for binding.
pub trait LobCreator {
    fn create_blob(&self, bytes: Vec<u8>) -> Result<Box<dyn Blob>>;

    fn create_blob_from_stream(&self, stream: Box<dyn LobStream>, length: u64) -> Result<Box<dyn Blob>> {
        Ok(Box::new(BlobProxy::from_stream(stream, length)))
    }

    fn create_clob(&self, value: String) -> Result<Box<dyn Clob>>;

    fn create_clob_from_stream(&self, stream: Box<dyn LobStream>, length: u64) -> Result<Box<dyn Clob>> {
        Ok(Box::new(ClobProxy::from_stream(stream, length)))
    }

    fn create_nclob(&self, value: String) -> Result<Box<dyn Clob>>;

    fn create_nclob_from_stream(&self, stream: Box<dyn LobStream>, length: u64) -> Result<Box<dyn Clob>> {
        Ok(Box::new(NClobProxy::from_stream(stream, length)))
    }

    fn wrap_blob(&self, blob: Box<dyn Blob>) -> Box<dyn Blob> {
        Box::new(SerializableBlobProxy::new(blob))
    }

    fn wrap_clob(&self, clob: Box<dyn Clob>) -> Box<dyn Clob> {
        Box::new(SerializableClobProxy::new(clob))
    }

    fn wrap_nclob(&self, nclob: Box<dyn Clob>) -> Box<dyn Clob> {
        Box::new(SerializableNClobProxy::new(nclob))
    }
}

/// Builds proxies; needs no connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonContextualLobCreator;

impl LobCreator for NonContextualLobCreator {
    fn create_blob(&self, bytes: Vec<u8>) -> Result<Box<dyn Blob>> {
        Ok(Box::new(BlobProxy::from_bytes(bytes)))
    }

    fn create_clob(&self, value: String) -> Result<Box<dyn Clob>> {
        Ok(Box::new(ClobProxy::from_string(value)))
    }

    fn create_nclob(&self, value: String) -> Result<Box<dyn Clob>> {
        Ok(Box::new(NClobProxy::from_string(value)))
    }
}

/// Delegates to the connection.
pub struct ContextualLobCreator<'c> {
    connection: &'c dyn LobConnection,
}

impl<'c> ContextualLobCreator<'c> {
    pub fn new(connection: &'c dyn LobConnection) -> Self {
        Self { connection }
    }
}

impl LobCreator for ContextualLobCreator<'_> {
    fn create_blob(&self, bytes: Vec<u8>) -> Result<Box<dyn Blob>> {
        Ok(self.connection.create_blob(&bytes)?)
    }

    fn create_clob(&self, value: String) -> Result<Box<dyn Clob>> {
        Ok(self.connection.create_clob(&value)?)
    }

    fn create_nclob(&self, value: String) -> Result<Box<dyn Clob>> {
        Ok(self.connection.create_nclob(&value)?)
    }
}

/// Chooses the creation strategy once per connection.
#[derive(Debug, Clone, Copy)]
pub struct LobCreatorBuilder {
    use_contextual: bool,
}

impl LobCreatorBuilder {
    pub fn new(settings: &Settings, connection: Option<&dyn LobConnection>) -> Self {
        let use_contextual = if settings.get_bool_or(settings::NON_CONTEXTUAL_LOB_CREATION, false) {
            info!(
                "Disabling contextual LOB creation as {} is true",
                settings::NON_CONTEXTUAL_LOB_CREATION
            );
            false
        } else {
            match connection {
                Some(connection) if connection.supports_lob_creation() => true,
                Some(_) => {
                    info!("Disabling contextual LOB creation as the driver cannot create LOBs");
                    false
                }
                None => {
                    debug!("Disabling contextual LOB creation as no connection is available");
                    false
                }
            }
        };
        Self { use_contextual }
    }

    pub fn uses_contextual_creation(&self) -> bool {
        self.use_contextual
    }

    pub fn build_lob_creator<'c>(&self, connection: Option<&'c dyn LobConnection>) -> Box<dyn LobCreator + 'c> {
        match connection {
            Some(connection) if self.use_contextual => Box::new(ContextualLobCreator::new(connection)),
            _ => Box::new(NonContextualLobCreator),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jdbc::SqlException;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingConnection {
        supported: bool,
        created: AtomicUsize,
    }

    impl LobConnection for CountingConnection {
        fn supports_lob_creation(&self) -> bool {
            self.supported
        }

        fn create_blob(&self, bytes: &[u8]) -> SqlResult<Box<dyn Blob>> {
            self.created.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(BlobProxy::from_bytes(bytes.to_vec())))
        }

        fn create_clob(&self, value: &str) -> SqlResult<Box<dyn Clob>> {
            self.created.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(ClobProxy::from_string(value)))
        }

        fn create_nclob(&self, _value: &str) -> SqlResult<Box<dyn Clob>> {
            Err(SqlException::new("nclob not supported").with_sql_state("0A000"))
        }
    }

    #[test]
    fn test_non_contextual_creation() {
        let creator = NonContextualLobCreator;
        let mut blob = creator.create_blob(b"abc".to_vec()).unwrap();
        assert_eq!(blob.get_bytes(1, 3).unwrap(), b"abc");
        let mut clob = creator
            .create_clob_from_stream(Box::new(Cursor::new(b"xyz".to_vec())), 3)
            .unwrap();
        assert_eq!(clob.get_sub_string(2, 2).unwrap(), "yz");
        let wrapped = creator.wrap_nclob(creator.create_nclob("n".into()).unwrap());
        assert_eq!(wrapped.length().unwrap(), 1);
    }

    #[test]
    fn test_contextual_creation_uses_connection() {
        let connection = CountingConnection {
            supported: true,
            ..CountingConnection::default()
        };
        let builder = LobCreatorBuilder::new(&Settings::new(), Some(&connection));
        assert!(builder.uses_contextual_creation());
        let creator = builder.build_lob_creator(Some(&connection));
        creator.create_blob(vec![1, 2]).unwrap();
        creator.create_clob("c".into()).unwrap();
        assert_eq!(connection.created.load(Ordering::SeqCst), 2);
        assert!(creator.create_nclob("n".into()).is_err());
    }

    #[test]
    fn test_setting_forces_non_contextual_creation() {
        let connection = CountingConnection {
            supported: true,
            ..CountingConnection::default()
        };
        let settings = Settings::new().with(settings::NON_CONTEXTUAL_LOB_CREATION, "true");
        let builder = LobCreatorBuilder::new(&settings, Some(&connection));
        assert!(!builder.uses_contextual_creation());
        builder
            .build_lob_creator(Some(&connection))
            .create_blob(vec![1])
            .unwrap();
        assert_eq!(connection.created.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unsupported_driver_falls_back() {
        let connection = CountingConnection::default();
        let builder = LobCreatorBuilder::new(&Settings::new(), Some(&connection));
        assert!(!builder.uses_contextual_creation());
        assert!(!LobCreatorBuilder::new(&Settings::new(), None).uses_contextual_creation());
    }
}
