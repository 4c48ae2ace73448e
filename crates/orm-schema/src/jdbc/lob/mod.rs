//! Large objects.
//!
//! [`BlobProxy`], [`ClobProxy`] and [`NClobProxy`] are LOBs that exist
//! without a connection ("non-contextual" creation). They support reads only;
//! anything that would modify the LOB fails. The serializable wrappers keep a
//! driver LOB out of serialized state.
//!
//! [`LobCreatorBuilder`] picks contextual or non-contextual creation.

pub mod blob;
pub mod clob;
pub mod creator;
pub mod serializable;
pub mod stream;

pub use blob::{Blob, BlobProxy};
pub use clob::{Clob, ClobProxy, NClob, NClobProxy};
pub use creator::{
    ContextualLobCreator, LobConnection, LobCreator, LobCreatorBuilder, NonContextualLobCreator,
};
pub use serializable::{SerializableBlobProxy, SerializableClobProxy, SerializableNClobProxy};
pub use stream::{FileLobStream, LobStream, SinglePassStream};

use std::io;

use super::exception::SqlException;
use crate::error::{OrmError, Result};

fn check_start(start: i64) -> Result<u64> {
    if start < 1 {
        return Err(SqlException::new("Start position 1-based; must be 1 or more.").into());
    }
    Ok(start as u64)
}

fn check_length(length: i64) -> Result<u64> {
    if length < 0 {
        return Err(SqlException::new("Length must be great-than-or-equal to zero.").into());
    }
    Ok(length as u64)
}

fn start_exceeds_length(start: u64, length: u64, kind: &str) -> OrmError {
    SqlException::new(format!(
        "Start position [{}] cannot exceed overall {} length [{}]",
        start, kind, length
    ))
    .into()
}

fn reset_failed(e: io::Error) -> OrmError {
    SqlException::new("could not reset reader").with_cause(e).into()
}

fn read_failed(e: io::Error) -> OrmError {
    SqlException::new("Unable to read LOB stream").with_cause(e).into()
}

fn not_manipulable(kind: &str) -> OrmError {
    OrmError::UnsupportedOperation(format!("{} may not be manipulated from creating session", kind))
}
