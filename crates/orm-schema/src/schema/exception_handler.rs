//! Policies for a DDL command rejected by a target.

use std::sync::Mutex;

use tracing::warn;

use crate::error::{OrmError, Result};

/// Decides whether a rejected command stops the schema action.
pub trait ExceptionHandler: Send + Sync {
    fn handle_exception(&self, error: OrmError) -> Result<()>;
}

/// Rethrows.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExceptionHandlerHaltImpl;

impl ExceptionHandler for ExceptionHandlerHaltImpl {
    fn handle_exception(&self, error: OrmError) -> Result<()> {
        Err(error)
    }
}

/// Logs and continues with the next command.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExceptionHandlerLoggedImpl;

impl ExceptionHandler for ExceptionHandlerLoggedImpl {
    fn handle_exception(&self, error: OrmError) -> Result<()> {
        warn!(
            "GenerationTarget encountered exception accepting command : {}",
            error
        );
        Ok(())
    }
}

/// Keeps every error for later inspection and continues.
#[derive(Debug, Default)]
pub struct ExceptionHandlerCollectingImpl {
    errors: Mutex<Vec<OrmError>>,
}

impl ExceptionHandlerCollectingImpl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain what has been collected so far.
    pub fn take_collected_exceptions(&self) -> Vec<OrmError> {
        match self.errors.lock() {
            Ok(mut errors) => std::mem::take(&mut *errors),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl ExceptionHandler for ExceptionHandlerCollectingImpl {
    fn handle_exception(&self, error: OrmError) -> Result<()> {
        match self.errors.lock() {
            Ok(mut errors) => errors.push(error),
            Err(poisoned) => poisoned.into_inner().push(error),
        }
        Ok(())
    }
}
