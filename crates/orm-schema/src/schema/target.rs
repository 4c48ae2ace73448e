//! Generation targets: where generated commands go.
//!
//! Every target follows `prepare`, then `accept` per command, then
//! `release`. Schema actions broadcast each command to every target, so one
//! pass can write a script and execute against a database at the same time.

use std::collections::BTreeSet;
use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use tracing::{debug, warn};

use super::script::ScriptTargetOutput;
use crate::dialect::Dialect;
use crate::error::{OrmError, Result};
use crate::jdbc::{JdbcConnection, SqlExceptionHelper};

/// A destination for generated commands.
pub trait GenerationTarget {
    fn prepare(&mut self) -> Result<()> {
        Ok(())
    }

    fn accept(&mut self, command: &str) -> Result<()>;

    fn release(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Kinds of target a schema action can be pointed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TargetType {
    Database,
    Script,
    Stdout,
}

/// The targets requested for one action.
#[derive(Debug, Default)]
pub struct TargetDescriptor {
    pub target_types: BTreeSet<TargetType>,
    pub script_output: Option<ScriptTargetOutput>,
}

impl TargetDescriptor {
    pub fn database() -> Self {
        Self {
            target_types: BTreeSet::from([TargetType::Database]),
            script_output: None,
        }
    }

    pub fn script(output: ScriptTargetOutput) -> Self {
        Self {
            target_types: BTreeSet::from([TargetType::Script]),
            script_output: Some(output),
        }
    }

    pub fn stdout() -> Self {
        Self {
            target_types: BTreeSet::from([TargetType::Stdout]),
            script_output: None,
        }
    }
}

fn with_delimiter(command: &str, delimiter: Option<&str>) -> String {
    match delimiter {
        Some(delimiter) => format!("{}{}", command, delimiter),
        None => command.to_string(),
    }
}

// ===== Script =====

/// Writes commands to a script.
#[derive(Debug)]
pub struct GenerationTargetToScript {
    output: ScriptTargetOutput,
    delimiter: Option<String>,
}

impl GenerationTargetToScript {
    pub fn new(output: ScriptTargetOutput, delimiter: Option<String>) -> Self {
        Self { output, delimiter }
    }
}

impl GenerationTarget for GenerationTargetToScript {
    fn prepare(&mut self) -> Result<()> {
        self.output.prepare()
    }

    fn accept(&mut self, command: &str) -> Result<()> {
        self.output
            .accept(&with_delimiter(command, self.delimiter.as_deref()))
    }

    fn release(&mut self) -> Result<()> {
        self.output.release()
    }
}

// ===== Stdout =====

/// Prints commands, by default to standard output.
pub struct GenerationTargetToStdout {
    writer: Box<dyn Write + Send>,
    delimiter: Option<String>,
}

impl GenerationTargetToStdout {
    pub fn new(delimiter: Option<String>) -> Self {
        Self::with_writer(io::stdout(), delimiter)
    }

    pub fn with_writer(writer: impl Write + Send + 'static, delimiter: Option<String>) -> Self {
        Self {
            writer: Box::new(writer),
            delimiter,
        }
    }
}

impl GenerationTarget for GenerationTargetToStdout {
    fn accept(&mut self, command: &str) -> Result<()> {
        writeln!(
            self.writer,
            "{}",
            with_delimiter(command, self.delimiter.as_deref())
        )?;
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

impl fmt::Debug for GenerationTargetToStdout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationTargetToStdout")
            .field("delimiter", &self.delimiter)
            .finish()
    }
}

// ===== Database =====

/// Executes commands over a connection. A failing command becomes a
/// `CommandAcceptance` error.
pub struct GenerationTargetToDatabase<'c> {
    connection: &'c dyn JdbcConnection,
    dialect: Arc<dyn Dialect>,
    executed: usize,
}

impl<'c> GenerationTargetToDatabase<'c> {
    pub fn new(connection: &'c dyn JdbcConnection, dialect: Arc<dyn Dialect>) -> Self {
        Self {
            connection,
            dialect,
            executed: 0,
        }
    }

    pub fn executed(&self) -> usize {
        self.executed
    }
}

impl GenerationTarget for GenerationTargetToDatabase<'_> {
    fn prepare(&mut self) -> Result<()> {
        self.executed = 0;
        Ok(())
    }

    fn accept(&mut self, command: &str) -> Result<()> {
        debug!("{}", command);
        match self.connection.execute(command) {
            Ok(()) => {
                self.executed += 1;
                Ok(())
            }
            Err(e) => {
                let message = format!(
                    "Error executing DDL \"{}\" via JDBC [{}]",
                    command,
                    e.message()
                );
                let cause = SqlExceptionHelper::new(self.dialect.as_ref()).convert(
                    e,
                    "Unable to execute schema management to JDBC target",
                    Some(command),
                );
                Err(OrmError::command_acceptance(message, command, Some(cause)))
            }
        }
    }

    fn release(&mut self) -> Result<()> {
        debug!("Executed {} schema management commands", self.executed);
        Ok(())
    }
}

impl fmt::Debug for GenerationTargetToDatabase<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationTargetToDatabase")
            .field("dialect", &self.dialect.name())
            .field("executed", &self.executed)
            .finish()
    }
}

// ===== Collector =====

/// Keeps commands in memory.
#[derive(Debug, Clone, Default)]
pub struct GenerationTargetCollector {
    commands: Vec<String>,
}

impl GenerationTargetCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    pub fn into_commands(self) -> Vec<String> {
        self.commands
    }
}

impl GenerationTarget for GenerationTargetCollector {
    fn accept(&mut self, command: &str) -> Result<()> {
        self.commands.push(command.to_string());
        Ok(())
    }
}

// ===== Lifecycle =====

/// Borrow boxed targets as the slice schema actions accept.
pub fn target_refs<'r>(
    targets: &'r mut [Box<dyn GenerationTarget + '_>],
) -> Vec<&'r mut dyn GenerationTarget> {
    targets
        .iter_mut()
        .map(|t| t.as_mut() as &mut dyn GenerationTarget)
        .collect()
}

/// Prepare every target. On failure the targets already prepared are
/// released before the error is returned.
pub(crate) fn prepare_all(targets: &mut [&mut dyn GenerationTarget]) -> Result<()> {
    for index in 0..targets.len() {
        if let Err(e) = targets[index].prepare() {
            release_all(&mut targets[..index], Ok(()))?;
            return Err(e);
        }
    }
    Ok(())
}

/// Release every target, even after a failure. The outcome of the work
/// wins over release failures, which are then only logged.
pub(crate) fn release_all(targets: &mut [&mut dyn GenerationTarget], outcome: Result<()>) -> Result<()> {
    let mut outcome = outcome;
    for target in targets.iter_mut() {
        if let Err(e) = target.release() {
            if outcome.is_ok() {
                outcome = Err(e);
            } else {
                warn!("Problem releasing GenerationTarget: {}", e);
            }
        }
    }
    outcome
}
