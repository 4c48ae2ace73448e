//! Data population from the configured import scripts.

use tracing::info;

use super::formatter::Formatter;
use super::helper::apply_import_sources;
use super::options::ExecutionOptions;
use super::target::{prepare_all, release_all, GenerationTarget};
use crate::error::Result;

/// Runs the load script and import files without touching the schema.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaPopulator;

impl SchemaPopulator {
    pub fn new() -> Self {
        Self
    }

    pub fn do_population(
        &self,
        options: &ExecutionOptions<'_>,
        targets: &mut [&mut dyn GenerationTarget],
    ) -> Result<()> {
        if targets.is_empty() {
            return Ok(());
        }
        info!("Populating schema");
        prepare_all(targets)?;
        let outcome = apply_import_sources(options, Formatter::from_settings(options.settings()), targets);
        release_all(targets, outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::{self, Settings};
    use crate::schema::exception_handler::ExceptionHandlerHaltImpl;
    use crate::schema::target::GenerationTargetCollector;

    #[test]
    fn test_missing_load_script_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::new().with(
            settings::JAKARTA_HBM2DDL_LOAD_SCRIPT_SOURCE,
            dir.path().join("absent.sql").display().to_string(),
        );
        let options = ExecutionOptions::new(&settings, &ExceptionHandlerHaltImpl);
        let mut collector = GenerationTargetCollector::new();
        let mut targets: [&mut dyn GenerationTarget; 1] = [&mut collector];
        let err = SchemaPopulator::new()
            .do_population(&options, &mut targets)
            .unwrap_err();
        assert!(err.to_string().contains("Unable to read script source file"));
    }

    #[test]
    fn test_nothing_configured_emits_nothing() {
        let settings = Settings::new();
        let options = ExecutionOptions::new(&settings, &ExceptionHandlerHaltImpl);
        let mut collector = GenerationTargetCollector::new();
        {
            let mut targets: [&mut dyn GenerationTarget; 1] = [&mut collector];
            SchemaPopulator::new().do_population(&options, &mut targets).unwrap();
        }
        assert!(collector.commands().is_empty());
    }
}
