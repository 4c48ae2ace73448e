//! orm-schema CLI - generate, migrate and validate DDL from a logical model.

use clap::{Parser, Subcommand};
use orm_schema::config::settings;
use orm_schema::dialect::{Dialect, DialectImpl};
use orm_schema::schema::coordinator::{create_source, drop_source};
use orm_schema::schema::{
    exception_handler_for, process, should_manage_namespaces, target_refs, Charset,
    ContributableMatcher, DelayedDropActions, ExecutionOptions, ScriptTargetOutput,
};
use orm_schema::{Config, OrmError, SchemaManagementTool, Settings, TargetDescriptor};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser)]
#[command(name = "orm-schema")]
#[command(about = "Generate, migrate and validate database schemas from a logical model")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "schema.yaml")]
    config: PathBuf,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the create DDL for the model
    Create {
        /// Write DDL to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Pretty-print DDL
        #[arg(long)]
        format: bool,

        /// Delimiter appended to every statement
        #[arg(long)]
        delimiter: Option<String>,

        /// Also create schemas and catalogs
        #[arg(long)]
        create_namespaces: bool,
    },

    /// Generate the drop DDL for the model
    Drop {
        /// Write DDL to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Pretty-print DDL
        #[arg(long)]
        format: bool,

        /// Delimiter appended to every statement
        #[arg(long)]
        delimiter: Option<String>,
    },

    /// Generate the DDL migrating the existing snapshot to the model
    Update {
        /// Write DDL to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate the existing snapshot against the model
    Validate,

    /// Generate the statements emptying every table
    Truncate {
        /// Write statements to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run the actions named in the configuration's settings
    Process,
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

fn run() -> Result<(), OrmError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format).map_err(OrmError::Config)?;

    let config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    let mut settings = config.settings.clone();
    match &cli.command {
        Commands::Create {
            format,
            delimiter,
            create_namespaces,
            ..
        } => {
            apply_output_flags(&mut settings, *format, delimiter.as_deref());
            if *create_namespaces {
                settings.insert(settings::HBM2DDL_CREATE_NAMESPACES, true);
            }
        }
        Commands::Drop {
            format, delimiter, ..
        } => apply_output_flags(&mut settings, *format, delimiter.as_deref()),
        _ => {}
    }

    let dialect: Arc<dyn Dialect> = Arc::new(DialectImpl::from_name(&config.dialect)?);
    let tool = match &config.existing {
        Some(snapshot) => SchemaManagementTool::connected(Arc::clone(&dialect), snapshot)?,
        None => SchemaManagementTool::offline(Arc::clone(&dialect)),
    };
    info!("Using dialect {}", dialect.name());

    let options = ExecutionOptions::new(&settings, exception_handler_for(&settings))
        .with_manage_namespaces(should_manage_namespaces(&settings));
    let matcher = ContributableMatcher::All;

    match cli.command {
        Commands::Create { output, .. } => {
            let mut targets = tool.build_generation_targets(target_for(output, &settings)?, &settings)?;
            tool.schema_creator().do_creation(
                &config.model,
                &options,
                &matcher,
                &create_source(&settings)?,
                &mut target_refs(&mut targets),
            )?;
        }

        Commands::Drop { output, .. } => {
            let mut targets = tool.build_generation_targets(target_for(output, &settings)?, &settings)?;
            tool.schema_dropper().do_drop(
                &config.model,
                &options,
                &matcher,
                &drop_source(&settings)?,
                &mut target_refs(&mut targets),
            )?;
        }

        Commands::Update { output } => {
            require_snapshot(&config, "update")?;
            let mut targets = tool.build_generation_targets(target_for(output, &settings)?, &settings)?;
            tool.schema_migrator()?.do_migration(
                &config.model,
                &options,
                &matcher,
                &mut target_refs(&mut targets),
            )?;
        }

        Commands::Validate => {
            require_snapshot(&config, "validate")?;
            tool.schema_validator()?
                .do_validation(&config.model, &options, &matcher)?;
            println!("Schema validation succeeded");
        }

        Commands::Truncate { output } => {
            let mut targets = tool.build_generation_targets(target_for(output, &settings)?, &settings)?;
            tool.schema_truncator().do_truncate(
                &config.model,
                &options,
                &matcher,
                &mut target_refs(&mut targets),
            )?;
        }

        Commands::Process => {
            let mut delayed_drops = DelayedDropActions::new();
            process(&config.model, &tool, &settings, &mut delayed_drops)?;

            if let Some(snapshot) = &config.existing {
                if !delayed_drops.is_empty() {
                    info!(
                        "Running {} delayed drop action(s) on close",
                        delayed_drops.actions().len()
                    );
                    delayed_drops.perform_all(snapshot, Arc::clone(&dialect))?;
                }
                for statement in snapshot.executed() {
                    println!("{}", statement);
                }
            }
        }
    }

    Ok(())
}

fn apply_output_flags(settings: &mut Settings, format: bool, delimiter: Option<&str>) {
    if format {
        settings.insert(settings::FORMAT_SQL, true);
    }
    if let Some(delimiter) = delimiter {
        settings.insert(settings::HBM2DDL_DELIMITER, delimiter.to_string());
    }
}

/// A script target for `output`, stdout otherwise.
fn target_for(output: Option<PathBuf>, settings: &Settings) -> Result<TargetDescriptor, OrmError> {
    match output {
        Some(path) => {
            info!("Writing statements to {:?}", path);
            let charset = Charset::from_settings(settings)?;
            Ok(TargetDescriptor::script(ScriptTargetOutput::to_file(path, charset, false)))
        }
        None => Ok(TargetDescriptor::stdout()),
    }
}

fn require_snapshot(config: &Config, command: &str) -> Result<(), OrmError> {
    if config.has_snapshot() {
        Ok(())
    } else {
        Err(OrmError::Config(format!(
            "'{}' requires an 'existing' database snapshot in the configuration",
            command
        )))
    }
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // stdout carries generated DDL
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}
