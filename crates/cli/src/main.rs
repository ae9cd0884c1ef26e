// vmaster CLI - one-shot vendor-master reconciliation cycle
// One invocation = one cycle; the scheduler owns recurrence.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;

use clap::{Parser, Subcommand};

use vmaster_cli::cycle::{self, CycleFailure};
use vmaster_cli::exit_codes::{
    EXIT_CANCELLED, EXIT_CONFIG, EXIT_CONFIG_INVALID, EXIT_CONFIG_TOKEN, EXIT_ERROR, EXIT_EXPORT,
    EXIT_MERGE, EXIT_SOURCE_ERP, EXIT_SOURCE_GRC, EXIT_SOURCE_STAGING, EXIT_SUCCESS, EXIT_UPLOAD,
};
use vmaster_config::{ConfigError, Settings};
use vmaster_connect::{refresh_staging, MappingDb};

#[derive(Parser)]
#[command(name = "vmaster")]
#[command(about = "Vendor-master reconciliation across ERP, GRC and Legacy sources")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one full reconciliation cycle
    #[command(after_help = "\
Examples:
  vmaster run
  vmaster run --config ops/vmaster.toml --json
  vmaster run --quiet")]
    Run {
        /// Settings file (default: $VMASTER_CONFIG, then ./vmaster.toml)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Suppress progress output on stderr
        #[arg(long)]
        quiet: bool,

        /// Print the cycle report as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Validate settings without touching any source
    #[command(after_help = "\
Examples:
  vmaster validate
  vmaster validate --config ops/vmaster.toml")]
    Validate {
        /// Settings file (default: $VMASTER_CONFIG, then ./vmaster.toml)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Mapping staging operations
    #[command(subcommand)]
    Mapping(MappingCommands),
}

#[derive(Subcommand)]
enum MappingCommands {
    /// Refresh the staging table from a mapping workbook
    #[command(after_help = "\
Examples:
  vmaster mapping load inbox/mapping-2024-06.xlsx")]
    Load {
        /// Workbook (.xlsx) to load
        workbook: PathBuf,

        /// Settings file (default: $VMASTER_CONFIG, then ./vmaster.toml)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Suppress progress output on stderr
        #[arg(long)]
        quiet: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { config, quiet, json } => cmd_run(config, quiet, json),
        Commands::Validate { config } => cmd_validate(config),
        Commands::Mapping(MappingCommands::Load { workbook, config, quiet }) => {
            cmd_mapping_load(workbook, config, quiet)
        }
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {message}");
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {hint}");
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

fn config_exit_code(err: &ConfigError) -> u8 {
    match err {
        ConfigError::Invalid(_) => EXIT_CONFIG_INVALID,
        ConfigError::MissingToken { .. } => EXIT_CONFIG_TOKEN,
        _ => EXIT_CONFIG,
    }
}

fn config_error(err: ConfigError) -> CliError {
    let hint = match &err {
        ConfigError::NotFound { .. } => {
            Some("create vmaster.toml or pass --config".to_string())
        }
        ConfigError::MissingToken { env, .. } => Some(format!("export {env}=…")),
        _ => None,
    };
    CliError {
        code: config_exit_code(&err),
        message: err.to_string(),
        hint,
    }
}

fn cycle_error(err: cycle::CycleError) -> CliError {
    let code = match &err.failure {
        CycleFailure::Config(inner) => config_exit_code(inner),
        CycleFailure::Staging(_) => EXIT_SOURCE_STAGING,
        CycleFailure::Erp(_) => EXIT_SOURCE_ERP,
        CycleFailure::Grc(_) => EXIT_SOURCE_GRC,
        CycleFailure::Merge(_) => EXIT_MERGE,
        CycleFailure::Export(_) => EXIT_EXPORT,
        CycleFailure::Cancelled => EXIT_CANCELLED,
    };
    CliError {
        code,
        message: err.to_string(),
        hint: None,
    }
}

fn cmd_run(config: Option<PathBuf>, quiet: bool, json: bool) -> Result<(), CliError> {
    let settings = Settings::load(config.as_deref()).map_err(config_error)?;

    // The cancel flag is the cooperative seam between phases; this binary
    // never sets it, but embedders and tests do.
    let cancel = AtomicBool::new(false);

    let report = cycle::run_cycle(&settings, &cancel, quiet).map_err(cycle_error)?;

    if json {
        let out = serde_json::to_string_pretty(&report).map_err(|e| CliError {
            code: EXIT_ERROR,
            message: format!("JSON serialization error: {e}"),
            hint: None,
        })?;
        println!("{out}");
    }

    if !quiet {
        eprintln!(
            "cycle complete: {} entities, changed = {}{}",
            report.stats.entities,
            report.changed,
            report
                .export_path
                .as_ref()
                .map(|p| format!(", exported {}", p.display()))
                .unwrap_or_default(),
        );
    }

    if let Some(message) = report.upload_failure() {
        return Err(CliError {
            code: EXIT_UPLOAD,
            message: format!("upload failed after retries: {message}"),
            hint: Some("merge is committed; re-run the cycle or upload the export by hand".into()),
        });
    }

    Ok(())
}

fn cmd_validate(config: Option<PathBuf>) -> Result<(), CliError> {
    let settings = Settings::load(config.as_deref()).map_err(config_error)?;
    settings.validate().map_err(config_error)?;

    eprintln!(
        "valid: ERP '{}', staging '{}', master '{}', GRC workflow {}/{}",
        settings.databases.erp.display(),
        settings.databases.staging.display(),
        settings.databases.master.display(),
        settings.grc.workflow_id,
        settings.grc.step_id,
    );
    Ok(())
}

fn cmd_mapping_load(
    workbook: PathBuf,
    config: Option<PathBuf>,
    quiet: bool,
) -> Result<(), CliError> {
    let settings = Settings::load(config.as_deref()).map_err(config_error)?;

    let mut staging = MappingDb::open(&settings.databases.staging).map_err(|e| CliError {
        code: EXIT_SOURCE_STAGING,
        message: e.to_string(),
        hint: None,
    })?;

    let load = refresh_staging(&mut staging, &workbook, &settings.mapping.sheet).map_err(|e| {
        CliError {
            code: EXIT_SOURCE_STAGING,
            message: e.to_string(),
            hint: None,
        }
    })?;

    if !quiet {
        eprintln!(
            "staging refreshed from {}: {} rows ({} skipped)",
            workbook.display(),
            load.rows_loaded,
            load.rows_skipped,
        );
    }
    Ok(())
}
