use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use recordbook::backup::BackupManager;
use recordbook::cli::{
    handle_backup_command, handle_export_command, handle_import_command, handle_record_command,
    BackupCommands, ExportFormat, RecordCommands,
};
use recordbook::config::{RecordbookPaths, Settings};
use recordbook::display::format_retention_report;
use recordbook::models::RecordKind;
use recordbook::storage::{open_store, RecordStore};

/// Environment variable holding the log filter
const LOG_ENV: &str = "RECORDBOOK_LOG";

#[derive(Parser)]
#[command(
    name = "recordbook",
    author = "Kaylee Beyene",
    version,
    about = "Validated record store for task lists, planners and contact books",
    long_about = "recordbook keeps to-do items, planner tasks and contacts in local \
                  files. Every change is validated before it is written, writes are \
                  atomic, and timestamped backups can be taken and restored."
)]
struct Cli {
    /// Record kind to work on (todo, planner, contacts)
    #[arg(short, long, global = true, env = "RECORDBOOK_KIND", value_parser = parse_kind)]
    kind: Option<RecordKind>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Record(RecordCommands),

    /// Backup management commands
    #[command(subcommand)]
    Backup(BackupCommands),

    /// Import records from a JSON file
    Import {
        /// Path to JSON file
        file: PathBuf,
        /// Abort without changes if any entry is invalid
        #[arg(long)]
        strict: bool,
    },

    /// Export records
    Export {
        /// Output file path (stdout if omitted)
        output: Option<PathBuf>,
        /// Export format
        #[arg(short, long, value_enum, default_value = "json")]
        format: ExportFormat,
    },

    /// Create the data directories and settings file
    Init,

    /// Show current configuration and paths, or change a setting
    Config {
        /// Setting to change, as KEY=VALUE
        #[arg(long, value_parser = recordbook::cli::parse_assignment)]
        set: Option<(String, String)>,
    },
}

fn parse_kind(s: &str) -> Result<RecordKind, String> {
    RecordKind::parse(s).ok_or_else(|| {
        format!("unknown record kind '{}' (expected todo, planner or contacts)", s)
    })
}

fn setup_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    setup_logging();
    let cli = Cli::parse();

    // Initialize paths and settings
    let paths = RecordbookPaths::new()?;
    let mut settings = Settings::load_or_create(&paths)?;
    let kind = cli.kind.unwrap_or(settings.default_kind);

    match cli.command {
        Some(Commands::Record(cmd)) => {
            let store = open_store(&paths, &settings, kind)?;
            let mutating = cmd.is_mutating();
            handle_record_command(&store, cmd)?;
            if mutating {
                auto_backup(&store, &paths, &settings);
            }
        }
        Some(Commands::Backup(cmd)) => {
            let store = open_store(&paths, &settings, kind)?;
            let manager = backup_manager(&store, &paths, &settings);
            handle_backup_command(&store, &manager, cmd)?;
        }
        Some(Commands::Import { file, strict }) => {
            let store = open_store(&paths, &settings, kind)?;
            handle_import_command(&store, &file, strict || settings.strict_import)?;
            auto_backup(&store, &paths, &settings);
        }
        Some(Commands::Export { output, format }) => {
            let store = open_store(&paths, &settings, kind)?;
            handle_export_command(&store, output, format)?;
        }
        Some(Commands::Init) => {
            println!("Initializing recordbook at: {}", paths.base_dir().display());
            paths.ensure_directories()?;
            settings.save(&paths)?;
            println!("Initialization complete!");
            println!();
            println!("Add a first record with:");
            println!("  recordbook add title=\"Pay bills\" priority=high");
        }
        Some(Commands::Config { set }) => {
            if let Some((key, value)) = set {
                settings.set(&key, &value)?;
                paths.ensure_directories()?;
                settings.save(&paths)?;
                println!("Set {} = {}", key, value);
                return Ok(());
            }

            println!("recordbook Configuration");
            println!("========================");
            println!("Settings file:    {}", paths.settings_file().display());
            println!("Data directory:   {}", paths.data_dir().display());
            println!("Backup directory: {}", paths.backup_dir().display());
            println!();
            println!("Settings:");
            println!("  Default kind:   {}", settings.default_kind);
            println!("  Backend:        {}", settings.backend);
            println!("  Max backups:    {}", settings.backup_retention.max_count);
            println!("  Auto backup:    {}", settings.auto_backup);
            println!("  Strict import:  {}", settings.strict_import);
        }
        None => {
            println!("recordbook - validated records for tasks, plans and contacts");
            println!();
            println!("Run 'recordbook --help' for usage information.");
        }
    }

    Ok(())
}

fn backup_manager(store: &RecordStore, paths: &RecordbookPaths, settings: &Settings) -> BackupManager {
    BackupManager::new(
        store.artifact_path().to_path_buf(),
        paths.backup_dir(),
        settings.backup_retention.clone(),
    )
}

/// Take a backup after a mutation when configured to
///
/// The mutation has already been persisted, so a failed backup only warns.
fn auto_backup(store: &RecordStore, paths: &RecordbookPaths, settings: &Settings) {
    if !settings.auto_backup || !store.artifact_path().exists() {
        return;
    }

    let manager = backup_manager(store, paths, settings);
    match store.backup_with_retention(&manager) {
        Ok((_, report)) if !report.failed.is_empty() => {
            warn!("{}", format_retention_report(&report));
        }
        Ok(_) => {}
        Err(e) => warn!(error = %e, "automatic backup failed"),
    }
}
