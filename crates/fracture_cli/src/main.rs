//! Command line front-end for fracture projects.
//!
//! # Responsibility
//! - Map subcommands onto core services.
//! - Keep output line-oriented so it can be piped.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fracture_core::db::open_db;
use fracture_core::{
    ScanOptions, Scanner, SettingsService, SqliteElementRepository, SqliteSettingsRepository,
    TagService,
};
use log::debug;
use rusqlite::Connection;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fracture")]
#[command(version)]
#[command(about = "Lightweight element tagging and lookup")]
struct Cli {
    /// Path to the project database
    #[arg(long, env = "FRACTURE_DB", default_value = "project.fracture", global = true)]
    db: PathBuf,

    /// Log level (trace|debug|info|warn|error)
    #[arg(long, env = "FRACTURE_LOG_LEVEL", global = true)]
    log_level: Option<String>,

    /// Absolute directory for rotating log files; stderr when omitted
    #[arg(long, env = "FRACTURE_LOG_DIR", global = true)]
    log_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the project database (no-op when it already exists)
    Init,
    /// Register an element
    Add { identifier: String },
    /// Assign tags to an element
    Tag {
        identifier: String,
        #[arg(required = true)]
        tags: Vec<String>,
    },
    /// Unassign tags from an element
    Untag {
        identifier: String,
        #[arg(required = true)]
        tags: Vec<String>,
    },
    /// Print tags assigned to an element
    Tags { identifier: String },
    /// Print what element plugins know about an identifier
    Describe { identifier: String },
    /// Find elements by identifier substring or full tag set
    Find {
        terms: Vec<String>,
        /// Maximum number of results
        #[arg(short, long)]
        limit: Option<u32>,
    },
    /// Remove an element with all its tag and dependency links
    Remove { identifier: String },
    /// Scan locations and register discovered elements
    Scan {
        /// Locations to scan; stored scan locations when omitted
        locations: Vec<String>,
        #[arg(long)]
        no_recursive: bool,
        /// Skip linking mandatory tags of element plugins
        #[arg(long)]
        no_tags: bool,
        #[arg(long)]
        no_cleanup: bool,
    },
    /// Inspect or change project settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Print the core version
    Version,
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print the settings payload as JSON
    Show,
    AddScanLocation { location: String },
    RemoveScanLocation { location: String },
    AddSkipRegex { pattern: String },
    RemoveSkipRegex { pattern: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    if let Commands::Version = cli.command {
        println!("fracture {}", fracture_core::core_version());
        return Ok(());
    }

    let mut conn = open_db(&cli.db)
        .with_context(|| format!("failed to open project `{}`", cli.db.display()))?;
    debug!("event=cli_command module=cli status=start db={}", cli.db.display());
    run(cli.command, &mut conn)
}

fn init_logging(cli: &Cli) -> Result<()> {
    let level = cli
        .log_level
        .as_deref()
        .unwrap_or(fracture_core::default_log_level());
    let result = match cli.log_dir.as_deref() {
        Some(dir) => fracture_core::init_logging(level, dir),
        None => fracture_core::init_stderr_logging(level),
    };
    result.map_err(anyhow::Error::msg)
}

fn run(command: Commands, conn: &mut Connection) -> Result<()> {
    match command {
        Commands::Init | Commands::Version => {}
        Commands::Add { identifier } => {
            let service = TagService::new(SqliteElementRepository::try_new(conn)?);
            let element = service.add(&identifier)?;
            println!("{}\t{}", element.id, element.identifier);
        }
        Commands::Tag { identifier, tags } => {
            let mut service = TagService::new(SqliteElementRepository::try_new(conn)?);
            print_lines(service.tag(&identifier, &tags)?);
        }
        Commands::Untag { identifier, tags } => {
            let service = TagService::new(SqliteElementRepository::try_new(conn)?);
            let removed = service.untag(&identifier, &tags)?;
            println!("removed {removed}");
        }
        Commands::Tags { identifier } => {
            let service = TagService::new(SqliteElementRepository::try_new(conn)?);
            print_lines(service.tags(&identifier)?);
        }
        Commands::Describe { identifier } => match Scanner::default().describe(&identifier) {
            Some(description) => {
                println!("types: {}", description.data_types.join(", "));
                println!("label: {}", description.label.unwrap_or_default());
                println!("icon: {}", description.icon.unwrap_or_default());
                println!("mandatory tags: {}", description.mandatory_tags.join(", "));
            }
            None => println!("no element plugin represents {identifier}"),
        },
        Commands::Find { terms, limit } => {
            let service = TagService::new(SqliteElementRepository::try_new(conn)?);
            let elements = service.find(&terms, limit)?;
            print_lines(elements.into_iter().map(|element| element.identifier));
        }
        Commands::Remove { identifier } => {
            let mut service = TagService::new(SqliteElementRepository::try_new(conn)?);
            if !service.remove(&identifier)? {
                println!("not found: {identifier}");
            }
        }
        Commands::Scan {
            locations,
            no_recursive,
            no_tags,
            no_cleanup,
        } => {
            let options = ScanOptions {
                locations,
                recursive: !no_recursive,
                mandatory_tags: !no_tags,
                cleanup: !no_cleanup,
            };
            let report = Scanner::default().run(conn, &options, |identifier| {
                println!("{identifier}");
            })?;
            for identifier in &report.removed {
                println!("removed {identifier}");
            }
        }
        Commands::Settings { action } => {
            let service = SettingsService::new(SqliteSettingsRepository::try_new(conn)?);
            match action {
                SettingsAction::Show => {
                    println!("{}", serde_json::to_string_pretty(&service.load()?)?);
                }
                SettingsAction::AddScanLocation { location } => {
                    print_lines(service.add_scan_location(&location)?);
                }
                SettingsAction::RemoveScanLocation { location } => {
                    print_lines(service.remove_scan_location(&location)?);
                }
                SettingsAction::AddSkipRegex { pattern } => {
                    print_lines(service.add_skip_regex(&pattern)?);
                }
                SettingsAction::RemoveSkipRegex { pattern } => {
                    print_lines(service.remove_skip_regex(&pattern)?);
                }
            }
        }
    }
    Ok(())
}

fn print_lines<I, S>(lines: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    for line in lines {
        println!("{}", line.as_ref());
    }
}
