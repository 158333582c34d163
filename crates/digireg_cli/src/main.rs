//! Digitization registry CLI
//!
//! Command-line administration of a registry database.
//!
//! # Commands
//!
//! - `bootstrap` - Initialize the identifier sequence (optionally the schema)
//! - `find` - Search records
//! - `state` - Show the digitization state of a record
//! - `set-state` - Move a record to a new state
//! - `add-urn` / `set-urn` - Allocate URN:NBN identifiers
//! - `sequence` - Show the identifier sequence counter

mod commands;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use commands::state::SetStateArgs;
use commands::CliConfig;
use digireg_core::{AllocationMode, DigitizationState, RecordFilter, RecordLocator};
use digireg_service::RecordFormat;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Digitization registry administration tool.
#[derive(Parser)]
#[command(name = "digireg")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the SQLite database file
    #[arg(global = true, short, long)]
    db: Option<PathBuf>,

    /// JSON configuration file
    #[arg(global = true, short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct FilterArgs {
    /// Barcode
    #[arg(long)]
    barcode: Option<String>,
    /// Czech national bibliography number
    #[arg(long)]
    ccnb: Option<String>,
    /// ISBN
    #[arg(long)]
    isbn: Option<String>,
    /// ISSN
    #[arg(long)]
    issn: Option<String>,
    /// Issue date
    #[arg(long)]
    issue_date: Option<String>,
    /// Shelf signature
    #[arg(long)]
    signature: Option<String>,
    /// Title
    #[arg(long)]
    title: Option<String>,
    /// Periodical volume
    #[arg(long)]
    volume: Option<String>,
    /// MARC field 001
    #[arg(long)]
    field001: Option<String>,
}

impl From<FilterArgs> for RecordFilter {
    fn from(args: FilterArgs) -> Self {
        RecordFilter {
            barcode: args.barcode,
            ccnb: args.ccnb,
            isbn: args.isbn,
            issn: args.issn,
            issue_date: args.issue_date,
            signature: args.signature,
            title: args.title,
            volume: args.volume,
            field001: args.field001,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the identifier sequence counter
    Bootstrap {
        /// Create the database file and missing tables first
        #[arg(long)]
        install_schema: bool,
    },

    /// Search records
    Find {
        #[command(flatten)]
        filter: FilterArgs,

        /// Maximum number of records
        #[arg(short, long)]
        limit: Option<i64>,

        /// Descriptor format (MARC_XML, DC_RDF, MODS_33, MODS_34)
        #[arg(long, default_value = "MARC_XML")]
        record_format: RecordFormat,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show the digitization state of a record
    State {
        /// Record id
        #[arg(long, conflicts_with_all = ["ccnb", "barcode"], required_unless_present = "ccnb")]
        id: Option<i64>,
        /// CCNB, together with --barcode
        #[arg(long, requires = "barcode")]
        ccnb: Option<String>,
        /// Barcode, together with --ccnb
        #[arg(long, requires = "ccnb")]
        barcode: Option<String>,
    },

    /// Move a record to a new state
    SetState {
        /// Record id
        #[arg(long)]
        id: i64,
        /// New state (SCHEDULED, IN_PROGRESS, FINISHED)
        #[arg(long = "new")]
        new_state: DigitizationState,
        /// State the record is expected to be in
        #[arg(long = "old")]
        old_state: Option<DigitizationState>,
        /// Digitization operator, required for FINISHED
        #[arg(long)]
        user: Option<String>,
        /// Event date (YYYY-MM-DD), today if omitted
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Add URN:NBN identifiers to a record
    AddUrn {
        /// Record id
        #[arg(long)]
        id: i64,
        /// Award date (YYYY-MM-DD), today if omitted
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Identifiers
        #[arg(required = true)]
        urns: Vec<String>,
    },

    /// Replace the URN:NBN identifiers of a record
    SetUrn {
        /// Record id
        #[arg(long)]
        id: i64,
        /// Award date (YYYY-MM-DD), today if omitted
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Identifiers; none removes all
        urns: Vec<String>,
    },

    /// Show the identifier sequence counter
    Sequence {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Version = cli.command {
        println!("digireg CLI v{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => CliConfig::load(path)?,
        None => CliConfig::default(),
    };
    let storage = config.storage_for(cli.db)?;

    if let Commands::Bootstrap { install_schema } = cli.command {
        return commands::bootstrap::run(&config, storage, install_schema);
    }

    let service = commands::open(&config, storage)?;
    let operator = commands::operator(&config);
    match cli.command {
        Commands::Find {
            filter,
            limit,
            record_format,
            format,
        } => {
            commands::find::run(&service, &filter.into(), record_format, limit, &format)?;
        }
        Commands::State { id, ccnb, barcode } => {
            let locator = match (id, ccnb, barcode) {
                (Some(id), _, _) => RecordLocator::id(id),
                (None, Some(ccnb), Some(barcode)) => RecordLocator::composite(ccnb, barcode),
                _ => return Err("either --id or --ccnb with --barcode is required".into()),
            };
            commands::state::show(&service, locator)?;
        }
        Commands::SetState {
            id,
            new_state,
            old_state,
            user,
            date,
        } => {
            let args = SetStateArgs {
                id,
                new_state,
                old_state,
                user,
                date,
            };
            commands::state::set(&service, &operator, args)?;
        }
        Commands::AddUrn { id, date, urns } => {
            commands::identifiers::run(&service, &operator, AllocationMode::Add, id, date, &urns)?;
        }
        Commands::SetUrn { id, date, urns } => {
            commands::identifiers::run(&service, &operator, AllocationMode::Set, id, date, &urns)?;
        }
        Commands::Sequence { format } => {
            commands::sequence::run(&service, &format)?;
        }
        Commands::Bootstrap { .. } | Commands::Version => {}
    }

    Ok(())
}
