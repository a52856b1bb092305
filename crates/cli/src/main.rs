//! `gcj`: command line front end for the gCode journal.
//!
//! ```bash
//! gcj list filament
//! gcj add customer "Ada Lovelace"
//! gcj add filament --cost 19.95 --manufacturer Prusa --colour "Galaxy Black" --type PLA
//! gcj add project --cost 27.50 --customer Ada --design Benchy --filament 1 --filament 3
//! gcj edit colour --id 18 "Deep Teal"
//! gcj delete colour 18
//! ```

mod commands;
mod config;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use tracing::debug;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use gcj_core::EntityKind;
use gcj_engine::Journal;
use gcj_storage::SqliteStorage;

use crate::config::Config;

#[derive(Parser)]
#[command(name = "gcj")]
#[command(version)]
#[command(about = "Journal of 3D printing projects, filaments and customers")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (default: $GCJ_CONFIG, then ./gcj.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database file, overriding the configured one
    #[arg(long, global = true)]
    db: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List every row of a kind
    List {
        #[arg(value_enum)]
        kind: Kind,
    },

    /// Add a row, reusing an existing one with the same name
    Add {
        #[command(subcommand)]
        record: Record,
    },

    /// Overwrite an existing row in place
    Edit {
        /// Id of the row to overwrite
        #[arg(long, global = true)]
        id: Option<i64>,

        #[command(subcommand)]
        record: Record,
    },

    /// Delete a row nothing else refers to
    Delete {
        #[arg(value_enum)]
        kind: Kind,
        id: i64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Kind {
    Customer,
    Manufacturer,
    Colour,
    Type,
    Filament,
    Design,
    Project,
}

impl From<Kind> for EntityKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Customer => EntityKind::Customer,
            Kind::Manufacturer => EntityKind::Manufacturer,
            Kind::Colour => EntityKind::FilamentColour,
            Kind::Type => EntityKind::FilamentType,
            Kind::Filament => EntityKind::Filament,
            Kind::Design => EntityKind::ModelDesign,
            Kind::Project => EntityKind::PrintingProject,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Record {
    Customer {
        name: String,
    },
    Manufacturer {
        name: String,
    },
    Colour {
        description: String,
    },
    Type {
        description: String,
    },
    Design {
        description: String,
        #[arg(long)]
        length: Decimal,
        #[arg(long)]
        summary: String,
        #[arg(long)]
        url: Option<String>,
    },
    Filament {
        /// Cost per kilogram
        #[arg(long, allow_negative_numbers = true)]
        cost: Decimal,
        #[arg(long)]
        manufacturer: String,
        #[arg(long)]
        colour: String,
        #[arg(long = "type")]
        filament_type: String,
        #[arg(long)]
        product_id: Option<String>,
        #[arg(long)]
        reorder_link: Option<String>,
    },
    Project {
        #[arg(long, allow_negative_numbers = true)]
        cost: Decimal,
        #[arg(long)]
        customer: String,
        /// Design id or description of an existing design
        #[arg(long)]
        design: String,
        /// Filament id; repeat for each filament used
        #[arg(long = "filament")]
        filaments: Vec<i64>,
        /// Submission date, YYYY-MM-DD (default: now)
        #[arg(long)]
        submitted: Option<NaiveDate>,
        /// Completion date, YYYY-MM-DD
        #[arg(long)]
        completed: Option<NaiveDate>,
    },
}

// ============================================================================
// MAIN
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    init_tracing(&config.log_filter);

    let path = cli.db.unwrap_or_else(|| config.database_path());
    debug!(path = %path.display(), "opening journal");
    let mut store = SqliteStorage::open(&path)?;
    if config.seed_reference_data {
        store.seed_reference_data()?;
    }
    let mut journal = Journal::new(store);

    let message = match cli.command {
        Commands::List { kind } => commands::list(&journal, kind.into())?,
        Commands::Add { record } => commands::add(&mut journal, record)?,
        Commands::Edit { id, record } => {
            let id = id.ok_or_else(|| anyhow::anyhow!("edit needs --id"))?;
            commands::edit(&mut journal, id, record)?
        }
        Commands::Delete { kind, id } => commands::delete(&mut journal, kind.into(), id)?,
    };
    println!("{message}");
    Ok(())
}

fn init_tracing(default_filter: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
