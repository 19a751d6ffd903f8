//! # Measure CLI Module
//!
//! This module implements the CLI interface for measure.
//!
//! ## Available Commands
//!
//! - `convert` - Convert a quantity to another unit
//! - `absolute` - Convert a point (e.g. a temperature) between scales
//! - `list` - List measures, or the units of one measure

mod commands;

use crate::config::{AppConfig, AppError};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Measure - unit conversion with dimensional analysis
///
/// Quantities are written as `<amount> <unit>`, where the unit may be a
/// composite such as `km/hour` or `kg*m/s2`.
#[derive(Parser, Debug)]
#[command(name = "measure")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to a TOML catalogue configuration
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert a quantity (an interval) to another unit
    Convert {
        /// The quantity, e.g. "3.5 km" or "100 km/hour"
        quantity: String,

        /// Target unit
        #[arg(short, long)]
        to: String,

        /// Measure expression, e.g. "distance/duration" (inferred from the unit otherwise)
        #[arg(short, long)]
        measure: Option<String>,

        /// Decimal format applied to the result, e.g. ".2f"
        #[arg(short, long)]
        format: Option<String>,
    },

    /// Convert a point on a scale, e.g. "25 C" to "F"
    Absolute {
        /// The point, e.g. "25 C"
        quantity: String,

        /// Target unit
        #[arg(short, long)]
        to: String,

        /// Measure name (inferred from the unit otherwise)
        #[arg(short, long)]
        measure: Option<String>,

        /// Decimal format applied to the result, e.g. ".1f"
        #[arg(short, long)]
        format: Option<String>,
    },

    /// List measures, or the units of one measure
    List {
        /// Measure name
        measure: Option<String>,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), AppError> {
    let config = AppConfig::load_or_default(cli.config.as_deref())?;
    let catalogue = config.build_catalogue()?;
    let json_mode = cli.json_mode;

    match cli.command {
        Commands::Convert {
            quantity,
            to,
            measure,
            format,
        } => cmd_convert(
            &catalogue,
            json_mode,
            &quantity,
            &to,
            measure.as_deref(),
            format.as_deref(),
        ),
        Commands::Absolute {
            quantity,
            to,
            measure,
            format,
        } => cmd_absolute(
            &catalogue,
            json_mode,
            &quantity,
            &to,
            measure.as_deref(),
            format.as_deref(),
        ),
        Commands::List { measure } => cmd_list(&catalogue, json_mode, measure.as_deref()),
    }
}
