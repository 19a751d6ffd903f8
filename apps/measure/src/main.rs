//! # Measure
//!
//! Command-line unit conversion backed by the measure algebra engine.
//!
//! ## Usage
//!
//! ```bash
//! measure convert "3.5 km" --to mile
//! measure convert "100 km/hour" --to "m/s" --format .2f
//! measure absolute "25 C" --to F
//! measure list temperature
//! measure --config units.toml list
//! ```

use clap::Parser;
use measure::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    // MEASURE_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("MEASURE_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "measure=info,measure_core=warn".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}
