//! # gramstore
//!
//! Command-line front end for the persistent n-gram model.
//!
//! ## Usage
//!
//! ```bash
//! # Create a model tracking trigrams and bigrams
//! gramstore -D corpus.redb init --orders 3,2
//!
//! # Train on one sentence per line
//! gramstore -D corpus.redb train -f sentences.txt
//!
//! # Query
//! gramstore -D corpus.redb count the cat
//! gramstore -D corpus.redb prob sat the cat
//! gramstore -D corpus.redb generate --seed 7
//! ```

mod cli;

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    // GRAMSTORE_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("GRAMSTORE_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = EnvFilter::try_from_env("GRAMSTORE_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| "gramstore=info,gramstore_core=info".into());

    // Logs go to stderr so command output stays pipeable.
    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
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
