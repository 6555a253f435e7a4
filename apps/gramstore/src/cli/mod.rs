//! # gramstore CLI Module
//!
//! ## Available Commands
//!
//! - `init` - Create a new model database
//! - `train` - Train on a text corpus, one sequence per line
//! - `count` - Show how often an n-gram was observed
//! - `prob` / `logprob` - Conditional probability of a token after a context
//! - `generate` - Sample a sequence from the model
//! - `status` - Show model settings and vocabulary size

mod commands;
mod config;

use clap::{Parser, Subcommand};
use gramstore_core::GramError;
use std::path::PathBuf;

pub use commands::*;
pub use config::{AppConfig, load_config};

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// gramstore - persistent n-gram language model
///
/// Counts n-grams from token sequences into an on-disk store and answers
/// frequency, probability and sampling queries.
#[derive(Parser, Debug)]
#[command(name = "gramstore")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Suppress informational output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the model database (overrides the config file)
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new model database
    Init {
        /// N-gram orders to track, comma-separated (e.g. 3,2,1)
        #[arg(long, value_delimiter = ',')]
        orders: Option<Vec<u8>>,

        /// Overwrite an existing database
        #[arg(short, long)]
        force: bool,
    },

    /// Train on a corpus file
    Train {
        /// Path to the corpus (one whitespace-tokenized sequence per line)
        #[arg(short, long)]
        file: PathBuf,

        /// Do not wrap sequences in <S> ... </S> markers
        #[arg(long)]
        no_markers: bool,

        /// Pending count entries allowed before an intermediate flush
        #[arg(long)]
        save_threshold: Option<usize>,
    },

    /// Show the observed count of an n-gram
    Count {
        /// Tokens of the n-gram
        #[arg(required = true)]
        ngram: Vec<String>,
    },

    /// Probability of TOKEN following CONTEXT
    Prob {
        /// Predicted token
        token: String,

        /// Preceding tokens
        #[arg(required = true)]
        context: Vec<String>,
    },

    /// Negative natural log of the probability of TOKEN following CONTEXT
    Logprob {
        /// Predicted token
        token: String,

        /// Preceding tokens
        #[arg(required = true)]
        context: Vec<String>,
    },

    /// Sample a sequence from the model
    Generate {
        /// Starting tokens (defaults to the <S> marker)
        context: Vec<String>,

        /// Maximum number of tokens to generate
        #[arg(short = 'n', long, default_value = "20")]
        max: usize,

        /// Seed for reproducible output
        #[arg(short, long)]
        seed: Option<u64>,
    },

    /// Show model status
    Status,
}

// =============================================================================
// COMMAND DISPATCH
// =============================================================================

/// Execute the CLI command.
pub fn execute(cli: Cli) -> Result<(), GramError> {
    let mut config = load_config(cli.config.as_deref())?;
    if let Some(database) = cli.database {
        config.database = database;
    }
    let output = Output {
        json: cli.json_mode,
        quiet: cli.quiet,
    };

    match cli.command {
        Some(Commands::Init { orders, force }) => cmd_init(&config, orders, force, output),
        Some(Commands::Train {
            file,
            no_markers,
            save_threshold,
        }) => cmd_train(&config, &file, !no_markers, save_threshold, output),
        Some(Commands::Count { ngram }) => cmd_count(&config, &ngram, output),
        Some(Commands::Prob { token, context }) => {
            cmd_prob(&config, &token, &context, false, output)
        }
        Some(Commands::Logprob { token, context }) => {
            cmd_prob(&config, &token, &context, true, output)
        }
        Some(Commands::Generate { context, max, seed }) => {
            cmd_generate(&config, context, max, seed, output)
        }
        Some(Commands::Status) | None => cmd_status(&config, output),
    }
}

/// Output preferences shared by every command.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    pub json: bool,
    pub quiet: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn init_parses_comma_separated_orders() {
        let cli = Cli::try_parse_from(["gramstore", "init", "--orders", "3,2"]).unwrap();
        match cli.command {
            Some(Commands::Init { orders, force }) => {
                assert_eq!(orders, Some(vec![3, 2]));
                assert!(!force);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["gramstore", "count", "a", "b", "-D", "m.redb", "--json-mode"])
            .unwrap();
        assert_eq!(cli.database, Some(PathBuf::from("m.redb")));
        assert!(cli.json_mode);
        match cli.command {
            Some(Commands::Count { ngram }) => assert_eq!(ngram, vec!["a", "b"]),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn prob_requires_context() {
        assert!(Cli::try_parse_from(["gramstore", "prob", "x"]).is_err());
    }
}
