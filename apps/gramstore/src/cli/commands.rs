//! # CLI Command Implementations

use super::{AppConfig, Output};
use gramstore_core::{GramError, Model, ModelConfig};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::Path;
use tracing::info;

// =============================================================================
// CORPUS FORMAT
// =============================================================================

/// Marker prepended to every training sequence.
pub const SENTENCE_START: &str = "<S>";

/// Marker appended to every training sequence.
pub const SENTENCE_END: &str = "</S>";

/// Maximum corpus file size for `train` (1 GiB).
const MAX_CORPUS_FILE_SIZE: u64 = 1024 * 1024 * 1024;

/// Split a corpus line on whitespace, optionally wrapping it in sentence
/// markers. Blank lines yield no tokens.
pub fn tokenize(line: &str, markers: bool) -> Vec<String> {
    let words = line.split_whitespace().map(str::to_string);
    let mut tokens: Vec<String> = Vec::new();
    if markers {
        tokens.push(SENTENCE_START.to_string());
    }
    tokens.extend(words);
    if tokens.len() == usize::from(markers) {
        return Vec::new();
    }
    if markers {
        tokens.push(SENTENCE_END.to_string());
    }
    tokens
}

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), GramError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| GramError::Io(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(GramError::Io(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

fn print_json(value: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

fn open_model(config: &AppConfig) -> Result<Model, GramError> {
    Model::open_with(&config.database, config.model.clone())
}

/// Open a model that must already exist; queries never create one.
fn open_existing_model(config: &AppConfig) -> Result<Model, GramError> {
    if !config.database.exists() {
        return Err(GramError::Io(format!(
            "Database {} does not exist. Run `gramstore init` or `gramstore train` first.",
            config.database.display()
        )));
    }
    open_model(config)
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Create a new model database.
pub fn cmd_init(
    config: &AppConfig,
    orders: Option<Vec<u8>>,
    force: bool,
    output: Output,
) -> Result<(), GramError> {
    let model_config = match orders {
        Some(orders) => ModelConfig {
            orders,
            ..config.model.clone()
        },
        None => config.model.clone(),
    }
    .validate()?;

    let path = &config.database;
    if path.exists() {
        if !force {
            return Err(GramError::InvalidConfig(format!(
                "Database {} already exists. Use --force to overwrite.",
                path.display()
            )));
        }
        std::fs::remove_file(path)
            .map_err(|e| GramError::Io(format!("Cannot remove {}: {}", path.display(), e)))?;
        info!(database = %path.display(), "removed existing database");
    }

    let model = Model::open_with(path, model_config)?;

    if output.json {
        print_json(&serde_json::json!({
            "database": path.to_string_lossy(),
            "orders": model.orders(),
        }));
    } else if !output.quiet {
        println!(
            "Initialized model at {} with orders {:?}",
            path.display(),
            model.orders()
        );
    }
    model.close()
}

// =============================================================================
// TRAIN COMMAND
// =============================================================================

/// Train on a corpus file, one sequence per line.
pub fn cmd_train(
    config: &AppConfig,
    file: &Path,
    markers: bool,
    save_threshold: Option<usize>,
    output: Output,
) -> Result<(), GramError> {
    validate_file_size(file, MAX_CORPUS_FILE_SIZE)?;
    let text = std::fs::read_to_string(file)
        .map_err(|e| GramError::Io(format!("Cannot read {}: {}", file.display(), e)))?;

    let mut model = open_model(config)?;
    if let Some(threshold) = save_threshold {
        model.set_save_threshold(threshold)?;
    }

    let before = model.vocabulary_size();
    let sequences = model.train_many(
        text.lines()
            .map(|line| tokenize(line, markers))
            .filter(|tokens| !tokens.is_empty()),
    )?;
    let vocabulary = model.vocabulary_size();
    info!(sequences, file = %file.display(), "training complete");

    if output.json {
        print_json(&serde_json::json!({
            "sequences": sequences,
            "new_tokens": vocabulary.saturating_sub(before),
            "vocabulary_size": vocabulary,
        }));
    } else if !output.quiet {
        println!(
            "Trained {} sequences ({} new tokens, vocabulary {})",
            sequences,
            vocabulary.saturating_sub(before),
            vocabulary
        );
    }
    model.close()
}

// =============================================================================
// QUERY COMMANDS
// =============================================================================

/// Print the observed count of an n-gram.
pub fn cmd_count(config: &AppConfig, ngram: &[String], output: Output) -> Result<(), GramError> {
    let model = open_existing_model(config)?;
    let count = model.ngram_count(ngram)?;

    if output.json {
        print_json(&serde_json::json!({ "ngram": ngram, "count": count }));
    } else {
        println!("{}", count);
    }
    Ok(())
}

/// Print `prob` (or `logprob`) of `token` following `context`.
pub fn cmd_prob(
    config: &AppConfig,
    token: &str,
    context: &[String],
    log: bool,
    output: Output,
) -> Result<(), GramError> {
    let model = open_existing_model(config)?;
    let value = if log {
        model.logprob(token, context)?
    } else {
        model.prob(token, context)?
    };

    if output.json {
        let key = if log { "logprob" } else { "prob" };
        print_json(&serde_json::json!({
            "token": token,
            "context": context,
            key: value,
        }));
    } else {
        println!("{}", value);
    }
    Ok(())
}

// =============================================================================
// GENERATE COMMAND
// =============================================================================

/// Sample tokens after `context` until the end marker, a dead end, or `max`
/// tokens.
pub fn generate(
    model: &Model,
    context: Vec<String>,
    max: usize,
    rng: &mut StdRng,
) -> Result<Vec<String>, GramError> {
    let mut sequence = if context.is_empty() {
        vec![SENTENCE_START.to_string()]
    } else {
        context
    };
    let start = sequence.len();

    for _ in 0..max {
        let Some(window) = widest_tracked_window(model.orders(), sequence.len()) else {
            break;
        };
        let context = &sequence[sequence.len().saturating_sub(window)..];
        match model.choose_random_word_with(context, rng) {
            Ok(word) if word == SENTENCE_END => break,
            Ok(word) => {
                let word = word.to_string();
                sequence.push(word);
            }
            Err(GramError::NoContinuation) => break,
            Err(e) => return Err(e),
        }
    }

    Ok(sequence.split_off(start))
}

/// Longest context length `k <= available` such that order `k + 1` is
/// tracked.
fn widest_tracked_window(orders: &[u8], available: usize) -> Option<usize> {
    orders
        .iter()
        .map(|&order| usize::from(order).saturating_sub(1))
        .filter(|&window| window <= available)
        .max()
}

/// Sample a sequence and print it.
pub fn cmd_generate(
    config: &AppConfig,
    context: Vec<String>,
    max: usize,
    seed: Option<u64>,
    output: Output,
) -> Result<(), GramError> {
    let model = open_existing_model(config)?;
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let tokens = generate(&model, context, max, &mut rng)?;

    if output.json {
        print_json(&serde_json::json!({ "tokens": tokens, "seed": seed }));
    } else {
        println!("{}", tokens.join(" "));
    }
    Ok(())
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show model settings and vocabulary size.
pub fn cmd_status(config: &AppConfig, output: Output) -> Result<(), GramError> {
    let model = open_existing_model(config)?;

    if output.json {
        print_json(&serde_json::json!({
            "database": config.database.to_string_lossy(),
            "orders": model.orders(),
            "vocabulary_size": model.vocabulary_size(),
            "save_threshold": model.save_threshold(),
        }));
        return Ok(());
    }

    println!("gramstore Model Status");
    println!("======================");
    println!("Database:       {}", config.database.display());
    println!("Orders:         {:?}", model.orders());
    println!("Vocabulary:     {}", model.vocabulary_size());
    println!("Save threshold: {}", model.save_threshold());
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
