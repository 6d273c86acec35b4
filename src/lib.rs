//! Spotify Bronze Ingestion Library
//!
//! This library fetches paginated search results from the Spotify Web API using the
//! client-credentials OAuth flow, gates the response on a minimal structural contract,
//! and lands the raw payload immutably into a partitioned, append-only "bronze" layout
//! with checksum and manifest sidecars.
//!
//! # Modules
//!
//! - `bronze` - Raw landing writer and storage backends (local path or mounted volume)
//! - `cli` - Command-line interface implementations
//! - `config` - Configuration management and environment variables
//! - `error` - Error taxonomy shared by every stage
//! - `pipeline` - Wiring of token cache, fetcher, validator and lander
//! - `schema` - Structural validation of search responses
//! - `spotify` - Token cache, search fetcher, retry policy and HTTP transport
//! - `types` - Data structures and type definitions
//! - `utils` - Utility functions and helpers
//!
//! # Control flow
//!
//! ```text
//! TokenCache -> ApiFetcher -> ResponseValidator -> RawLander
//! ```
//!
//! `RawLander` has no dependency on the API and can be used on its own.

pub mod bronze;
pub mod cli;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod schema;
pub mod spotify;
pub mod types;
pub mod utils;

pub use error::IngestError;

/// A convenient Result type alias for operations that may fail.
///
/// Every stage of the pipeline reports failures through [`IngestError`], so
/// callers can match on the taxonomy instead of inspecting strings.
///
/// # Example
///
/// ```
/// use sporlbronze::Res;
///
/// fn fetch_data() -> Res<String> {
///     Ok("data".to_string())
/// }
/// ```
pub type Res<T> = std::result::Result<T, IngestError>;

/// Prints an informational message with a blue bullet point.
///
/// # Example
///
/// ```
/// info!("Landing {} page(s)...", count);
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success message with a green checkmark.
///
/// # Example
///
/// ```
/// success!("Landed {} page(s)", count);
/// ```
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark and exits the program.
///
/// Used for fatal errors: the run halts and partial writes that were already
/// committed stay where they are.
///
/// # Example
///
/// ```
/// error!("Ingest failed: {}", e);
/// // Program exits here - code after this will not execute
/// ```
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a warning message with a yellow exclamation mark.
///
/// # Example
///
/// ```
/// warning!("Data file already present, kept existing content");
/// ```
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}
