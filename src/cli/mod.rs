//! # CLI Module
//!
//! User-facing commands of `sporlbronze`. Each command loads what it needs from
//! the environment, delegates to the library, and reports through the colored
//! console macros. A fatal error prints a red line and exits with status 1;
//! anything already landed stays on disk.
//!
//! ## Commands
//!
//! - [`ingest`] - Fetch search pages, validate them, land them in the bronze layer
//! - [`land`] - Land a JSON file from disk without touching the API
//! - [`validate`] - Run the search-response schema gate over a JSON file
//!
//! ## Usage Patterns
//!
//! ```bash
//! sporlbronze ingest --query videoclub --pages 3
//! sporlbronze ingest --base-dir dbfs:/mnt/bronze --run-id backfill-01 --overwrite
//! sporlbronze land --file page.json --partition q=videoclub --partition type=artist
//! sporlbronze validate --file page.json
//! ```

mod ingest;
mod land;
mod validate;

pub use ingest::ingest;
pub use land::land;
pub use validate::validate;

use tabled::Table;

use crate::types::{LandedPaths, LandedTableRow};

fn print_landed(pages: &[(u32, &LandedPaths)]) {
    let rows: Vec<LandedTableRow> = pages
        .iter()
        .flat_map(|(page, paths)| LandedTableRow::rows(*page, paths))
        .collect();
    println!("{}", Table::new(rows));
}
