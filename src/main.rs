//! # photo-push CLI
//!
//! Command-line interface for the photo ingestion pipeline.
//!
//! ## Usage
//! ```bash
//! photo-push push ~/Photos/inbox ~/Photos/library
//! photo-push push ~/Photos/inbox ~/Photos/library --dry-run --output json
//! ```

mod cli;

use photo_porter::Result;

fn main() -> Result<()> {
    photo_porter::init_tracing();
    cli::run()
}
