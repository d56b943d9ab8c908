//! # CLI Behavior
//!
//! ### `keylime demo`
//!
//! Builds the sample `Post` model (`draft`, `title`, `tags`, `date`), creates
//! one instance and prints it as pretty JSON. `--title` overrides the title.
//!
//! ### `keylime bench`
//!
//! Times instance creation. Suites:
//!
//! - `new`: a bare struct, a plain attribute-map constructor, a keylime model
//!   and an adapted ("hybrid") keylime model.
//! - `init`: keylime models with 0, 1 and 3 init handlers.
//!
//! Results print as a table, or as JSON with `--json`.
//!
//! ### Global Options
//!
//! - `--config <path>`: TOML settings file for the model factory.
//! - `--verbose`: log at `info` (otherwise `warn`). `RUST_LOG` wins over both.
//!
//! ## Module Structure
//!
//! - `commands`: Entry point and per-command handlers
//! - `bench`: Benchmark fixtures and timing
//! - `render`: Output formatting (table, JSON)
//! - `setup`: Argument parsing via clap

mod bench;
mod commands;
mod render;
pub mod setup;

pub use commands::run;
