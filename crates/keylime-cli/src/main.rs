//! # Keylime CLI
//!
//! The `keylime` binary is a small client of the library: a demo that builds
//! the sample `Post` model, and the benchmark harness that compares keylime
//! construction against hand-written constructors.
//!
//! The binary is intentionally thin: the CLI lives in `src/cli/`, while this
//! file only invokes `cli::run()` and handles process termination.
//!
//! ## Workspace Structure
//!
//! - `crates/keylime/`: The library (values, descriptors, models, extensions)
//! - `crates/keylime-cli/`: This CLI tool, depends on the `keylime` library
//!
//! ## Layering
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (crates/keylime-cli/src/cli/)                    │
//! │  - clap argument parsing (setup.rs)                         │
//! │  - Dispatch, config and tracing setup (commands.rs)         │
//! │  - Benchmark suites (bench.rs), output (render.rs)          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Library (crates/keylime/)                                  │
//! │  - Keylime factory, Model surface, Registry                 │
//! │  - No knowledge of stdout/stderr or process exits           │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
