use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Returns the version string, including git hash and commit date for non-release builds.
/// Format for releases: "v0.5.0"
/// Format for dev builds: "v0.5.0\ndev: abc1234 2024-01-15 14:30"
fn get_version() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("GIT_HASH");
    const GIT_COMMIT_DATE: &str = env!("GIT_COMMIT_DATE");
    const IS_RELEASE: &str = env!("IS_RELEASE");

    use std::sync::OnceLock;
    static VERSION_STRING: OnceLock<String> = OnceLock::new();

    VERSION_STRING.get_or_init(|| {
        if IS_RELEASE == "true" || GIT_HASH.is_empty() {
            format!("v{}", VERSION)
        } else {
            format!("v{}\ndev: {} {}", VERSION, GIT_HASH, GIT_COMMIT_DATE)
        }
    })
}

#[derive(Parser, Debug)]
#[command(
    name = "keylime",
    bin_name = "keylime",
    version = get_version(),
    disable_help_subcommand = true
)]
#[command(about = "Demo and benchmark client for keylime models", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Settings file (TOML) for the model factory
    #[arg(short, long, global = true, value_name = "PATH", help_heading = "Options")]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true, help_heading = "Options")]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Time instance creation against hand-written constructors
    Bench {
        /// Instances created per benchmark
        #[arg(short, long, default_value_t = 100_000, value_parser = clap::value_parser!(u64).range(1..))]
        iterations: u64,

        /// Which suite to run
        #[arg(short, long, value_enum, default_value_t = Suite::All)]
        suite: Suite,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Build a sample Post and print it as JSON
    Demo {
        /// Title of the post
        #[arg(short, long, default_value = "Hello from keylime")]
        title: String,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Suite {
    /// Creating instances
    New,
    /// Init handler overhead
    Init,
    /// Every suite
    All,
}

impl Suite {
    pub fn includes(self, other: Suite) -> bool {
        self == Suite::All || self == other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bench_defaults() {
        let cli = Cli::try_parse_from(["keylime", "bench"]).unwrap();
        match cli.command {
            Commands::Bench {
                iterations,
                suite,
                json,
            } => {
                assert_eq!(iterations, 100_000);
                assert_eq!(suite, Suite::All);
                assert!(!json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_bench_rejects_zero_iterations() {
        assert!(Cli::try_parse_from(["keylime", "bench", "--iterations", "0"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["keylime", "demo", "--verbose", "--config", "k.toml"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("k.toml")));
    }

    #[test]
    fn test_suite_includes() {
        assert!(Suite::All.includes(Suite::New));
        assert!(Suite::Init.includes(Suite::Init));
        assert!(!Suite::Init.includes(Suite::New));
    }
}
