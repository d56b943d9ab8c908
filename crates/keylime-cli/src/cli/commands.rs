use anyhow::{Context, Result};
use clap::Parser;
use keylime::{Keylime, KeylimeConfig, Listener, Registry, Value};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use super::bench;
use super::render;
use super::setup::{Cli, Commands, Suite};

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = KeylimeConfig::load(cli.config.as_deref()).with_context(|| match &cli.config {
        Some(path) => format!("failed to load settings from {}", path.display()),
        None => "failed to load settings".to_string(),
    })?;
    debug!(?config, "settings loaded");
    let keylime = Keylime::new(Registry::global(), config);

    match cli.command {
        Commands::Bench {
            iterations,
            suite,
            json,
        } => handle_bench(&keylime, suite, iterations, json),
        Commands::Demo { title } => handle_demo(&keylime, &title),
    }
}

/// Logs go to stderr so `--json` output stays machine readable.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_bench(keylime: &Keylime, suite: Suite, iterations: u64, json: bool) -> Result<()> {
    let results = bench::run(keylime, suite, iterations)?;
    info!(benchmarks = results.len(), "benchmarks finished");
    if json {
        println!("{}", render::to_json(&results)?);
    } else {
        print!("{}", render::bench_table(&results));
    }
    Ok(())
}

fn handle_demo(keylime: &Keylime, title: &str) -> Result<()> {
    let post = bench::post_model(keylime, "Post")?;
    post.on(
        "attr",
        Listener::attr("title", |value, _, _| {
            Ok(match value.as_str() {
                Some(s) => Value::from(s.trim()),
                None => value,
            })
        }),
    )?;

    let instance = post.create(&[Value::object([("title", title)])])?;
    info!(model = %post, "demo instance created");
    println!("{}", render::to_json(&instance.to_json())?);
    Ok(())
}
