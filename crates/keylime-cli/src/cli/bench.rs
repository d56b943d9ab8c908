//! Benchmark fixtures and timing.
//!
//! Each fixture builds the same four-field post (`title`, `tags`, `draft`,
//! `date`) so the numbers compare construction strategies, not payloads.

use std::hint::black_box;
use std::time::Instant;

use anyhow::Result;
use chrono::{DateTime, Utc};
use keylime::{AttributeEntry, Keylime, Listener, Model, ObjectRef, Value};
use serde::Serialize;
use tracing::info;

use super::setup::Suite;

#[derive(Debug, Clone, Serialize)]
pub struct BenchResult {
    pub suite: &'static str,
    pub name: &'static str,
    pub iterations: u64,
    pub ns_per_op: f64,
    pub ops_per_sec: f64,
}

pub fn run(keylime: &Keylime, suite: Suite, iterations: u64) -> Result<Vec<BenchResult>> {
    let mut results = Vec::new();
    if suite.includes(Suite::New) {
        results.extend(new_suite(keylime, iterations)?);
    }
    if suite.includes(Suite::Init) {
        results.extend(init_suite(keylime, iterations)?);
    }
    Ok(results)
}

fn new_suite(keylime: &Keylime, iterations: u64) -> Result<Vec<BenchResult>> {
    const SUITE: &str = "new";
    info!(suite = SUITE, iterations, "running suite");

    let overrides = Value::object([("title", "New Post")]);
    let keylime_post = post_model(keylime, "KeylimePost")?;
    let hybrid_post = hybrid_model(keylime)?;

    Ok(vec![
        measure(SUITE, "bare post", iterations, || {
            black_box(BarePost::new(Some("New Post")));
            Ok(())
        })?,
        measure(SUITE, "plain constructor", iterations, || {
            black_box(plain_post(Some(&overrides)));
            Ok(())
        })?,
        measure(SUITE, "keylime", iterations, || {
            black_box(keylime_post.create(std::slice::from_ref(&overrides))?);
            Ok(())
        })?,
        measure(SUITE, "hybrid", iterations, || {
            black_box(hybrid_post.create(&[Value::from("New Post")])?);
            Ok(())
        })?,
    ])
}

fn init_suite(keylime: &Keylime, iterations: u64) -> Result<Vec<BenchResult>> {
    const SUITE: &str = "init";
    info!(suite = SUITE, iterations, "running suite");

    let cases = [
        ("with 0 init handlers", 0),
        ("with 1 init handler", 1),
        ("with 3 init handlers", 3),
    ];
    let mut results = Vec::with_capacity(cases.len());
    for (name, handlers) in cases {
        let model = keylime.create_named("Post")?;
        model.attr("name", "")?;
        for _ in 0..handlers {
            model.on("init", Listener::init(|_, _| Ok(())))?;
        }
        results.push(measure(SUITE, name, iterations, || {
            black_box(model.create(&[])?);
            Ok(())
        })?);
    }
    Ok(results)
}

fn measure<F>(suite: &'static str, name: &'static str, iterations: u64, mut f: F) -> Result<BenchResult>
where
    F: FnMut() -> Result<()>,
{
    let start = Instant::now();
    for _ in 0..iterations {
        f()?;
    }
    let elapsed = start.elapsed().as_nanos() as f64;
    let ns_per_op = elapsed / iterations.max(1) as f64;
    let ops_per_sec = if ns_per_op > 0.0 { 1e9 / ns_per_op } else { 0.0 };

    Ok(BenchResult {
        suite,
        name,
        iterations,
        ns_per_op,
        ops_per_sec,
    })
}

/// The sample post model shared by `demo` and the benchmarks.
pub fn post_model(keylime: &Keylime, name: &str) -> Result<Model> {
    let model = keylime.create_named(name)?;
    model
        .attr("draft", true)?
        .attr("title", "")?
        .attr("tags", Value::array(Vec::<Value>::new()))?
        .attr("date", Value::function(|| Value::from(Utc::now())))?;
    Ok(model)
}

/// A model with its own body: `create(title, overrides)`.
fn hybrid_model(keylime: &Keylime) -> Result<Model> {
    let model = keylime.adapt(
        "HybridPost",
        |model, instance, args| {
            model.init(instance, args.get(1), args)?;
            if let Some(title) = args.first() {
                instance.set("title", title.clone());
            }
            Ok(())
        },
        vec![
            AttributeEntry::new("title", ""),
            AttributeEntry::new("draft", true),
            AttributeEntry::new("tags", Value::array(Vec::<Value>::new())),
            AttributeEntry::new("date", Value::function(|| Value::from(Utc::now()))),
        ],
    )?;
    Ok(model)
}

// Only ever built, never read.
#[allow(dead_code)]
struct BarePost {
    title: String,
    tags: Vec<String>,
    draft: bool,
    date: DateTime<Utc>,
}

impl BarePost {
    fn new(title: Option<&str>) -> Self {
        Self {
            title: title.unwrap_or_default().to_string(),
            tags: Vec::new(),
            draft: true,
            date: Utc::now(),
        }
    }
}

/// A constructor driven by a plain attribute table, no descriptor.
fn plain_post(params: Option<&Value>) -> ObjectRef {
    let params = params.and_then(Value::as_object);
    let defaults: [(&str, Value); 4] = [
        ("title", Value::from("")),
        ("tags", Value::array(Vec::<Value>::new())),
        ("draft", Value::from(true)),
        ("date", Value::function(|| Value::from(Utc::now()))),
    ];

    let post = ObjectRef::new();
    for (name, default) in defaults {
        let value = params.and_then(|p| p.get(name)).unwrap_or(default);
        let value = match value {
            Value::Function(f) => f.call(),
            other => other,
        };
        post.set(name, value);
    }
    post
}
