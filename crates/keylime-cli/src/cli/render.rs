//! Output formatting.
//!
//! Everything here returns strings; printing is left to the command handlers.

use anyhow::Result;
use console::style;
use serde::Serialize;

use super::bench::BenchResult;

pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Render results as an aligned table, one section per suite.
pub fn bench_table(results: &[BenchResult]) -> String {
    let width = results.iter().map(|r| r.name.len()).max().unwrap_or(0).max(4);
    let mut out = String::new();
    let mut current_suite = None;

    for result in results {
        if current_suite != Some(result.suite) {
            if current_suite.is_some() {
                out.push('\n');
            }
            out.push_str(&format!("{}\n", style(format!("suite: {}", result.suite)).bold()));
            out.push_str(&format!(
                "  {:<width$}  {:>12}  {:>12}  {:>14}\n",
                "name",
                "iterations",
                "ns/op",
                "ops/sec",
                width = width
            ));
            current_suite = Some(result.suite);
        }
        out.push_str(&format!(
            "  {:<width$}  {:>12}  {:>12.1}  {:>14}\n",
            result.name,
            result.iterations,
            result.ns_per_op,
            style(format!("{:.0}", result.ops_per_sec)).green(),
            width = width
        ));
    }
    out
}
