//! Report comparison tool.
//!
//! Lines up two session reports by method and prints memory and per-query time
//! deltas, plus any change in validation status.
//!
//! Usage: `cargo run --bin bench-compare -- <baseline.json> <candidate.json>`

use std::collections::HashMap;
use std::path::Path;

use shortest_paths_benchmarks::recorder::load_report;
use shortest_paths_benchmarks::schema::{BenchmarkReport, MethodMetrics, MethodResult};
use shortest_paths_benchmarks::Method;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        eprintln!("Usage: {} <baseline.json> <candidate.json>", args[0]);
        std::process::exit(1);
    }

    let baseline = load(&args[1]);
    let candidate = load(&args[2]);

    let base_map: HashMap<Method, &MethodResult> =
        baseline.results.iter().map(|r| (r.method, r)).collect();

    eprintln!(
        "Baseline:  {} ({}, {} queries, {} runs)",
        args[1],
        baseline.metadata.timestamp,
        baseline.session.query_count,
        baseline.session.runs
    );
    eprintln!(
        "Candidate: {} ({}, {} queries, {} runs)",
        args[2],
        candidate.metadata.timestamp,
        candidate.session.query_count,
        candidate.session.runs
    );
    if baseline.session.instance != candidate.session.instance {
        eprintln!(
            "Note: instances differ ({} vs {})",
            baseline.session.instance, candidate.session.instance
        );
    }
    eprintln!();

    println!(
        "{:<10} | {:>10} | {:>10} | {:>16} | {:>10} | {:>10} | {:>16}",
        "Method", "Base MiB", "New MiB", "Memory delta", "Base us", "New us", "Time delta"
    );
    println!("{}", "-".repeat(100));

    let mut matched = 0u32;
    let mut only_cand = 0u32;
    for cand in &candidate.results {
        match base_map.get(&cand.method) {
            Some(base) => {
                matched += 1;
                print_comparison(&cand.label, &base.metrics, &cand.metrics);
            }
            None => only_cand += 1,
        }
    }
    let only_base = baseline
        .results
        .iter()
        .filter(|b| !candidate.results.iter().any(|c| c.method == b.method))
        .count();

    println!("{}", "-".repeat(100));
    println!(
        "Compared: {} | Baseline only: {} | Candidate only: {}",
        matched, only_base, only_cand
    );
}

fn load(path: &str) -> BenchmarkReport {
    load_report(Path::new(path)).unwrap_or_else(|e| {
        eprintln!("Error loading {}: {}", path, e);
        std::process::exit(1);
    })
}

fn print_comparison(label: &str, base: &MethodMetrics, cand: &MethodMetrics) {
    println!(
        "{:<10} | {:>10.2} | {:>10.2} | {:>16} | {:>10.3} | {:>10.3} | {:>16}",
        label,
        base.memory_mib,
        cand.memory_mib,
        delta(base.memory_mib, cand.memory_mib, "smaller", "larger"),
        base.time_per_query_us,
        cand.time_per_query_us,
        delta(base.time_per_query_us, cand.time_per_query_us, "faster", "slower"),
    );
    if base.validation != cand.validation {
        println!(
            "{:<10}   validation changed: {} -> {}",
            "", base.validation, cand.validation
        );
    }
}

/// Relative change with a hint; lower is better for both memory and time.
fn delta(base: f64, cand: f64, better: &str, worse: &str) -> String {
    let pct = if base > 0.0 {
        ((cand - base) / base) * 100.0
    } else {
        0.0
    };
    let hint = if pct < -1.0 {
        better
    } else if pct > 1.0 {
        worse
    } else {
        "~same"
    };
    format!("{:+.1}% ({})", pct, hint)
}
