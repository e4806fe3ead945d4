//! Runs a benchmark session and writes its comparison table and JSON report.
//!
//! Usage:
//!   `spbench --config session.json`
//!   `spbench --instance DC --data-root ../thesisTestsData [--runs 10]`
//!
//! Options:
//!   `--runs <n>`            trials per method
//!   `--timeout <secs>`      deadline for each external invocation
//!   `--deadline <secs>`     deadline for the whole session
//!   `--preprocessor <path>` / `--benchmark <path>` external executables
//!   `--skip-build`          benchmark existing structures only
//!   `--csv <path>`          comparison table (default `results/benchmark_<instance>.csv`)
//!   `-q`                    warnings only

use std::path::PathBuf;
use std::process::ExitCode;

use shortest_paths_benchmarks::config::HarnessConfig;
use shortest_paths_benchmarks::recorder::ResultRecorder;
use shortest_paths_benchmarks::session::BenchmarkSession;

#[derive(Default)]
struct Args {
    config: Option<PathBuf>,
    instance: Option<String>,
    data_root: Option<PathBuf>,
    preprocessor: Option<PathBuf>,
    benchmark: Option<PathBuf>,
    runs: Option<usize>,
    timeout: Option<u64>,
    deadline: Option<u64>,
    skip_build: bool,
    csv: Option<PathBuf>,
    quiet: bool,
}

fn usage() {
    eprintln!("Usage: spbench --config <session.json> [options]");
    eprintln!("       spbench --instance <name> --data-root <dir> [options]");
    eprintln!();
    eprintln!("Options: --runs <n> --timeout <secs> --deadline <secs> --preprocessor <path>");
    eprintln!("         --benchmark <path> --skip-build --csv <path> -q");
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);

    fn value<T: std::str::FromStr>(flag: &str, v: Option<String>) -> Result<T, String> {
        let v = v.ok_or_else(|| format!("{} needs a value", flag))?;
        v.parse()
            .map_err(|_| format!("invalid value '{}' for {}", v, flag))
    }

    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" => args.config = Some(value(&arg, it.next())?),
            "--instance" => args.instance = Some(value(&arg, it.next())?),
            "--data-root" => args.data_root = Some(value(&arg, it.next())?),
            "--preprocessor" => args.preprocessor = Some(value(&arg, it.next())?),
            "--benchmark" => args.benchmark = Some(value(&arg, it.next())?),
            "--runs" => args.runs = Some(value(&arg, it.next())?),
            "--timeout" => args.timeout = Some(value(&arg, it.next())?),
            "--deadline" => args.deadline = Some(value(&arg, it.next())?),
            "--skip-build" => args.skip_build = true,
            "--csv" => args.csv = Some(value(&arg, it.next())?),
            "-q" => args.quiet = true,
            other => return Err(format!("unknown argument '{}'", other)),
        }
    }
    Ok(args)
}

fn build_config(args: &Args) -> Result<HarnessConfig, String> {
    let mut config = match (&args.config, &args.instance) {
        (Some(path), _) => HarnessConfig::load(path).map_err(|e| e.to_string())?,
        (None, Some(instance)) => {
            let root = args
                .data_root
                .clone()
                .unwrap_or_else(|| PathBuf::from("."));
            HarnessConfig::standard_suite(instance, &root)
        }
        (None, None) => return Err("either --config or --instance is required".into()),
    };

    if let Some(p) = &args.preprocessor {
        config.preprocessor = p.clone();
    }
    if let Some(p) = &args.benchmark {
        config.benchmark = p.clone();
    }
    if let Some(runs) = args.runs {
        config.runs = runs;
    }
    if args.timeout.is_some() {
        config.timeout_secs = args.timeout;
    }
    if args.deadline.is_some() {
        config.session_deadline_secs = args.deadline;
    }
    if args.skip_build {
        config.build_structures = false;
    }
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

fn main() -> ExitCode {
    let args = match parse_args() {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("{}", msg);
            usage();
            return ExitCode::from(2);
        }
    };

    let filter = if args.quiet { "warn" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(msg) => {
            eprintln!("{}", msg);
            return ExitCode::from(2);
        }
    };
    let table_path = args.csv.clone().unwrap_or_else(|| config.table_path());
    let output_dir = config.output_dir.clone();

    let session = match BenchmarkSession::new(config) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(2);
        }
    };

    if !args.quiet {
        eprintln!("=== Shortest-path method comparison: {} ===", session.config().instance);
        eprintln!();
    }

    let (report, abort) = match session.run() {
        Ok(report) => (report, None),
        Err(abort) => (abort.partial, Some(abort.error)),
    };

    // Whatever was collected is written out, aborted or not.
    if !args.quiet {
        eprintln!();
        eprint!("{}", report.table.render());
    }
    if !report.warnings.is_empty() {
        eprintln!();
        for warning in &report.warnings {
            eprintln!("WARNING: {}", warning);
        }
    }

    let mut failed = abort.is_some();
    if let Err(e) = report.table.save_csv(&table_path) {
        eprintln!("Error writing {}: {}", table_path.display(), e);
        failed = true;
    } else if !args.quiet {
        eprintln!("Table saved to {}", table_path.display());
    }

    let mut recorder = ResultRecorder::new(session.info(report.query_count));
    for result in report.method_results() {
        recorder.record(result);
    }
    for warning in &report.warnings {
        recorder.warn(warning.to_string());
    }
    if let Some(error) = &abort {
        eprintln!("Session aborted: {}", error);
        recorder.mark_aborted(error.to_string());
    }
    if let Err(e) = recorder.save(&output_dir) {
        eprintln!("Error writing report: {}", e);
        failed = true;
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
