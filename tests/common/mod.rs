//! Shared test utilities: fixture files and shell scripts standing in for the
//! external preprocessor and query executable. The scripts are POSIX shell,
//! so only Unix test targets use them.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use shortest_paths_benchmarks::config::{HarnessConfig, MethodSpec};
use shortest_paths_benchmarks::trial::TrialResult;
use shortest_paths_benchmarks::Method;
use tempfile::TempDir;

// =============================================================================
// Serialisation of process-spawning tests
// =============================================================================

static PROCESS_LOCK: Mutex<()> = Mutex::new(());

/// Held by every test that writes and then executes a script. A script still
/// open for writing in one thread while another thread forks cannot be
/// executed ("text file busy"), so these tests must not overlap.
pub fn process_lock() -> MutexGuard<'static, ()> {
    PROCESS_LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

// =============================================================================
// Scripts
// =============================================================================

pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}", body)).expect("failed to write script");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).expect("failed to chmod script");
    }
    path
}

/// Shell snippet for a well-behaved trial: writes the measurement file and
/// the distance output.
pub fn ok_case(time: &str, mem: &str, distances: &[u64]) -> String {
    let mut body = format!("echo {} > benchmark.txt\necho {} >> benchmark.txt\n", time, mem);
    body.push_str("{ echo header;");
    for d in distances {
        body.push_str(&format!(" echo {};", d));
    }
    body.push_str(" } > \"$out\"\n");
    body
}

/// Query executable dispatching on `-m`. Each case is a shell snippet that
/// can refer to `$out`. Every call appends `<cwd> <args>` to `calls.log`.
pub fn benchmark_script(dir: &Path, cases: &[(&str, String)]) -> PathBuf {
    let log = dir.join("calls.log");
    let mut arms = String::new();
    for (method, body) in cases {
        arms.push_str(&format!("  {})\n{}    ;;\n", method, body));
    }
    let body = format!(
        r#"echo "$(pwd) $*" >> "{log}"
method=""
out=""
while [ $# -gt 0 ]; do
  case "$1" in
    -m) method="$2"; shift 2 ;;
    --output-path) out="$2"; shift 2 ;;
    *) shift ;;
  esac
done
case "$method" in
{arms}  *) echo "Invalid method '$method' for the Benchmark command."; exit 1 ;;
esac
"#,
        log = log.display(),
        arms = arms,
    );
    write_script(dir, "benchmark", &body)
}

/// Preprocessor writing `<-o>.<extension>` for every accelerated method.
/// Calls are appended to `preprocess.log`.
pub fn preprocessor_script(dir: &Path) -> PathBuf {
    let log = dir.join("preprocess.log");
    let body = format!(
        r#"echo "$*" >> "{log}"
method=""
out=""
fmt=""
while [ $# -gt 0 ]; do
  case "$1" in
    -m) method="$2"; shift 2 ;;
    -o) out="$2"; shift 2 ;;
    --output-format) fmt="$2"; shift 2 ;;
    *) shift ;;
  esac
done
case "$method" in
  ch) ext=ch ;;
  tnr) ext=tnrg ;;
  tnraf) ext=tgaf ;;
  dm) if [ "$fmt" = hdf ]; then ext=hdf5; else ext="$fmt"; fi ;;
  *) echo "Invalid method name '$method'."; exit 1 ;;
esac
echo structure > "$out.$ext"
"#,
        log = log.display(),
    );
    write_script(dir, "preprocessor", &body)
}

pub fn read_log(dir: &Path, name: &str) -> Vec<String> {
    std::fs::read_to_string(dir.join(name))
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

// =============================================================================
// Fixtures
// =============================================================================

pub const DISTANCES: [u64; 3] = [120, 340, 75];

/// Temporary directory holding a graph input directory and a three-query set.
pub struct Fixture {
    pub dir: TempDir,
    pub graph: PathBuf,
    pub queries: PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let graph = dir.path().join("graph");
        std::fs::create_dir(&graph).unwrap();
        let queries = dir.path().join("queries.txt");
        std::fs::write(&queries, "3\n0 5\n2 9\n7 1\n").unwrap();
        Self {
            dir,
            graph,
            queries,
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn config(&self, benchmark: PathBuf, preprocessor: PathBuf, methods: &[Method]) -> HarnessConfig {
        HarnessConfig {
            instance: "TEST".to_string(),
            preprocessor,
            benchmark,
            graph_input: self.graph.clone(),
            query_set: self.queries.clone(),
            mapping_file: None,
            runs: 2,
            reference: Method::Dijkstra,
            timeout_secs: Some(30),
            session_deadline_secs: None,
            build_structures: true,
            output_dir: self.path().join("results"),
            methods: methods.iter().map(|m| method_spec(*m)).collect(),
        }
    }
}

/// A spec with every parameter its method requires.
pub fn method_spec(method: Method) -> MethodSpec {
    use shortest_paths_benchmarks::method::{OutputFormat, PreprocessingMode};
    match method {
        Method::Tnr | Method::Tnraf => MethodSpec::new(method)
            .with_mode(PreprocessingMode::Slow)
            .with_tnodes(50)
            .with_int_size(16),
        Method::Dm => MethodSpec::new(method)
            .with_mode(PreprocessingMode::Fast)
            .with_output_format(OutputFormat::Hdf)
            .with_int_size(16),
        _ => MethodSpec::new(method),
    }
}

pub fn trial(elapsed_secs: f64, peak_memory_kb: u64, distances: &[u64]) -> TrialResult {
    TrialResult::new(elapsed_secs, peak_memory_kb, distances.to_vec())
}

pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
}
