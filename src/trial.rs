//! Trial Runner: one invocation of the query executable for a
//! method / structure / query-set combination.
//!
//! The query executable reports its own measurements through a two-line
//! side-channel file written into its working directory:
//!
//! ```text
//! 0.0231      <- elapsed seconds for the whole query set
//! 48212       <- peak resident memory in kilobytes
//! ```
//!
//! and writes the computed distances, one per query after a single header
//! line, to the path given as `--output-path`. Every trial runs in a fresh,
//! uniquely named temporary directory, so neither file can leak into another
//! trial even when the executable crashes halfway.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use log::{debug, warn};

use crate::config::HarnessConfig;
use crate::error::{HarnessError, Result};
use crate::method::Method;
use crate::process;
use crate::query_set::QuerySet;
use crate::structure::StructureHandle;

/// Name of the measurement file the query executable writes.
pub const SIDECAR_FILE: &str = "benchmark.txt";

/// Contents of the side-channel file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub elapsed_secs: f64,
    pub peak_memory_kb: u64,
}

/// Outcome of a single run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialResult {
    pub elapsed_secs: f64,
    pub peak_memory_kb: u64,
    /// One distance per query, in query-set order.
    pub distances: Vec<u64>,
}

impl TrialResult {
    pub fn new(elapsed_secs: f64, peak_memory_kb: u64, distances: Vec<u64>) -> Self {
        Self {
            elapsed_secs,
            peak_memory_kb,
            distances,
        }
    }
}

// ---------------------------------------------------------------------------
// File parsing
// ---------------------------------------------------------------------------

/// Parse the side-channel file. Anything but exactly two parseable lines
/// (seconds, then kilobytes) is rejected; a final newline is optional, blank
/// lines are not.
pub fn parse_sidecar(text: &str) -> std::result::Result<Measurement, String> {
    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    if lines.len() != 2 {
        return Err(format!("expected 2 lines, found {}", lines.len()));
    }

    let elapsed_secs: f64 = lines[0]
        .parse()
        .map_err(|e| format!("bad elapsed time '{}': {}", lines[0], e))?;
    if !elapsed_secs.is_finite() || elapsed_secs < 0.0 {
        return Err(format!("elapsed time out of range: {}", lines[0]));
    }
    let peak_memory_kb: u64 = lines[1]
        .parse()
        .map_err(|e| format!("bad peak memory '{}': {}", lines[1], e))?;

    Ok(Measurement {
        elapsed_secs,
        peak_memory_kb,
    })
}

/// Parse a distance output file, skipping its header line.
pub fn parse_distances(text: &str) -> std::result::Result<Vec<u64>, String> {
    let mut lines = text.lines();
    if lines.next().is_none() {
        return Err("file is empty".to_string());
    }
    lines
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty())
        .map(|(i, l)| {
            l.trim()
                .parse::<u64>()
                .map_err(|e| format!("line {}: bad distance '{}': {}", i + 2, l.trim(), e))
        })
        .collect()
}

/// Deletes the wrapped file when dropped, whichever way the reader exits.
struct RemoveOnDrop<'a>(&'a Path);

impl Drop for RemoveOnDrop<'_> {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(self.0);
    }
}

/// Read and delete the side-channel file.
pub fn read_sidecar(path: &Path) -> Result<Measurement> {
    let _guard = RemoveOnDrop(path);
    let malformed = |detail: String| HarnessError::MalformedSidecar {
        path: path.to_path_buf(),
        detail,
    };
    let text = std::fs::read_to_string(path).map_err(|e| malformed(e.to_string()))?;
    parse_sidecar(&text).map_err(malformed)
}

/// Read a distance output file.
pub fn read_distances(path: &Path) -> Result<Vec<u64>> {
    let malformed = |detail: String| HarnessError::MalformedOutput {
        path: path.to_path_buf(),
        detail,
    };
    let text = std::fs::read_to_string(path).map_err(|e| malformed(e.to_string()))?;
    parse_distances(&text).map_err(malformed)
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

pub struct TrialRunner {
    executable: PathBuf,
    mapping_file: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl TrialRunner {
    pub fn new(executable: &Path) -> Self {
        Self {
            executable: executable.to_path_buf(),
            mapping_file: None,
            timeout: None,
        }
    }

    pub fn from_config(config: &HarnessConfig) -> Self {
        Self::new(&config.benchmark)
            .with_mapping_file(config.mapping_file.clone())
            .with_timeout(config.timeout())
    }

    pub fn with_mapping_file(mut self, mapping_file: Option<PathBuf>) -> Self {
        self.mapping_file = mapping_file;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Arguments for one query-executable invocation.
    pub fn command_args(
        method: Method,
        structure: &Path,
        query_set: &Path,
        output: &Path,
        mapping_file: Option<&Path>,
    ) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-m".into(),
            method.as_str().into(),
            "--query-set".into(),
            query_set.into(),
            "--input-structure".into(),
            structure.into(),
            "--output-path".into(),
            output.into(),
        ];
        if let Some(mapping) = mapping_file {
            args.push("--mapping-file".into());
            args.push(mapping.into());
        }
        args
    }

    /// Run one trial and collect its measurements and distances.
    pub fn run_trial(
        &self,
        method: Method,
        structure: &StructureHandle,
        query_set: &QuerySet,
    ) -> Result<TrialResult> {
        if structure.method() != method {
            return Err(HarnessError::Config(format!(
                "structure for {} handed to a {} trial",
                structure.method(),
                method
            )));
        }
        if !structure.exists() {
            return Err(HarnessError::MissingStructure {
                method,
                path: structure.path().to_path_buf(),
            });
        }

        // The child runs elsewhere, so every path it gets must be absolute.
        let structure_path = absolute(structure.path())?;
        let query_path = absolute(query_set.path())?;
        let mapping_path = self.mapping_file.as_deref().map(absolute).transpose()?;

        let workdir = tempfile::Builder::new()
            .prefix("spbench-trial-")
            .tempdir()
            .map_err(|e| HarnessError::io(std::env::temp_dir(), e))?;
        let output_path = workdir.path().join(format!("out_{}.txt", method));

        let args = Self::command_args(
            method,
            &structure_path,
            &query_path,
            &output_path,
            mapping_path.as_deref(),
        );

        let mut command = Command::new(process::resolve_program(&self.executable));
        command.args(&args).current_dir(workdir.path());
        process::run(command, self.timeout)?;

        let measurement = read_sidecar(&workdir.path().join(SIDECAR_FILE))?;
        let distances = read_distances(&output_path)?;

        if distances.len() != query_set.len() {
            warn!(
                "{} produced {} distances for {} queries",
                method,
                distances.len(),
                query_set.len()
            );
        }
        debug!(
            "{} trial: {:.6}s, {} KB, {} distances",
            method,
            measurement.elapsed_secs,
            measurement.peak_memory_kb,
            distances.len()
        );

        Ok(TrialResult::new(
            measurement.elapsed_secs,
            measurement.peak_memory_kb,
            distances,
        ))
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::fs::canonicalize(path).map_err(|e| HarnessError::io(path, e))
}
