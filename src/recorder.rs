//! Accumulates per-method results and writes the session's JSON report.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::SystemTime;

use log::info;

use crate::error::{HarnessError, Result};
use crate::schema::{
    BenchmarkReport, HardwareInfo, MethodResult, RunMetadata, SessionInfo, SCHEMA_VERSION,
};

pub struct ResultRecorder {
    metadata: RunMetadata,
    session: SessionInfo,
    results: Vec<MethodResult>,
    warnings: Vec<String>,
    aborted: Option<String>,
}

impl ResultRecorder {
    /// Captures timestamp, git state and hardware at construction time.
    pub fn new(session: SessionInfo) -> Self {
        Self {
            metadata: RunMetadata {
                timestamp: iso8601_now(),
                git_commit: git(&["rev-parse", "--short", "HEAD"]),
                git_branch: git(&["rev-parse", "--abbrev-ref", "HEAD"]),
                git_dirty: git(&["status", "--porcelain"]).map(|s| !s.is_empty()),
                harness_version: env!("CARGO_PKG_VERSION").to_string(),
                hardware: capture_hardware(),
            },
            session,
            results: Vec::new(),
            warnings: Vec::new(),
            aborted: None,
        }
    }

    pub fn record(&mut self, result: MethodResult) {
        self.results.push(result);
    }

    pub fn warn(&mut self, message: String) {
        self.warnings.push(message);
    }

    pub fn mark_aborted(&mut self, reason: String) {
        self.aborted = Some(reason);
    }

    pub fn results(&self) -> &[MethodResult] {
        &self.results
    }

    pub fn report(&self) -> BenchmarkReport {
        BenchmarkReport {
            schema_version: SCHEMA_VERSION,
            metadata: self.metadata.clone(),
            session: self.session.clone(),
            results: self.results.clone(),
            warnings: self.warnings.clone(),
            aborted: self.aborted.clone(),
        }
    }

    /// Write the report into `dir` as `<instance>-<timestamp>-<commit>.json`.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        let commit = self.metadata.git_commit.as_deref().unwrap_or("unknown");
        let ts = self.metadata.timestamp.replace(':', "-");
        let path = dir.join(format!("{}-{}-{}.json", self.session.instance, ts, commit));

        std::fs::create_dir_all(dir).map_err(|e| HarnessError::io(dir, e))?;
        let json = serde_json::to_string_pretty(&self.report())?;
        std::fs::write(&path, json).map_err(|e| HarnessError::io(&path, e))?;

        info!("report saved to {}", path.display());
        Ok(path)
    }
}

/// Load a report written by [`ResultRecorder::save`].
pub fn load_report(path: &Path) -> Result<BenchmarkReport> {
    let contents = std::fs::read_to_string(path).map_err(|e| HarnessError::io(path, e))?;
    Ok(serde_json::from_str(&contents)?)
}

// ---------------------------------------------------------------------------
// Metadata capture helpers
// ---------------------------------------------------------------------------

fn iso8601_now() -> String {
    let secs = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    let (year, month, day) = civil_from_days(secs / 86_400);
    let time_of_day = secs % 86_400;
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
        year,
        month,
        day,
        time_of_day / 3600,
        (time_of_day % 3600) / 60,
        time_of_day % 60
    )
}

/// Days since 1970-01-01 to a proleptic Gregorian date (Hinnant's algorithm).
fn civil_from_days(days: u64) -> (u64, u64, u64) {
    let z = days + 719_468;
    let era = z / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + u64::from(month <= 2);
    (year, month, day)
}

fn git(args: &[&str]) -> Option<String> {
    Command::new("git")
        .args(args)
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
}

fn capture_hardware() -> HardwareInfo {
    HardwareInfo {
        cpu: read_cpu_model(),
        cores: std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(0),
        ram_gb: read_total_ram_gb(),
        os: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
    }
}

fn read_cpu_model() -> String {
    std::fs::read_to_string("/proc/cpuinfo")
        .ok()
        .and_then(|info| {
            info.lines()
                .find(|l| l.starts_with("model name"))
                .and_then(|l| l.split_once(':'))
                .map(|(_, v)| v.trim().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

fn read_total_ram_gb() -> u64 {
    std::fs::read_to_string("/proc/meminfo")
        .ok()
        .and_then(|info| {
            info.lines()
                .find(|l| l.starts_with("MemTotal:"))
                .and_then(|l| l.split_whitespace().nth(1))
                .and_then(|kb| kb.parse::<u64>().ok())
        })
        .map(|kb| kb / (1024 * 1024))
        .unwrap_or(0)
}
