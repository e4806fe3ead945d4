//! JSON report of one benchmark session.
//!
//! The CSV table only carries label, memory and time. The report keeps
//! everything needed to judge a run later: where and on what it ran, how many
//! trials went into each row and whether the method agreed with the reference.

use serde::{Deserialize, Serialize};

use crate::method::Method;

pub const SCHEMA_VERSION: u32 = 1;

/// Top-level report written to `<output_dir>/<instance>-<timestamp>-<commit>.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub schema_version: u32,
    pub metadata: RunMetadata,
    pub session: SessionInfo,
    /// One entry per method, in testing order.
    pub results: Vec<MethodResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Set when the session stopped early; `results` then holds what was
    /// collected before the abort.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aborted: Option<String>,
}

/// Environment captured when the session starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    /// ISO 8601, UTC.
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_commit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_dirty: Option<bool>,
    pub harness_version: String,
    pub hardware: HardwareInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HardwareInfo {
    pub cpu: String,
    pub cores: usize,
    pub ram_gb: u64,
    pub os: String,
    pub arch: String,
}

/// Inputs shared by every method of the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub instance: String,
    pub query_set: String,
    pub query_count: usize,
    pub runs: usize,
    pub reference: Method,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodResult {
    pub method: Method,
    pub label: String,
    pub structure: String,
    pub metrics: MethodMetrics,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MethodMetrics {
    pub memory_mib: f64,
    pub time_per_query_us: f64,
    /// Trials that went into the means.
    pub trials: usize,
    /// Trials thrown away because their measurements did not parse.
    #[serde(default)]
    pub discarded_trials: usize,
    pub consistent: bool,
    /// "reference", "match" or "mismatch".
    pub validation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_divergence: Option<usize>,
}
