//! Session configuration.
//!
//! One [`HarnessConfig`] value describes a whole benchmark session: which
//! instance is measured, where the external programs and inputs live, which
//! methods take part and how their structures are built. It is usually read
//! from a JSON file:
//!
//! ```json
//! {
//!   "instance": "DC",
//!   "graph_input": "../thesisTestsData/DC",
//!   "query_set": "../thesisTestsData/DC/DC100000randomQueries.txt",
//!   "runs": 10,
//!   "methods": [
//!     { "method": "dijkstra" },
//!     { "method": "ch" },
//!     { "method": "tnr", "preprocessing_mode": "slow", "tnodes_cnt": 5000, "int_size": 16 }
//!   ]
//! }
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{HarnessError, Result};
use crate::method::{Method, OutputFormat, PreprocessingMode};

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

pub const DEFAULT_PREPROCESSOR: &str = "./shortestPathsPreprocessor";
pub const DEFAULT_BENCHMARK: &str = "./benchmark";
pub const DEFAULT_RUNS: usize = 10;
pub const DEFAULT_OUTPUT_DIR: &str = "results";

const STANDARD_TNODES: u32 = 5000;
const STANDARD_INT_SIZE: u32 = 16;
const STANDARD_QUERY_COUNT: usize = 100_000;

fn default_preprocessor() -> PathBuf {
    PathBuf::from(DEFAULT_PREPROCESSOR)
}

fn default_benchmark() -> PathBuf {
    PathBuf::from(DEFAULT_BENCHMARK)
}

fn default_runs() -> usize {
    DEFAULT_RUNS
}

fn default_reference() -> Method {
    Method::Dijkstra
}

fn default_true() -> bool {
    true
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

// ---------------------------------------------------------------------------
// Per-method settings
// ---------------------------------------------------------------------------

/// How one method takes part in the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodSpec {
    pub method: Method,
    /// Row label; defaults to [`Method::label`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preprocessing_mode: Option<PreprocessingMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tnodes_cnt: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub int_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_format: Option<OutputFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_format: Option<String>,
    /// Prefix handed to the preprocessor as `-o`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_prefix: Option<PathBuf>,
    /// Existing structure to benchmark against; skips the build for this method.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structure: Option<PathBuf>,
}

impl MethodSpec {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            label: None,
            preprocessing_mode: None,
            tnodes_cnt: None,
            int_size: None,
            output_format: None,
            input_format: None,
            output_prefix: None,
            structure: None,
        }
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn with_mode(mut self, mode: PreprocessingMode) -> Self {
        self.preprocessing_mode = Some(mode);
        self
    }

    pub fn with_tnodes(mut self, count: u32) -> Self {
        self.tnodes_cnt = Some(count);
        self
    }

    pub fn with_int_size(mut self, bits: u32) -> Self {
        self.int_size = Some(bits);
        self
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }

    pub fn with_structure(mut self, path: impl Into<PathBuf>) -> Self {
        self.structure = Some(path.into());
        self
    }

    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or_else(|| self.method.label())
    }

    /// Output prefix for the preprocessor: the explicit one, or
    /// `<graph_input>/<instance>` with a `<tnodes>tnodes` suffix for the
    /// transit-node methods.
    pub fn resolved_output_prefix(&self, instance: &str, graph_input: &Path) -> PathBuf {
        if let Some(prefix) = &self.output_prefix {
            return prefix.clone();
        }
        match (self.method, self.tnodes_cnt) {
            (Method::Tnr | Method::Tnraf, Some(tnodes)) => {
                graph_input.join(format!("{}{}tnodes", instance, tnodes))
            }
            _ => graph_input.join(instance),
        }
    }

    fn validate(&self) -> Result<()> {
        let missing = |what: &str| -> Result<()> {
            Err(HarnessError::Config(format!(
                "{} requires {}",
                self.method, what
            )))
        };
        match self.method {
            Method::Tnr | Method::Tnraf => {
                if self.preprocessing_mode.is_none() {
                    return missing("preprocessing_mode");
                }
                if self.tnodes_cnt.is_none() {
                    return missing("tnodes_cnt");
                }
            }
            Method::Dm => {
                if self.preprocessing_mode.is_none() {
                    return missing("preprocessing_mode");
                }
                if self.output_format.is_none() {
                    return missing("output_format");
                }
                if self.preprocessing_mode == Some(PreprocessingMode::Dm) {
                    return Err(HarnessError::Config(
                        "dm preprocessing mode must be fast or slow".into(),
                    ));
                }
            }
            Method::Dijkstra | Method::Astar | Method::Ch => {}
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Session configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Instance name, used for default file names.
    pub instance: String,
    #[serde(default = "default_preprocessor")]
    pub preprocessor: PathBuf,
    /// Query executable.
    #[serde(default = "default_benchmark")]
    pub benchmark: PathBuf,
    /// Raw graph location handed to the preprocessor and to the exact methods.
    pub graph_input: PathBuf,
    pub query_set: PathBuf,
    /// Mapping from original node IDs to dense indices, forwarded as `--mapping-file`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping_file: Option<PathBuf>,
    #[serde(default = "default_runs")]
    pub runs: usize,
    #[serde(default = "default_reference")]
    pub reference: Method,
    /// Deadline for every single external invocation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Deadline for the whole session, checked between invocations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_deadline_secs: Option<u64>,
    #[serde(default = "default_true")]
    pub build_structures: bool,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    pub methods: Vec<MethodSpec>,
}

impl HarnessConfig {
    /// The standard six-method comparison on one instance directory.
    pub fn standard_suite(instance: &str, data_root: &Path) -> Self {
        let graph_input = data_root.join(instance);
        let query_set =
            graph_input.join(format!("{}{}randomQueries.txt", instance, STANDARD_QUERY_COUNT));
        Self {
            instance: instance.to_string(),
            preprocessor: default_preprocessor(),
            benchmark: default_benchmark(),
            graph_input,
            query_set,
            mapping_file: None,
            runs: DEFAULT_RUNS,
            reference: Method::Dijkstra,
            timeout_secs: None,
            session_deadline_secs: None,
            build_structures: true,
            output_dir: default_output_dir(),
            methods: vec![
                MethodSpec::new(Method::Dijkstra),
                MethodSpec::new(Method::Astar),
                MethodSpec::new(Method::Ch),
                MethodSpec::new(Method::Tnr)
                    .with_mode(PreprocessingMode::Slow)
                    .with_tnodes(STANDARD_TNODES)
                    .with_int_size(STANDARD_INT_SIZE),
                MethodSpec::new(Method::Tnraf)
                    .with_mode(PreprocessingMode::Slow)
                    .with_tnodes(STANDARD_TNODES)
                    .with_int_size(STANDARD_INT_SIZE),
                MethodSpec::new(Method::Dm)
                    .with_mode(PreprocessingMode::Fast)
                    .with_output_format(OutputFormat::Hdf)
                    .with_int_size(STANDARD_INT_SIZE),
            ],
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: HarnessConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| HarnessError::io(path, e))?;
        Self::from_json(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if self.instance.trim().is_empty() {
            return Err(HarnessError::Config("instance name is empty".into()));
        }
        if self.runs == 0 {
            return Err(HarnessError::Config("runs must be at least 1".into()));
        }
        if self.methods.is_empty() {
            return Err(HarnessError::Config("no methods configured".into()));
        }
        let mut seen = HashSet::new();
        for spec in &self.methods {
            if !seen.insert(spec.method) {
                return Err(HarnessError::Config(format!(
                    "method {} listed more than once",
                    spec.method
                )));
            }
            spec.validate()?;
        }
        if !seen.contains(&self.reference) {
            return Err(HarnessError::Config(format!(
                "reference method {} is not among the configured methods",
                self.reference
            )));
        }
        if self.timeout_secs == Some(0) {
            return Err(HarnessError::Config("timeout_secs must be positive".into()));
        }
        if self.session_deadline_secs == Some(0) {
            return Err(HarnessError::Config(
                "session_deadline_secs must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn session_deadline(&self) -> Option<Duration> {
        self.session_deadline_secs.map(Duration::from_secs)
    }

    pub fn method_spec(&self, method: Method) -> Option<&MethodSpec> {
        self.methods.iter().find(|s| s.method == method)
    }

    /// Methods in the order they are tested: the reference first, the rest in
    /// configured order.
    pub fn testing_order(&self) -> Vec<&MethodSpec> {
        let reference = self.methods.iter().filter(|s| s.method == self.reference);
        let others = self.methods.iter().filter(|s| s.method != self.reference);
        reference.chain(others).collect()
    }

    /// Where the comparison table is written.
    pub fn table_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("benchmark_{}.csv", self.instance))
    }
}
