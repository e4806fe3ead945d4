//! Query sets: ordered (source, target) pairs preceded by their count.
//!
//! ```text
//! 3
//! 12 480
//! 7 7
//! 301 2
//! ```
//!
//! The header count is what per-query timings are normalised by, so a query
//! set whose header disagrees with its body is rejected outright.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::error::{HarnessError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Query {
    pub source: u64,
    pub target: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySet {
    path: PathBuf,
    queries: Vec<Query>,
}

impl QuerySet {
    /// Load and check a query-set file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| HarnessError::io(path, e))?;
        let queries = parse(&content).map_err(|detail| HarnessError::QuerySet {
            path: path.to_path_buf(),
            detail,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            queries,
        })
    }

    /// Random queries over node indices `0..node_count`, reproducible per seed.
    pub fn generate(count: usize, node_count: u64, seed: u64) -> Vec<Query> {
        if node_count == 0 {
            return Vec::new();
        }
        let mut rng = FastRng::new(seed);
        (0..count)
            .map(|_| Query {
                source: rng.next_below(node_count),
                target: rng.next_below(node_count),
            })
            .collect()
    }

    /// Write `queries` in query-set format and return the loaded set.
    pub fn write(path: &Path, queries: &[Query]) -> Result<Self> {
        let mut out = String::with_capacity(16 * (queries.len() + 1));
        let _ = writeln!(out, "{}", queries.len());
        for q in queries {
            let _ = writeln!(out, "{} {}", q.source, q.target);
        }
        std::fs::write(path, out).map_err(|e| HarnessError::io(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            queries: queries.to_vec(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn queries(&self) -> &[Query] {
        &self.queries
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}

fn parse(content: &str) -> std::result::Result<Vec<Query>, String> {
    let mut lines = content.lines().enumerate().filter(|(_, l)| !l.trim().is_empty());

    let (_, header) = lines.next().ok_or_else(|| "file is empty".to_string())?;
    let declared: usize = header
        .trim()
        .parse()
        .map_err(|e| format!("bad query count '{}': {}", header.trim(), e))?;

    let queries = lines
        .map(|(i, line)| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() != 2 {
                return Err(format!("line {}: expected 'source target', got '{}'", i + 1, line.trim()));
            }
            let source = parts[0]
                .parse::<u64>()
                .map_err(|e| format!("line {}: bad source '{}': {}", i + 1, parts[0], e))?;
            let target = parts[1]
                .parse::<u64>()
                .map_err(|e| format!("line {}: bad target '{}': {}", i + 1, parts[1], e))?;
            Ok(Query { source, target })
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

    if queries.len() != declared {
        return Err(format!(
            "query count mismatch: header says {}, file has {}",
            declared,
            queries.len()
        ));
    }
    Ok(queries)
}

// ---------------------------------------------------------------------------
// Fast LCG RNG
// ---------------------------------------------------------------------------

struct FastRng {
    state: u64,
}

impl FastRng {
    fn new(seed: u64) -> Self {
        Self {
            state: seed ^ 0x5DEECE66D,
        }
    }

    #[inline]
    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        // High bits of an LCG are the well-mixed ones.
        self.state.rotate_right(16)
    }

    #[inline]
    fn next_below(&mut self, n: u64) -> u64 {
        self.next_u64() % n
    }
}
