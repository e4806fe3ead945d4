//! Result Collector: the ordered memory/time comparison table.
//!
//! Rows keep the order in which methods were tested. The CSV form has a
//! `label,memory,time` header; extra columns (such as the unnamed index
//! column a dataframe export adds) are ignored when reading.

use std::fmt::Write as _;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{HarnessError, Result};

pub const COLUMNS: [&str; 3] = ["label", "memory", "time"];

/// One method's line: memory in MiB, time in microseconds per query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub label: String,
    pub memory: f64,
    pub time: f64,
}

impl ComparisonRow {
    pub fn new(label: &str, memory: f64, time: f64) -> Self {
        Self {
            label: label.to_string(),
            memory,
            time,
        }
    }
}

/// Append-only table of comparison rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultTable {
    rows: Vec<ComparisonRow>,
}

impl ResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, row: ComparisonRow) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[ComparisonRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// `(label, memory, time)` triples in [`COLUMNS`] order.
    pub fn to_table(&self) -> Vec<(&str, f64, f64)> {
        self.rows
            .iter()
            .map(|r| (r.label.as_str(), r.memory, r.time))
            .collect()
    }

    pub fn write_csv<W: io::Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        wtr.write_record(COLUMNS)?;
        for row in &self.rows {
            wtr.serialize(row)?;
        }
        wtr.flush().map_err(csv::Error::from)?;
        Ok(())
    }

    pub fn read_csv<R: io::Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new().from_reader(reader);
        let rows = rdr
            .deserialize()
            .collect::<std::result::Result<Vec<ComparisonRow>, _>>()?;
        Ok(Self { rows })
    }

    pub fn save_csv(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| HarnessError::io(parent, e))?;
        }
        let file = std::fs::File::create(path).map_err(|e| HarnessError::io(path, e))?;
        self.write_csv(io::BufWriter::new(file))
    }

    pub fn load_csv(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| HarnessError::io(path, e))?;
        Self::read_csv(io::BufReader::new(file))
    }

    /// Fixed-width rendering for terminal output.
    pub fn render(&self) -> String {
        let width = self
            .rows
            .iter()
            .map(|r| r.label.len())
            .max()
            .unwrap_or(0)
            .max("method".len());

        let mut out = String::new();
        let _ = writeln!(
            out,
            "  {:<width$}  {:>12}  {:>15}",
            "method", "memory (MiB)", "time (us/query)",
        );
        let _ = writeln!(out, "  {}", "-".repeat(width + 31));
        for row in &self.rows {
            let _ = writeln!(
                out,
                "  {:<width$}  {:>12.2}  {:>15.3}",
                row.label, row.memory, row.time,
            );
        }
        out
    }
}
