//! Benchmark reports: per-file timings and scores plus their aggregates.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Result for one benchmarked document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FileScore {
    /// Conversion time in seconds
    pub time: f64,
    /// Alignment score in [0, 1]
    pub score: f64,
    /// Pages in the document
    pub pages: usize,
}

/// Scores for one method over a benchmark set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkReport {
    /// Name of the converter that produced the hypotheses
    pub method: String,
    pub files: BTreeMap<String, FileScore>,
    pub avg_score: f64,
    pub time_per_page: f64,
    pub time_per_doc: f64,
    pub created_at: DateTime<Utc>,
}

impl BenchmarkReport {
    /// Create an empty report.
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            files: BTreeMap::new(),
            avg_score: 0.0,
            time_per_page: 0.0,
            time_per_doc: 0.0,
            created_at: Utc::now(),
        }
    }

    /// Record a file and refresh the aggregates.
    pub fn add_file(&mut self, name: impl Into<String>, score: FileScore) {
        self.files.insert(name.into(), score);
        self.update_aggregates();
    }

    fn update_aggregates(&mut self) {
        let docs = self.files.len();
        let total_time: f64 = self.files.values().map(|f| f.time).sum();
        let total_score: f64 = self.files.values().map(|f| f.score).sum();
        let total_pages: usize = self.files.values().map(|f| f.pages).sum();

        self.avg_score = if docs > 0 { total_score / docs as f64 } else { 0.0 };
        self.time_per_doc = if docs > 0 { total_time / docs as f64 } else { 0.0 };
        self.time_per_page = if total_pages > 0 {
            total_time / total_pages as f64
        } else {
            0.0
        };
    }

    /// Check named files reach their minimum scores.
    ///
    /// A file missing from the report fails.
    pub fn verify(&self, min_scores: &[(String, f64)]) -> Result<()> {
        for (name, min) in min_scores {
            let Some(file) = self.files.get(name) else {
                return Err(Error::Other(format!("No score for {}", name)));
            };
            if file.score < *min {
                return Err(Error::Other(format!(
                    "{} scored {:.4}, below the required {:.4}",
                    name, file.score, min
                )));
            }
        }
        Ok(())
    }

    /// Serialize as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a report from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write the report to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Read a report from `path`.
    pub fn load(path: &Path) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }
}
