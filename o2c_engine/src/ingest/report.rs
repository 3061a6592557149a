use std::{fmt::Display, path::PathBuf};

use crate::db_types::ProductId;

//--------------------------------------     SkipReason      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The line did not have at least two fields.
    Malformed,
    /// One of the fields was not an integer.
    NotNumeric,
    /// The quantity was zero or negative.
    NonPositiveQuantity,
    /// The referenced product does not exist.
    UnknownProduct(ProductId),
}

impl Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Malformed => write!(f, "fewer than 2 columns"),
            SkipReason::NotNumeric => write!(f, "non-numeric values"),
            SkipReason::NonPositiveQuantity => write!(f, "quantity must be positive"),
            SkipReason::UnknownProduct(id) => write!(f, "product {id} does not exist"),
        }
    }
}

//--------------------------------------     SkippedLine     ---------------------------------------------------------
/// A line that was not applied. Skipped lines are recorded, never silently dropped.
#[derive(Debug, Clone)]
pub struct SkippedLine {
    /// 1-based line number within the file.
    pub line: usize,
    pub content: String,
    pub reason: SkipReason,
}

//--------------------------------------     IngestReport    ---------------------------------------------------------
/// The outcome of processing one restock file.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub file: PathBuf,
    pub applied: usize,
    pub skipped: Vec<SkippedLine>,
}

impl IngestReport {
    pub fn new(file: PathBuf) -> Self {
        Self { file, applied: 0, skipped: Vec::new() }
    }

    pub fn record_skip(&mut self, line: usize, content: &str, reason: SkipReason) {
        let mut content = content.to_string();
        content.truncate(50);
        self.skipped.push(SkippedLine { line, content, reason });
    }
}

impl Display for IngestReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} lines applied, {} skipped",
            self.file.display(),
            self.applied,
            self.skipped.len()
        )
    }
}
