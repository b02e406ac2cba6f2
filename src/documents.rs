// ABOUTME: Discovers input documents for `wordledger ingest` and ingests them one unit of work each.
// ABOUTME: A failed document is recorded and skipped; the batch continues with the next one.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use wordledger_core::{ObservationResult, ObservationSource, SkippedObservation};
use wordledger_store::Ledger;

/// Outcome of one input file.
#[derive(Debug, Serialize)]
pub struct DocumentSummary {
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<ObservationResult>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedObservation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of a whole `ingest` run.
#[derive(Debug, Default, Serialize)]
pub struct BatchSummary {
    pub documents: Vec<DocumentSummary>,
    pub total_results: usize,
    pub failed_documents: usize,
}

/// A single file, or every `*.txt` below a directory in sorted path order.
/// Symlinked files are read; symlinked directories are skipped.
pub fn discover(source: &Path) -> Result<Vec<PathBuf>> {
    if !source.is_dir() {
        return Ok(vec![source.to_path_buf()]);
    }

    let mut found = Vec::new();
    let mut pending = vec![source.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir).with_context(|| format!("reading {}", dir.display()))? {
            let entry = entry?;
            let path = entry.path();
            // file_type does not follow symlinks.
            if entry.file_type()?.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == "txt") {
                found.push(path);
            }
        }
    }
    found.sort();
    Ok(found)
}

/// Ingest every document in order, one unit of work per document.
pub fn ingest_all(
    ledger: &mut Ledger,
    source: &dyn ObservationSource,
    paths: &[PathBuf],
) -> BatchSummary {
    let mut summary = BatchSummary::default();

    for path in paths {
        let outcome = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))
            .and_then(|text| Ok(ledger.ingest_document(source, &text)?));

        let document = match outcome {
            Ok(report) => {
                tracing::info!(
                    path = %path.display(),
                    observations = report.results.len(),
                    "ingested document"
                );
                summary.total_results += report.results.len();
                DocumentSummary {
                    path: path.clone(),
                    results: report.results,
                    skipped: report.skipped,
                    error: None,
                }
            }
            Err(e) => {
                tracing::error!(path = %path.display(), "document failed: {:#}", e);
                summary.failed_documents += 1;
                DocumentSummary {
                    path: path.clone(),
                    results: Vec::new(),
                    skipped: Vec::new(),
                    error: Some(format!("{:#}", e)),
                }
            }
        };
        summary.documents.push(document);
    }

    summary
}
