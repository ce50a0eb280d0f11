use std::path::PathBuf;

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::config::Config;
use crate::error::{PullError, Result};
use crate::grid::{ExtractionJob, GridRow};
use crate::page_range::resolve_lenient;
use crate::pdf::PdfDocument;
use crate::store::JobStore;

#[derive(Debug, Clone, Serialize)]
pub struct Extracted {
    pub output: PathBuf,
    pub page_count: usize,
    /// Tokens that fell outside the source document and were skipped.
    pub dropped: Vec<String>,
}

/// Copy the pages named by `job.page_range` into `Exports/{output_name}.pdf`.
///
/// Pages beyond the source document are skipped, not rejected; the validator
/// is what flags them.
#[instrument(skip(config), fields(source = %job.source_pdf, output = %job.output_name))]
pub fn extract_job(config: &Config, job: &ExtractionJob) -> Result<Extracted> {
    if job.has_empty_field() {
        return Err(PullError::Format("job has empty fields".to_string()));
    }

    let doc = PdfDocument::open(config.source_path(&job.source_pdf))?;
    let total = doc.page_count();

    let resolved = resolve_lenient(&job.page_range, total)?;
    if !resolved.dropped.is_empty() {
        warn!(dropped = ?resolved.dropped, total, "skipping pages outside the document");
    }
    if resolved.pages.is_empty() {
        return Err(PullError::OutOfRange {
            tokens: resolved.dropped,
            total,
        });
    }

    let mut new_doc = doc.extract_pages(&resolved.pages)?;
    config.ensure_exports_dir()?;
    let output = config.output_path(&job.output_name);
    PdfDocument::save(&mut new_doc, &output)?;

    info!(pages = resolved.pages.len(), output = %output.display(), "extracted");
    Ok(Extracted {
        output,
        page_count: resolved.pages.len(),
        dropped: resolved.dropped,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedJob {
    pub job: ExtractionJob,
    pub error: String,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct BatchSummary {
    pub succeeded: Vec<ExtractionJob>,
    pub failed: Vec<FailedJob>,
    /// Grid rows that were not three fields wide.
    pub skipped_rows: Vec<usize>,
    /// Failed jobs left out of the failure log because a field contains the
    /// key separator.
    pub not_retryable: Vec<ExtractionJob>,
}

/// Extract every row of the grid in order, then record each failure in the
/// failure log at attempt 0.
///
/// Per-job errors are collected in the summary; only a missing/empty grid or
/// a failure log that cannot be read or written is returned as an error.
pub fn run_batch<S: JobStore>(config: &Config, store: &S) -> Result<BatchSummary> {
    let rows = store.load_grid()?;
    extract_rows(config, store, &rows)
}

/// [`run_batch`] over rows already loaded from the grid.
#[instrument(skip_all, fields(rows = rows.len()))]
pub fn extract_rows<S: JobStore>(
    config: &Config,
    store: &S,
    rows: &[GridRow],
) -> Result<BatchSummary> {
    if rows.is_empty() {
        return Err(PullError::Format("No valid rows found.".to_string()));
    }

    let mut summary = BatchSummary::default();
    for row in rows {
        let job = match row.to_job() {
            Ok(job) => job,
            Err(e) => {
                warn!(row = row.index, "{}", e);
                summary.skipped_rows.push(row.index);
                continue;
            }
        };
        match extract_job(config, &job) {
            Ok(_) => summary.succeeded.push(job),
            Err(e) => {
                warn!(row = row.index, error = %e, "extraction failed");
                summary.failed.push(FailedJob {
                    job,
                    error: e.to_string(),
                });
            }
        }
    }

    let mut log = store.load_failure_log()?;
    for job in &summary.succeeded {
        log.remove(job);
    }
    for failed in &summary.failed {
        if !log.record_failure(&failed.job) {
            summary.not_retryable.push(failed.job.clone());
        }
    }
    store.save_failure_log(&log)?;

    info!(
        succeeded = summary.succeeded.len(),
        failed = summary.failed.len(),
        skipped = summary.skipped_rows.len(),
        queued_for_retry = log.len(),
        "batch finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::write_rows;
    use crate::pdf::document::fixtures::{page_markers, write_pdf};
    use crate::store::FileStore;

    fn setup() -> (tempfile::TempDir, Config) {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::new(dir.path());
        config.ensure_master_dir().unwrap();
        write_pdf(&config.source_path("five.pdf"), 5);
        (dir, config)
    }

    #[test]
    fn test_extract_listed_pages() {
        let (_dir, config) = setup();
        let out = extract_job(&config, &ExtractionJob::new("five.pdf", "part", "1-2,4")).unwrap();
        assert_eq!(out.output, config.exports_dir.join("part.pdf"));
        assert_eq!(out.page_count, 3);
        assert!(out.dropped.is_empty());
        assert_eq!(page_markers(&out.output), vec![1, 2, 4]);
    }

    #[test]
    fn test_out_of_range_page_skipped() {
        let (_dir, config) = setup();
        let job = ExtractionJob::new("five.pdf", "part", "1-2,4,6");
        let out = extract_job(&config, &job).unwrap();
        assert_eq!(page_markers(&out.output), vec![1, 2, 4]);
        assert_eq!(out.dropped, vec!["6"]);

        // The validator still flags the same row.
        let rows = vec![crate::grid::GridRow {
            index: 1,
            fields: vec![job.source_pdf, job.output_name, job.page_range],
        }];
        let report = crate::validate::validate_rows(&config, &rows);
        assert_eq!(report.invalid_page_ranges.len(), 1);
    }

    #[test]
    fn test_oversized_page_number_skipped() {
        let (_dir, config) = setup();
        let job = ExtractionJob::new("five.pdf", "part", "1-2,99999999999");
        let out = extract_job(&config, &job).unwrap();
        assert_eq!(page_markers(&out.output), vec![1, 2]);
        assert_eq!(out.dropped, vec!["99999999999"]);
    }

    #[test]
    fn test_failures_are_errors_not_panics() {
        let (_dir, config) = setup();
        assert!(matches!(
            extract_job(&config, &ExtractionJob::new("gone.pdf", "x", "1")),
            Err(PullError::MissingResource(_))
        ));
        assert!(matches!(
            extract_job(&config, &ExtractionJob::new("five.pdf", "x", "1-a")),
            Err(PullError::Format(_))
        ));
        assert!(matches!(
            extract_job(&config, &ExtractionJob::new("five.pdf", "x", "7-9")),
            Err(PullError::OutOfRange { total: 5, .. })
        ));
        assert!(!config.output_path("x").exists());
    }

    #[test]
    fn test_batch_records_failures_at_zero() {
        let (_dir, config) = setup();
        let grid = vec![
            vec!["five.pdf".to_string(), "good".to_string(), "2".to_string()],
            vec!["five.pdf".to_string(), "bad-row".to_string()],
            vec!["gone.pdf".to_string(), "bad".to_string(), "1".to_string()],
        ];
        write_rows(&config.grid_path, &grid, false).unwrap();

        let store = FileStore::new(&config);
        let summary = run_batch(&config, &store).unwrap();
        assert_eq!(summary.succeeded.len(), 1);
        assert_eq!(summary.skipped_rows, vec![2]);
        assert_eq!(summary.failed.len(), 1);
        assert!(config.output_path("good").is_file());

        let log = store.load_failure_log().unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(
            log.attempts(&ExtractionJob::new("gone.pdf", "bad", "1")),
            Some(0)
        );
    }

    #[test]
    fn test_batch_without_grid() {
        let (_dir, config) = setup();
        let store = FileStore::new(&config);
        assert!(matches!(
            run_batch(&config, &store),
            Err(PullError::MissingResource(_))
        ));
    }
}
