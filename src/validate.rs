use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::config::Config;
use crate::error::{PullError, Result};
use crate::grid::GridRow;
use crate::page_range::{expand_page_ranges, parse_page_ranges};
use crate::pdf::PdfDocument;
use crate::store::JobStore;

/// Problems found in the grid, grouped by kind. Written to `errors.json` for
/// the front-end after every run.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub missing_pdfs: Vec<String>,
    pub invalid_page_ranges: Vec<String>,
    pub empty_fields: Vec<String>,
    #[serde(default)]
    pub unreadable_pdfs: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.error_count() == 0
    }

    pub fn error_count(&self) -> usize {
        self.missing_pdfs.len()
            + self.invalid_page_ranges.len()
            + self.empty_fields.len()
            + self.unreadable_pdfs.len()
    }

    pub fn messages(&self) -> impl Iterator<Item = &String> {
        self.empty_fields
            .iter()
            .chain(&self.missing_pdfs)
            .chain(&self.unreadable_pdfs)
            .chain(&self.invalid_page_ranges)
    }
}

/// Load the grid, check every row, and persist the report whatever the outcome.
///
/// A missing or empty grid is an error and no report is written.
pub fn validate<S: JobStore>(config: &Config, store: &S) -> Result<ValidationReport> {
    let rows = store.load_grid()?;
    validate_and_report(config, store, &rows)
}

/// [`validate`] over rows already loaded from the grid.
#[instrument(skip_all, fields(rows = rows.len()))]
pub fn validate_and_report<S: JobStore>(
    config: &Config,
    store: &S,
    rows: &[GridRow],
) -> Result<ValidationReport> {
    if rows.is_empty() {
        return Err(PullError::Format("The grid is empty.".to_string()));
    }

    let report = validate_rows(config, rows);
    store.save_report(&report)?;
    info!(rows = rows.len(), errors = report.error_count(), "validation finished");
    Ok(report)
}

/// Check each row independently; a bad row never stops the others.
pub fn validate_rows(config: &Config, rows: &[GridRow]) -> ValidationReport {
    let mut report = ValidationReport::default();
    // Rows often share a master; open each one once.
    let mut page_counts: HashMap<String, std::result::Result<u32, String>> = HashMap::new();

    for row in rows {
        let i = row.index;
        let job = match row.to_job() {
            Ok(job) => job,
            Err(e) => {
                report.empty_fields.push(e.to_string());
                continue;
            }
        };

        if job.has_empty_field() {
            report.empty_fields.push(format!("Row {}: Missing fields.", i));
        }

        let range_ok = job.page_range.is_empty() || parse_page_ranges(&job.page_range).is_ok();
        if !range_ok {
            report
                .invalid_page_ranges
                .push(format!("Row {}: Invalid page range '{}'.", i, job.page_range));
        }

        if job.source_pdf.is_empty() {
            continue;
        }
        let path = config.source_path(&job.source_pdf);
        if !path.is_file() {
            report
                .missing_pdfs
                .push(format!("Row {}: {} not found.", i, job.source_pdf));
            continue;
        }

        let total = page_counts
            .entry(job.source_pdf.clone())
            .or_insert_with(|| {
                PdfDocument::open(&path)
                    .map(|doc| doc.page_count())
                    .map_err(|e| e.to_string())
            })
            .clone();
        let total = match total {
            Ok(total) => total,
            Err(reason) => {
                report.unreadable_pdfs.push(format!(
                    "Row {}: {} could not be read: {}",
                    i, job.source_pdf, reason
                ));
                continue;
            }
        };

        if job.page_range.is_empty() || !range_ok {
            continue;
        }
        if let Err(PullError::OutOfRange { tokens, total }) =
            expand_page_ranges(&job.page_range, total)
        {
            debug!(row = i, ?tokens, total, "pages out of range");
            report.invalid_page_ranges.push(format!(
                "Row {}: Page(s) {} out of range in '{}' ({} has {} pages).",
                i,
                tokens.join(", "),
                job.page_range,
                job.source_pdf,
                total
            ));
        }
    }

    report
}
