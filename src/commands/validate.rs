use crate::config::Config;
use crate::store::{FileStore, JobStore};
use crate::validate::validate_and_report;
use anyhow::{Context, Result};

/// Returns whether the grid passed.
pub fn run(config: &Config) -> Result<bool> {
    let store = FileStore::new(config);
    let rows = store.load_grid().context("No grid to validate")?;
    let report = validate_and_report(config, &store, &rows)?;

    if report.is_valid() {
        println!("All inputs are valid.");
        return Ok(true);
    }

    for message in report.messages() {
        println!("{}", message);
    }
    println!(
        "Validation failed: {} error(s) logged to {}",
        report.error_count(),
        config.report_path.display()
    );
    Ok(false)
}
