//! Persistence seam between the engine and whatever front-end drives it.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::config::Config;
use crate::error::{PullError, Result};
use crate::grid::{self, GridRow};
use crate::retry::FailureLog;
use crate::validate::ValidationReport;

pub trait JobStore {
    fn load_grid(&self) -> Result<Vec<GridRow>>;
    fn save_report(&self, report: &ValidationReport) -> Result<()>;
    fn load_failure_log(&self) -> Result<FailureLog>;
    /// Persist `log`; an empty log removes any stored copy.
    fn save_failure_log(&self, log: &FailureLog) -> Result<()>;
}

/// Flat files under the configured base directory.
pub struct FileStore<'a> {
    config: &'a Config,
}

impl<'a> FileStore<'a> {
    pub fn new(config: &'a Config) -> Self {
        FileStore { config }
    }
}

impl JobStore for FileStore<'_> {
    fn load_grid(&self) -> Result<Vec<GridRow>> {
        grid::read_rows(&self.config.grid_path, false)
    }

    fn save_report(&self, report: &ValidationReport) -> Result<()> {
        self.config.ensure_base_dir()?;
        write_json(&self.config.report_path, report)
    }

    fn load_failure_log(&self) -> Result<FailureLog> {
        let path = &self.config.failure_log_path;
        if !path.is_file() {
            return Ok(FailureLog::default());
        }
        let text = fs::read_to_string(path)
            .map_err(|e| PullError::io(format!("Failed to read {}", path.display()), e))?;
        Ok(serde_json::from_str(&text)?)
    }

    fn save_failure_log(&self, log: &FailureLog) -> Result<()> {
        let path = &self.config.failure_log_path;
        if log.is_empty() {
            if path.is_file() {
                fs::remove_file(path)
                    .map_err(|e| PullError::io(format!("Failed to remove {}", path.display()), e))?;
                debug!(path = %path.display(), "failure log emptied and removed");
            }
            return Ok(());
        }
        self.config.ensure_base_dir()?;
        write_json(path, log)
    }
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value)?;
    fs::write(path, text).map_err(|e| PullError::io(format!("Failed to write {}", path.display()), e))
}
