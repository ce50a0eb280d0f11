use std::path::{Path, PathBuf};

use crate::error::{PullError, Result};

pub const DEFAULT_MAX_RETRIES: u32 = 3;

const BASE_DIR_NAME: &str = "PDF_Extractor";

/// Every path the tool touches, resolved once from the base directory.
#[derive(Debug, Clone)]
pub struct Config {
    pub base_dir: PathBuf,
    pub master_dir: PathBuf,
    pub exports_dir: PathBuf,
    /// Working grid, no header row.
    pub grid_path: PathBuf,
    /// Grid snapshot written by `grid save`, with a header row.
    pub saved_grid_path: PathBuf,
    pub failure_log_path: PathBuf,
    pub report_path: PathBuf,
    pub max_retries: u32,
}

impl Config {
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        let base_dir = base_dir.as_ref().to_path_buf();
        Config {
            master_dir: base_dir.join("Master_PDFs"),
            exports_dir: base_dir.join("Exports"),
            grid_path: base_dir.join("temp_grid_update.csv"),
            saved_grid_path: base_dir.join("saved_grid.csv"),
            failure_log_path: base_dir.join("failed_jobs.json"),
            report_path: base_dir.join("errors.json"),
            max_retries: DEFAULT_MAX_RETRIES,
            base_dir,
        }
    }

    /// Use `base_dir` if given, otherwise `~/PDF_Extractor`.
    pub fn resolve(base_dir: Option<PathBuf>, max_retries: u32) -> Result<Self> {
        let base_dir = match base_dir {
            Some(dir) => dir,
            None => dirs::home_dir()
                .map(|home| home.join(BASE_DIR_NAME))
                .ok_or_else(|| PullError::MissingResource(PathBuf::from("~")))?,
        };
        Ok(Config {
            max_retries,
            ..Config::new(base_dir)
        })
    }

    pub fn ensure_base_dir(&self) -> Result<()> {
        create_dir(&self.base_dir)
    }

    pub fn ensure_master_dir(&self) -> Result<()> {
        create_dir(&self.master_dir)
    }

    pub fn ensure_exports_dir(&self) -> Result<()> {
        create_dir(&self.exports_dir)
    }

    pub fn source_path(&self, source_pdf: &str) -> PathBuf {
        self.master_dir.join(source_pdf)
    }

    pub fn output_path(&self, output_name: &str) -> PathBuf {
        self.exports_dir.join(format!("{}.pdf", output_name))
    }
}

fn create_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .map_err(|e| PullError::io(format!("Failed to create directory: {}", dir.display()), e))
}
