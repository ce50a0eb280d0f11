use crate::config::Config;
use crate::pdf::PdfDocument;
use anyhow::Result;
use std::path::{Path, PathBuf};

pub fn run(config: &Config, path: &Path) -> Result<()> {
    let path = resolve(config, path);
    let doc = PdfDocument::open(&path)?;

    println!("File: {}", doc.path.display());
    println!("Pages: {}", doc.page_count());

    Ok(())
}

/// A bare name that is not a file here is looked up in the master directory.
pub fn resolve(config: &Config, path: &Path) -> PathBuf {
    if path.is_relative() && !path.exists() {
        config.master_dir.join(path)
    } else {
        path.to_path_buf()
    }
}
