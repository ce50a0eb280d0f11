use crate::config::Config;
use crate::export::{export_files, list_outputs, ExportMode};
use anyhow::{Context, Result};
use std::path::Path;

pub fn run(config: &Config, destination: &Path, mode: ExportMode) -> Result<()> {
    let files = list_outputs(&config.exports_dir).with_context(|| {
        format!(
            "Exports directory does not exist: {}",
            config.exports_dir.display()
        )
    })?;
    if files.is_empty() {
        anyhow::bail!("No PDFs found in {}", config.exports_dir.display());
    }

    let summary = export_files(&files, destination, mode)
        .with_context(|| format!("Cannot export to {}", destination.display()))?;

    for exported in &summary.exported {
        if exported.renamed {
            println!(
                "Exported {} as {} (name already taken)",
                exported.source.display(),
                exported.destination.display()
            );
        } else {
            println!("Exported {}", exported.destination.display());
        }
    }
    for failed in &summary.failed {
        println!("Error exporting {}: {}", failed.source.display(), failed.error);
    }
    println!(
        "{} file(s) exported to {}",
        summary.exported.len(),
        destination.display()
    );
    Ok(())
}
