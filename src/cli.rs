use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::DEFAULT_MAX_RETRIES;
use crate::export::ExportMode;
use crate::grid::Column;

#[derive(Parser)]
#[command(name = "pagepull")]
#[command(about = "Extract page ranges from master PDFs into new PDFs, driven by a job grid")]
#[command(version)]
pub struct Cli {
    /// Base directory holding Master_PDFs/, Exports/ and the grid files
    /// (default: ~/PDF_Extractor)
    #[arg(long, global = true, env = "PAGEPULL_HOME")]
    pub base_dir: Option<PathBuf>,

    /// Retries before a failed job is abandoned
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_RETRIES)]
    pub max_retries: u32,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run as MCP server over stdio
    Mcp,

    /// Check every grid row; writes errors.json and exits 1 on any problem
    Validate,

    /// Extract every grid row into Exports/
    Extract {
        /// Keep retrying failed jobs until they succeed or hit the retry limit
        #[arg(long)]
        retry: bool,
    },

    /// Re-attempt the jobs recorded in the failure log once
    Retry,

    /// Extract a single job without touching the grid
    #[command(alias = "cat")]
    Pull {
        /// Master PDF file name (inside Master_PDFs/)
        source_pdf: String,

        /// Page ranges (e.g., "1-5,10,15-20")
        pages: String,

        /// Output name, written to Exports/<name>.pdf
        #[arg(short, long)]
        output: String,
    },

    /// Show the page count of a PDF
    Info {
        /// PDF file, or the name of a master PDF
        path: PathBuf,
    },

    /// Move (or copy) finished PDFs from Exports/ into a folder
    Export {
        /// Destination folder
        destination: PathBuf,

        #[arg(long, value_enum, default_value_t)]
        mode: ExportMode,
    },

    /// Copy PDFs into Master_PDFs/
    Upload {
        /// PDF files to add
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Save, load or fill the job grid
    Grid {
        #[command(subcommand)]
        action: GridCommand,
    },
}

#[derive(Subcommand)]
pub enum GridCommand {
    /// Read a JSON array of [source, output, pages] rows from stdin and save it
    Save,

    /// Print the saved grid as JSON
    Load,

    /// Fill one column of the working grid from stdin, one value per line
    Set {
        #[arg(value_enum)]
        column: Column,
    },
}
