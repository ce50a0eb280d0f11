use anyhow::Result;
use rmcp::{
    ServerHandler, ServiceExt,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{ServerCapabilities, ServerInfo},
    schemars, tool, tool_handler, tool_router,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::commands::info::resolve;
use crate::config::Config;
use crate::export::{export_files, list_outputs, ExportMode};
use crate::extract::{extract_job, run_batch};
use crate::grid::ExtractionJob;
use crate::pdf::PdfDocument;
use crate::retry::retry_pass;
use crate::store::FileStore;
use crate::validate::validate;

// Request structs for tools

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PathRequest {
    #[schemars(description = "Path to a PDF file, or the name of a master PDF")]
    pub path: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GridExtractRequest {
    #[schemars(description = "Retry failed jobs until they succeed or hit the retry limit (default: false)")]
    #[serde(default)]
    pub retry: bool,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ExtractPagesRequest {
    #[schemars(description = "Master PDF file name inside Master_PDFs/")]
    pub source_pdf: String,
    #[schemars(description = "Output name; the file is written to Exports/<name>.pdf")]
    pub output_name: String,
    #[schemars(description = "Page ranges (e.g., '1-5,10,15-20')")]
    pub page_range: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ExportRequest {
    #[schemars(description = "Destination folder")]
    pub destination: String,
    #[schemars(description = "Copy instead of move (default: false)")]
    #[serde(default)]
    pub copy: bool,
}

#[derive(Debug, Clone)]
pub struct PullServer {
    config: Config,
    tool_router: ToolRouter<Self>,
}

impl PullServer {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            tool_router: Self::tool_router(),
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("Error: {}", e))
}

#[tool_router]
impl PullServer {
    #[tool(description = "Validate every row of the job grid. Writes errors.json and returns the report (missing_pdfs, invalid_page_ranges, empty_fields, unreadable_pdfs).")]
    fn grid_validate(&self) -> String {
        let store = FileStore::new(&self.config);
        match validate(&self.config, &store) {
            Ok(report) => to_json(&ValidateResult {
                valid: report.is_valid(),
                report,
            }),
            Err(e) => format!("Error: {}", e),
        }
    }

    #[tool(description = "Extract every row of the job grid into Exports/. Failed jobs are recorded for retry.")]
    fn grid_extract(&self, Parameters(req): Parameters<GridExtractRequest>) -> String {
        let store = FileStore::new(&self.config);
        let summary = match run_batch(&self.config, &store) {
            Ok(s) => s,
            Err(e) => return format!("Error: {}", e),
        };

        let mut retries = Vec::new();
        if req.retry && !summary.failed.is_empty() {
            for _ in 0..self.config.max_retries {
                match retry_pass(&store, self.config.max_retries, |job| {
                    extract_job(&self.config, job)
                }) {
                    Ok(report) if report.attempted() == 0 => break,
                    Ok(report) => retries.push(report),
                    Err(e) => return format!("Error: {}", e),
                }
            }
        }

        to_json(&GridExtractResult { summary, retries })
    }

    #[tool(description = "Re-attempt each job in the failure log once. Jobs that reach the retry limit are abandoned.")]
    fn retry_failed(&self) -> String {
        let store = FileStore::new(&self.config);
        match retry_pass(&store, self.config.max_retries, |job| {
            extract_job(&self.config, job)
        }) {
            Ok(report) => to_json(&report),
            Err(e) => format!("Error: {}", e),
        }
    }

    #[tool(description = "Extract a page range from a master PDF into Exports/<output_name>.pdf. Pages beyond the document are skipped.")]
    fn extract_pages(&self, Parameters(req): Parameters<ExtractPagesRequest>) -> String {
        let job = ExtractionJob::new(req.source_pdf, req.output_name, req.page_range);
        match extract_job(&self.config, &job) {
            Ok(extracted) => to_json(&extracted),
            Err(e) => format!("Error: {}", e),
        }
    }

    #[tool(description = "Get the page count of a PDF")]
    fn page_count(&self, Parameters(PathRequest { path }): Parameters<PathRequest>) -> String {
        let path = resolve(&self.config, &PathBuf::from(path));
        match PdfDocument::open(&path) {
            Ok(doc) => to_json(&PageCountResult {
                path: doc.path.display().to_string(),
                page_count: doc.page_count(),
            }),
            Err(e) => format!("Error: {}", e),
        }
    }

    #[tool(description = "Move (or copy) finished PDFs from Exports/ into a folder. Name collisions get a _copy suffix instead of overwriting.")]
    fn export_outputs(&self, Parameters(req): Parameters<ExportRequest>) -> String {
        let files = match list_outputs(&self.config.exports_dir) {
            Ok(f) if f.is_empty() => return "Error: No PDFs found in Exports directory".to_string(),
            Ok(f) => f,
            Err(e) => return format!("Error: {}", e),
        };
        let mode = if req.copy {
            ExportMode::Copy
        } else {
            ExportMode::Move
        };
        match export_files(&files, &PathBuf::from(req.destination), mode) {
            Ok(summary) => to_json(&summary),
            Err(e) => format!("Error: {}", e),
        }
    }
}

// Result types for MCP tools

#[derive(Debug, Serialize)]
pub struct ValidateResult {
    pub valid: bool,
    #[serde(flatten)]
    pub report: crate::validate::ValidationReport,
}

#[derive(Debug, Serialize)]
pub struct GridExtractResult {
    #[serde(flatten)]
    pub summary: crate::extract::BatchSummary,
    pub retries: Vec<crate::retry::RetryReport>,
}

#[derive(Debug, Serialize)]
pub struct PageCountResult {
    pub path: String,
    pub page_count: u32,
}

#[tool_handler]
impl ServerHandler for PullServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Page extraction over a job grid. Use grid_validate before grid_extract, \
                 retry_failed to replay failed jobs, extract_pages for a single ad-hoc job, \
                 page_count to inspect a PDF, and export_outputs to deliver finished files."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

pub async fn run_server(config: Config) -> Result<()> {
    let server = PullServer::new(config);

    // Serve using stdin/stdout as a tuple
    let service = server.serve((tokio::io::stdin(), tokio::io::stdout())).await?;

    service.waiting().await?;

    Ok(())
}
