//! Markdown and JSON result files for experiments.
//!
//! Every experiment prints to the console and leaves two artifacts in the
//! output directory: a human-readable Markdown report and a machine-readable
//! JSON dump of the raw results.

use chrono::Utc;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Incrementally assembled Markdown document.
#[derive(Debug)]
pub struct MarkdownReport {
    lines: Vec<String>,
}

impl MarkdownReport {
    /// Start a report with a title and a generation timestamp.
    pub fn new(title: &str) -> Self {
        Self {
            lines: vec![
                format!("# {title}"),
                String::new(),
                format!("Generated: {}", Utc::now().format("%Y-%m-%d %H:%M:%S UTC")),
                String::new(),
            ],
        }
    }

    pub fn heading(&mut self, text: &str) {
        self.lines.push(format!("## {text}"));
        self.lines.push(String::new());
    }

    pub fn paragraph(&mut self, text: &str) {
        self.lines.push(text.to_string());
        self.lines.push(String::new());
    }

    pub fn bullet(&mut self, text: &str) {
        self.lines.push(format!("- {text}"));
    }

    /// Close off a bullet list (or any run of lines) with a blank line.
    pub fn blank(&mut self) {
        self.lines.push(String::new());
    }

    /// A pipe table. Cell text is sanitized so embedded pipes and newlines
    /// can't break the row structure.
    pub fn table(&mut self, headers: &[&str], rows: &[Vec<String>]) {
        let sanitize = |s: &str| s.replace('|', "\\|").replace('\n', " ");

        self.lines.push(format!("| {} |", headers.join(" | ")));
        self.lines
            .push(format!("|{}|", vec!["---"; headers.len()].join("|")));
        for row in rows {
            let cells: Vec<String> = row.iter().map(|c| sanitize(c)).collect();
            self.lines.push(format!("| {} |", cells.join(" | ")));
        }
        self.lines.push(String::new());
    }

    /// A fenced block, for model output that should render verbatim.
    pub fn code_block(&mut self, text: &str) {
        self.lines.push("```text".to_string());
        self.lines.push(text.to_string());
        self.lines.push("```".to_string());
        self.lines.push(String::new());
    }

    pub fn render(&self) -> String {
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }

    /// Write the report to `dir/filename`, creating the directory if needed.
    pub fn write(&self, dir: &Path, filename: &str) -> Result<PathBuf, String> {
        std::fs::create_dir_all(dir).map_err(|e| format!("failed to create output dir: {e}"))?;
        let path = dir.join(filename);
        std::fs::write(&path, self.render())
            .map_err(|e| format!("failed to write report '{}': {e}", path.display()))?;
        info!("wrote {}", path.display());
        Ok(path)
    }
}

/// Dump raw experiment results as pretty-printed JSON next to the report.
pub fn write_json<T: Serialize>(dir: &Path, filename: &str, value: &T) -> Result<PathBuf, String> {
    std::fs::create_dir_all(dir).map_err(|e| format!("failed to create output dir: {e}"))?;
    let path = dir.join(filename);
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| format!("failed to serialize results: {e}"))?;
    std::fs::write(&path, json)
        .map_err(|e| format!("failed to write results '{}': {e}", path.display()))?;
    info!("wrote {}", path.display());
    Ok(path)
}
