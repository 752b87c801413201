//! Check command handler.
//!
//! Reports selector counts and the fragment count a split would produce,
//! without writing anything.

use crate::files;
use anyhow::{Context, Result};
use blessed_core::config::AppConfig;
use blessed_split::{Chunker, RuleChunker};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

/// Report selector counts without writing files
#[derive(Args, Debug)]
pub struct CheckCommand {
    /// Stylesheets or directories to check
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Maximum selectors per output stylesheet
    #[arg(long)]
    pub max_selectors: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckReport {
    pub input: PathBuf,
    pub selectors: usize,
    pub fragments: usize,
}

impl CheckCommand {
    pub async fn execute(&self, config: &AppConfig) -> Result<()> {
        tracing::info!("Executing check command");

        let max = self.max_selectors.unwrap_or(config.split.max_selectors);
        let chunker = RuleChunker::new(max);

        let mut reports = Vec::new();
        for stylesheet in files::collect_stylesheets(&config.workspace, &self.inputs)? {
            reports.push(check_file(&chunker, stylesheet.path).await?);
        }

        if self.json {
            println!("{}", serde_json::to_string_pretty(&reports)?);
        } else {
            for report in &reports {
                println!(
                    "{}: {} selectors, {} fragment(s) at limit {}",
                    report.input.display(),
                    report.selectors,
                    report.fragments,
                    chunker.max_selectors()
                );
            }
        }

        Ok(())
    }
}

async fn check_file(chunker: &RuleChunker, file: PathBuf) -> Result<CheckReport> {
    let text = tokio::fs::read_to_string(&file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    if text.is_empty() {
        return Ok(CheckReport {
            input: file,
            selectors: 0,
            fragments: 1,
        });
    }

    let output = chunker
        .chunk(&text, &file, false)
        .with_context(|| format!("Failed to check {}", file.display()))?;

    Ok(CheckReport {
        input: file,
        selectors: output.total_selector_count,
        fragments: output.chunks.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_check_file_counts() {
        let temp = TempDir::new().unwrap();
        let css = temp.path().join("site.css");
        std::fs::write(&css, "a, b{}\n@media print{c{}}\nd{}").unwrap();

        let report = check_file(&RuleChunker::new(2), css.clone()).await.unwrap();
        assert_eq!(report.selectors, 4);
        assert_eq!(report.fragments, 2);

        // nothing was written
        assert!(!temp.path().join("site-blessed1.css").exists());
    }

    #[tokio::test]
    async fn test_check_empty_file() {
        let temp = TempDir::new().unwrap();
        let css = temp.path().join("empty.css");
        std::fs::write(&css, "").unwrap();

        let report = check_file(&RuleChunker::default(), css).await.unwrap();
        assert_eq!(report.selectors, 0);
        assert_eq!(report.fragments, 1);
    }
}
