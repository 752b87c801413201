//! Split command handler.
//!
//! Splits each stylesheet that exceeds the selector limit and writes the
//! fragments, sequentially, through a single plugin instance.

use crate::files::{self, Stylesheet};
use anyhow::{Context, Result};
use blessed_core::{config::AppConfig, SplitOptions};
use blessed_split::{Bless, Document, SourceMap};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

/// Split stylesheets that exceed the selector limit
#[derive(Args, Debug)]
pub struct SplitCommand {
    /// Stylesheets or directories to process
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Write outputs here instead of next to each input
    #[arg(short, long)]
    pub out_dir: Option<PathBuf>,

    /// Do not inject @import lines into the first fragment
    #[arg(long)]
    pub no_imports: bool,

    /// Do not append a cache-busting query to injected imports
    #[arg(long)]
    pub no_cache_buster: bool,

    /// Maximum selectors per output stylesheet
    #[arg(long)]
    pub max_selectors: Option<usize>,

    /// Read `<file>.map` and write a map for every fragment
    #[arg(long)]
    pub source_maps: bool,

    /// Log a summary line per stylesheet
    #[arg(long)]
    pub log: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Per-input result printed with `--json`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitReport {
    pub input: PathBuf,
    pub selectors: Option<usize>,
    pub split: bool,
    pub outputs: Vec<PathBuf>,
}

impl SplitCommand {
    pub async fn execute(&self, config: &AppConfig) -> Result<()> {
        tracing::info!("Executing split command");
        tracing::debug!("Split options: {:?}", self);

        let options = self.options(&config.split);
        let files = files::collect_stylesheets(&config.workspace, &self.inputs)?;
        let mut bless = Bless::new(options);

        let mut reports = Vec::with_capacity(files.len());
        for stylesheet in files {
            let report = self.split_one(&mut bless, config, stylesheet).await?;
            reports.push(report);
        }

        if self.json {
            println!("{}", serde_json::to_string_pretty(&reports)?);
        } else {
            for report in &reports {
                println!(
                    "{} -> {} file(s)",
                    report.input.display(),
                    report.outputs.len()
                );
            }
        }

        Ok(())
    }

    /// Combine the configured options with command-line flags.
    fn options(&self, configured: &SplitOptions) -> SplitOptions {
        let mut options = configured.clone();
        if self.no_imports {
            options.imports = false;
        }
        if self.no_cache_buster {
            options.cache_buster = false;
        }
        if let Some(max) = self.max_selectors {
            options.max_selectors = max;
        }
        if self.log {
            options.log = true;
        }
        options.source_maps = self.source_maps;
        options
    }

    async fn split_one(
        &self,
        bless: &mut Bless,
        config: &AppConfig,
        stylesheet: Stylesheet,
    ) -> Result<SplitReport> {
        let document =
            files::load_document(&config.workspace, &stylesheet, self.source_maps).await?;
        let file = stylesheet.path;

        let mut outputs = Vec::new();
        let selectors = match bless
            .plan(&document)
            .with_context(|| format!("Failed to split {}", file.display()))?
        {
            Some(split_plan) => {
                let selectors = split_plan.total_selector_count();
                bless.emit_plan(split_plan, &document, |output| outputs.push(output));
                if let Some(ref upstream) = document.source_map {
                    trace_upstream(&mut outputs, upstream)
                        .with_context(|| format!("Invalid source map for {}", file.display()))?;
                }
                Some(selectors)
            }
            None => {
                outputs.push(document);
                None
            }
        };

        if let Some(ref out_dir) = self.out_dir {
            outputs = outputs
                .into_iter()
                .map(|output| files::rebase(output, out_dir))
                .collect();
        }

        let written = files::write_outputs(&outputs).await?;

        Ok(SplitReport {
            input: file,
            selectors,
            split: written.len() > 1,
            outputs: written,
        })
    }
}

/// Point fragment maps at the sources behind the input's own map, so a
/// map written over the input's `.map` keeps its upstream link.
fn trace_upstream(outputs: &mut [Document], upstream: &SourceMap) -> Result<()> {
    for output in outputs.iter_mut() {
        if let Some(map) = output.source_map.take() {
            output.source_map = Some(map.apply_upstream(upstream)?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn command(inputs: Vec<PathBuf>) -> SplitCommand {
        SplitCommand {
            inputs,
            out_dir: None,
            no_imports: false,
            no_cache_buster: true,
            max_selectors: Some(2),
            source_maps: false,
            log: false,
            json: false,
        }
    }

    #[test]
    fn test_flags_override_config() {
        let mut cmd = command(vec![]);
        cmd.no_imports = true;
        cmd.log = true;

        let options = cmd.options(&SplitOptions::default());
        assert!(!options.imports);
        assert!(!options.cache_buster);
        assert!(options.log);
        assert_eq!(options.max_selectors, 2);
        assert!(!options.source_maps);
    }

    #[tokio::test]
    async fn test_split_writes_fragments_next_to_input() {
        let temp = TempDir::new().unwrap();
        let css = temp.path().join("site.css");
        std::fs::write(&css, "a{}\nb{}\nc{}\n").unwrap();

        let config = AppConfig::in_workspace(temp.path());
        command(vec![css.clone()]).execute(&config).await.unwrap();

        let primary = std::fs::read_to_string(&css).unwrap();
        assert_eq!(primary, "@import url('site-blessed1.css');\n\na{}\nb{}");
        let second = std::fs::read_to_string(temp.path().join("site-blessed1.css")).unwrap();
        assert_eq!(second, "\nc{}\n");
    }

    #[tokio::test]
    async fn test_split_into_out_dir_with_maps() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        let out = temp.path().join("dist");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::write(src.join("site.css"), "a{}\nb{}\nc{}\n").unwrap();
        std::fs::write(
            src.join("site.css.map"),
            r#"{"version":3,"sources":["site.scss"],"names":[],"mappings":""}"#,
        )
        .unwrap();

        let mut cmd = command(vec![src.clone()]);
        cmd.out_dir = Some(out.clone());
        cmd.source_maps = true;

        let config = AppConfig::in_workspace(temp.path());
        let mut bless = Bless::new(cmd.options(&config.split));
        let files = files::collect_stylesheets(&config.workspace, &cmd.inputs).unwrap();
        let report = cmd.split_one(&mut bless, &config, files[0].clone()).await.unwrap();

        assert!(report.split);
        assert_eq!(report.selectors, Some(3));
        assert_eq!(
            report.outputs,
            vec![out.join("site.css"), out.join("site-blessed1.css")]
        );

        let map_json = std::fs::read_to_string(out.join("site-blessed1.css.map")).unwrap();
        let map: blessed_split::SourceMap = serde_json::from_str(&map_json).unwrap();
        assert_eq!(map.file.as_deref(), Some("site-blessed1.css"));
        assert_eq!(map.sources, vec!["site.css".to_string()]);

        // the input itself is left alone
        let original = std::fs::read_to_string(src.join("site.css")).unwrap();
        assert_eq!(original, "a{}\nb{}\nc{}\n");
    }

    #[tokio::test]
    async fn test_split_in_place_keeps_upstream_sources() {
        let temp = TempDir::new().unwrap();
        let css = temp.path().join("site.css");
        std::fs::write(&css, "a{}\nb{}\nc{}\n").unwrap();
        std::fs::write(
            files::map_path(&css),
            r#"{"version":3,"sources":["site.scss"],"names":[],"mappings":"AAAA;AACA;AACA"}"#,
        )
        .unwrap();

        let mut cmd = command(vec![css.clone()]);
        cmd.source_maps = true;
        let config = AppConfig::in_workspace(temp.path());
        cmd.execute(&config).await.unwrap();

        let primary: SourceMap =
            serde_json::from_str(&std::fs::read_to_string(files::map_path(&css)).unwrap())
                .unwrap();
        assert_eq!(primary.file.as_deref(), Some("site.css"));
        assert_eq!(primary.sources, vec!["site.scss".to_string()]);
        assert_eq!(primary.mappings, "AAAA;AACA");

        let second_map = temp.path().join("site-blessed1.css.map");
        let second: SourceMap =
            serde_json::from_str(&std::fs::read_to_string(second_map).unwrap()).unwrap();
        assert_eq!(second.file.as_deref(), Some("site-blessed1.css"));
        assert_eq!(second.sources, vec!["site.scss".to_string()]);
        assert_eq!(second.mappings, ";AAEA;");
    }

    #[tokio::test]
    async fn test_out_dir_keeps_same_named_files_apart() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        let out = temp.path().join("dist");
        std::fs::create_dir_all(src.join("a")).unwrap();
        std::fs::create_dir_all(src.join("b")).unwrap();
        std::fs::write(src.join("a/site.css"), "a{}").unwrap();
        std::fs::write(src.join("b/site.css"), "b{}").unwrap();

        let mut cmd = command(vec![PathBuf::from("src")]);
        cmd.out_dir = Some(out.clone());
        let config = AppConfig::in_workspace(temp.path());
        cmd.execute(&config).await.unwrap();

        assert_eq!(std::fs::read_to_string(out.join("a/site.css")).unwrap(), "a{}");
        assert_eq!(std::fs::read_to_string(out.join("b/site.css")).unwrap(), "b{}");
        assert!(!out.join("site.css").exists());
    }

    #[tokio::test]
    async fn test_split_reports_malformed_input() {
        let temp = TempDir::new().unwrap();
        let css = temp.path().join("broken.css");
        std::fs::write(&css, "a{color:red").unwrap();

        let config = AppConfig::in_workspace(temp.path());
        let err = command(vec![css]).execute(&config).await.unwrap_err();

        assert!(format!("{:#}", err).contains("Unclosed block"));
    }
}
