//! Command-line arguments.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use torch_core::QueryOverrides;

#[derive(Parser, Debug)]
#[command(name = "torch")]
#[command(about = "Audio-reactive feedback visualizer", long_about = None)]
pub struct Args {
    /// Parameter overrides as `name=value`, highest precedence
    #[arg(value_name = "NAME=VALUE")]
    pub overrides: Vec<String>,

    /// Query string of overrides, e.g. "grow=0.001&spin=0.01"
    #[arg(long, value_name = "QUERY", default_value = "")]
    pub query: String,

    /// File holding a query string; re-read when R is pressed
    #[arg(long, value_name = "PATH")]
    pub params_file: Option<PathBuf>,

    /// Log per-frame audio statistics
    #[arg(long)]
    pub debug: bool,

    #[arg(long, default_value_t = 1280)]
    pub width: u32,

    #[arg(long, default_value_t = 720)]
    pub height: u32,

    /// Base URL used when printing the shareable state
    #[arg(long, value_name = "URL", default_value = "http://localhost:8080/")]
    pub share_base: String,
}

impl Args {
    /// Collect overrides: positional pairs win over `--query`, which wins
    /// over the params file.
    pub fn overrides(&self) -> anyhow::Result<QueryOverrides> {
        let mut q = QueryOverrides::default();
        for pair in &self.overrides {
            q.merge_query(pair);
        }
        q.merge_query(&self.query);
        if let Some(path) = &self.params_file {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading params file {}", path.display()))?;
            for line in text.lines() {
                q.merge_query(line);
            }
        }
        Ok(q)
    }
}
