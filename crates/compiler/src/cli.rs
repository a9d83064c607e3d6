//! CLI wiring for the kernel generator.

use crate::pipeline::GeneratorConfig;
use crate::session::GenerationSession;
use anyhow::{Context, Result};
use clap::Parser;
use fmhagen_kernels::GeneratorTables;
use std::fs;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "fmhagen",
    about = "Regenerate fused attention kernel instances and dispatch headers"
)]
pub struct Cli {
    /// Directory the headers and `.cu` files are written to.
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,

    /// JSON file replacing the production enumeration tables.
    #[arg(long)]
    pub tables: Option<PathBuf>,

    /// Print a JSON summary of the generated families.
    #[arg(long, default_value_t = false)]
    pub summary: bool,
}

pub fn run_cli(cli: Cli) -> Result<()> {
    tracing_subscriber::fmt::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let Cli {
        out_dir,
        tables,
        summary,
    } = cli;

    let tables = match tables {
        Some(path) => {
            info!(path = %path.display(), "loading generator tables");
            let blob = fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            GeneratorTables::from_json(&blob)
                .with_context(|| format!("parsing {}", path.display()))?
        }
        None => GeneratorTables::production(),
    };

    let session = GenerationSession::new(GeneratorConfig::with_tables(tables), out_dir);
    let report = session.run()?;

    if summary {
        println!("{}", report.to_json()?);
    }
    Ok(())
}
