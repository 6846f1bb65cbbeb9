use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;
use geoingest_core::pipeline::{discover_captures, ingest_batch, CancelToken};
use indicatif::{ProgressBar, ProgressStyle};

use crate::summary::{print_batch_summary, print_config_summary, print_output_summary};

use super::{load_config, record_output};

#[derive(Args)]
pub struct BatchArgs {
    /// Directory of ENVI captures (*.hdr with .img/.dat/.raw payloads)
    pub dir: PathBuf,

    /// Ingestion config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Output root directory
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Append each completed ingestion to this JSON-lines record file
    #[arg(long)]
    pub records: Option<PathBuf>,
}

pub fn run(args: &BatchArgs) -> Result<()> {
    let config = load_config(args.config.as_deref(), args.out.as_ref())?;
    let captures = discover_captures(&args.dir)?;
    if captures.is_empty() {
        bail!("No captures found in {}", args.dir.display());
    }

    print_config_summary(&config);

    let pb = ProgressBar::new(captures.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40}] {pos}/{len}")?
            .progress_chars("=> "),
    );
    pb.set_message("Ingesting captures");

    let results = ingest_batch(&captures, &config, &CancelToken::new(), |done| {
        pb.set_position(done as u64);
    });
    pb.finish_with_message("Done");
    println!();

    for result in &results {
        if let Ok(ref output) = result.outcome {
            print_output_summary(output);
            if let Some(ref records) = args.records {
                record_output(records, output)?;
            }
        }
    }
    print_batch_summary(&results);

    let failed = results.iter().filter(|r| !r.is_success()).count();
    if failed > 0 {
        bail!("{failed} of {} captures failed", results.len());
    }
    Ok(())
}
