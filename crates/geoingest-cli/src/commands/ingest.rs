use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use geoingest_core::pipeline::{ingest_reported, CancelToken, Capture};

use crate::progress::BarReporter;
use crate::summary::{print_config_summary, print_output_summary};

use super::{load_config, record_output};

#[derive(Args)]
pub struct IngestArgs {
    /// ENVI header (.hdr)
    pub header: PathBuf,

    /// Raw payload described by the header
    pub payload: PathBuf,

    /// Sensor name, overriding header and filename detection
    #[arg(long)]
    pub sensor: Option<String>,

    /// RPC sidecar file (KEY: value)
    #[arg(long)]
    pub rpc: Option<PathBuf>,

    /// Ingestion config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Output root directory
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Append the result to this JSON-lines record file
    #[arg(long)]
    pub records: Option<PathBuf>,
}

pub fn run(args: &IngestArgs) -> Result<()> {
    let config = load_config(args.config.as_deref(), args.out.as_ref())?;

    let mut capture = Capture::new(&args.header, &args.payload);
    if let Some(ref sensor) = args.sensor {
        capture = capture.with_sensor_hint(sensor);
    }
    if let Some(ref rpc) = args.rpc {
        capture = capture.with_rpc(rpc);
    }

    print_config_summary(&config);

    let reporter = Arc::new(BarReporter::new());
    let output = match ingest_reported(&capture, &config, reporter.clone(), &CancelToken::new()) {
        Ok(output) => {
            reporter.finish("Done");
            output
        }
        Err(e) => {
            reporter.abandon();
            return Err(e.into());
        }
    };

    println!();
    print_output_summary(&output);

    if let Some(ref records) = args.records {
        record_output(records, &output)?;
    }
    Ok(())
}
