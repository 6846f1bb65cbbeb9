use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use geoingest_core::io::EnviHeader;

#[derive(Args)]
pub struct InfoArgs {
    /// ENVI header (.hdr)
    pub file: PathBuf,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let header = EnviHeader::open(&args.file)?;

    println!("File:        {}", args.file.display());
    println!("Dimensions:  {}x{}", header.samples, header.lines);
    println!("Bands:       {}", header.bands);
    println!("Data type:   {:?}", header.data_type);
    println!("Interleave:  {:?}", header.interleave);
    println!("Byte order:  {:?}", header.byte_order);

    if let Some(nodata) = header.data_ignore_value {
        println!("Nodata:      {}", nodata);
    }
    match header.crs_id() {
        Some(crs) => println!("CRS:         {}", crs),
        None => println!("CRS:         none"),
    }
    if let Some(ref sensor) = header.sensor_type {
        println!("Sensor:      {}", sensor);
    }
    if !header.wavelengths.is_empty() {
        let first = header.wavelengths[0];
        let last = header.wavelengths[header.wavelengths.len() - 1];
        println!("Wavelengths: {:.1}-{:.1} nm", first, last);
    }
    println!("RPC:         {}", if header.rpc.is_some() { "yes" } else { "no" });

    if let Some(bytes) = header.data_byte_size() {
        let total_mb = bytes as f64 / (1024.0 * 1024.0);
        println!("Data size:   {:.1} MB", total_mb);
    }

    Ok(())
}
