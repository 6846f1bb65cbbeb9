use std::fs;
use std::path::Path;

use geoingest_core::io::RpcModel;
use geoingest_core::pipeline::Capture;

/// Equidistant cylindrical on the web mercator sphere: near the equator its
/// metres coincide with mercator metres.
pub const EQC_PROJ: &str = "+proj=eqc +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +R=6378137 +units=m +no_defs";

/// `map info` + `coordinate system string` lines for an EQC grid whose
/// top-left corner is `(x0, y0)` metres.
pub fn eqc_georef(x0: f64, y0: f64, pixel: f64) -> String {
    format!(
        "map info = {{Arbitrary, 1, 1, {x0}, {y0}, {pixel}, {pixel}, units=Meters}}\n\
         coordinate system string = {{{EQC_PROJ}}}\n"
    )
}

/// `map info` line for a WGS84 lon/lat grid with top-left corner `(lon0, lat0)`.
pub fn geographic_georef(lon0: f64, lat0: f64, pixel_deg: f64) -> String {
    format!(
        "map info = {{Geographic Lat/Lon, 1, 1, {lon0}, {lat0}, {pixel_deg}, {pixel_deg}, WGS-84, units=Degrees}}\n"
    )
}

/// Row-major band where each sample is `row * width + col`.
pub fn ramp_band(width: usize, height: usize) -> Vec<f32> {
    (0..width * height).map(|i| i as f32).collect()
}

pub fn constant_band(width: usize, height: usize, value: f32) -> Vec<f32> {
    vec![value; width * height]
}

fn header_text(width: usize, height: usize, bands: usize, data_type: u32, interleave: &str, byte_order: u8, extra: &str) -> String {
    format!(
        "ENVI\n\
         description = {{synthetic capture}}\n\
         samples = {width}\n\
         lines = {height}\n\
         bands = {bands}\n\
         header offset = 0\n\
         file type = ENVI Standard\n\
         data type = {data_type}\n\
         interleave = {interleave}\n\
         byte order = {byte_order}\n\
         {extra}"
    )
}

/// Write a little-endian float32 BSQ capture `{name}.hdr` / `{name}.img`.
pub fn write_envi_f32(dir: &Path, name: &str, width: usize, height: usize, bands: &[Vec<f32>], extra_header: &str) -> Capture {
    let header = dir.join(format!("{name}.hdr"));
    let payload = dir.join(format!("{name}.img"));
    fs::write(&header, header_text(width, height, bands.len(), 4, "bsq", 0, extra_header)).unwrap();

    let mut bytes = Vec::with_capacity(width * height * bands.len() * 4);
    for band in bands {
        assert_eq!(band.len(), width * height);
        for v in band {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
    }
    fs::write(&payload, bytes).unwrap();
    Capture::new(header, payload)
}

/// Write a uint16 capture in any interleave and byte order.
pub fn write_envi_u16(
    dir: &Path,
    name: &str,
    width: usize,
    height: usize,
    bands: &[Vec<u16>],
    interleave: &str,
    big_endian: bool,
) -> Capture {
    let header = dir.join(format!("{name}.hdr"));
    let payload = dir.join(format!("{name}.dat"));
    let byte_order = u8::from(big_endian);
    fs::write(&header, header_text(width, height, bands.len(), 12, interleave, byte_order, "")).unwrap();

    let nb = bands.len();
    let mut samples = Vec::with_capacity(width * height * nb);
    for i in 0..width * height * nb {
        let (band, row, col) = match interleave {
            "bsq" => (i / (width * height), (i / width) % height, i % width),
            "bil" => ((i / width) % nb, i / (width * nb), i % width),
            "bip" => (i % nb, i / (width * nb), (i / nb) % width),
            other => panic!("unknown interleave {other}"),
        };
        samples.push(bands[band][row * width + col]);
    }
    let bytes: Vec<u8> = samples
        .iter()
        .flat_map(|v| if big_endian { v.to_be_bytes() } else { v.to_le_bytes() })
        .collect();
    fs::write(&payload, bytes).unwrap();
    Capture::new(header, payload)
}

/// Linear RPC consistent with a `width x height` lon/lat grid whose top-left
/// corner is `(lon0, lat0)`, optionally claiming the image is displaced by
/// `col_shift` columns.
pub fn linear_rpc(lon0: f64, lat0: f64, pixel_deg: f64, width: usize, height: usize, col_shift: f64) -> RpcModel {
    let (half_w, half_h) = (width as f64 / 2.0, height as f64 / 2.0);
    let mut line_num = [0.0; 20];
    let mut samp_num = [0.0; 20];
    let mut den = [0.0; 20];
    line_num[2] = -1.0;
    samp_num[1] = 1.0;
    den[0] = 1.0;
    RpcModel {
        line_off: half_h - 0.5,
        samp_off: half_w - 0.5 + col_shift,
        lat_off: lat0 - half_h * pixel_deg,
        long_off: lon0 + half_w * pixel_deg,
        height_off: 0.0,
        line_scale: half_h,
        samp_scale: half_w,
        lat_scale: half_h * pixel_deg,
        long_scale: half_w * pixel_deg,
        height_scale: 1.0,
        line_num,
        line_den: den,
        samp_num,
        samp_den: den,
    }
}

/// Serialize a model as a `KEY: value` sidecar.
pub fn rpc_sidecar_text(rpc: &RpcModel) -> String {
    let mut text = format!(
        "LINE_OFF: {} pixels\nSAMP_OFF: {} pixels\nLAT_OFF: {} degrees\nLONG_OFF: {} degrees\n\
         HEIGHT_OFF: {} meters\nLINE_SCALE: {} pixels\nSAMP_SCALE: {} pixels\nLAT_SCALE: {} degrees\n\
         LONG_SCALE: {} degrees\nHEIGHT_SCALE: {} meters\n",
        rpc.line_off,
        rpc.samp_off,
        rpc.lat_off,
        rpc.long_off,
        rpc.height_off,
        rpc.line_scale,
        rpc.samp_scale,
        rpc.lat_scale,
        rpc.long_scale,
        rpc.height_scale,
    );
    for (prefix, coeffs) in [
        ("LINE_NUM_COEFF", &rpc.line_num),
        ("LINE_DEN_COEFF", &rpc.line_den),
        ("SAMP_NUM_COEFF", &rpc.samp_num),
        ("SAMP_DEN_COEFF", &rpc.samp_den),
    ] {
        for (i, c) in coeffs.iter().enumerate() {
            text.push_str(&format!("{prefix}_{}: {c:e}\n", i + 1));
        }
    }
    text
}
