#![allow(dead_code)]

use std::path::{Path, PathBuf};

use ndarray::Array2;

use finestres_core::frame::Frame;
use finestres_core::io::header::Header;

/// Header carrying the classification keywords that are `Some`.
pub fn header_with(role: Option<&str>, exposure: Option<f64>, filter: Option<&str>) -> Header {
    let mut header = Header::new();
    if let Some(role) = role {
        header.set("IMAGETYP", role);
    }
    if let Some(exposure) = exposure {
        header.set("EXPTIME", exposure);
    }
    if let Some(filter) = filter {
        header.set("FILTER", filter);
    }
    header
}

/// In-memory 2-D frame named `name`.
pub fn make_frame(
    name: &str,
    data: Array2<f64>,
    role: Option<&str>,
    exposure: Option<f64>,
    filter: Option<&str>,
) -> Frame {
    Frame::from_pixels(
        PathBuf::from(name),
        data.into_dyn(),
        header_with(role, exposure, filter),
    )
}

pub fn filled(value: f64) -> Array2<f64> {
    Array2::from_elem((4, 4), value)
}

pub fn dark(name: &str, value: f64, exposure: f64) -> Frame {
    make_frame(name, filled(value), Some("Dark Frame"), Some(exposure), None)
}

pub fn flat(name: &str, data: Array2<f64>, exposure: f64, filter: &str) -> Frame {
    make_frame(name, data, Some("Flat"), Some(exposure), Some(filter))
}

/// Save `frame` into `dir` under its own title and return the path.
pub fn write_frame(dir: &Path, frame: &Frame) -> PathBuf {
    let path = dir.join(frame.title());
    frame.clone().save_as(&path).unwrap();
    path
}

/// Assemble a FITS file from raw header records and a data payload.
///
/// Each record is padded to 80 characters, `END` is appended and both the
/// header and the data are padded to whole 2880-byte blocks.
pub fn raw_fits(records: &[&str], data: &[u8]) -> Vec<u8> {
    let mut buf = Vec::new();
    for record in records {
        buf.extend_from_slice(format!("{record:<80}").as_bytes());
    }
    buf.extend_from_slice(format!("{:<80}", "END").as_bytes());
    let header_len = buf.len().div_ceil(2880) * 2880;
    buf.resize(header_len, b' ');
    buf.extend_from_slice(data);
    let total = buf.len().div_ceil(2880) * 2880;
    buf.resize(total, 0);
    buf
}

/// Header record `KEYWORD = value` with the value starting in column 11.
pub fn record(keyword: &str, value: &str) -> String {
    format!("{keyword:<8}= {value:>20}")
}
