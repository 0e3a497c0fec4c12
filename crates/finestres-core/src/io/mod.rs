pub mod fits;
pub mod fits_writer;
pub mod header;
mod records;

use std::path::{Path, PathBuf};

use crate::consts::FITS_EXTENSIONS;
use crate::error::Result;

pub use fits::{read_fits, FitsImage};
pub use fits_writer::write_fits;
pub use header::{Card, Header, HeaderValue};

/// Whether `path` carries one of the FITS file extensions (case-insensitive).
pub fn is_fits_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            FITS_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// FITS files directly inside `dir`, sorted by path.
pub fn list_fits_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_fits_path(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
