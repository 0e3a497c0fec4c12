use std::path::Path;

use fitsio::images::{ImageDescription, ImageType};
use fitsio::FitsFile;
use ndarray::ArrayD;
use tracing::debug;

use crate::error::{FinestresError, Result};
use crate::io::fits::is_structural_keyword;
use crate::io::header::{Card, Header, HeaderValue};
use crate::io::records::{write_comment, write_commentary, write_logical};

/// Maximum keyword length in a fixed-format record.
const KEYWORD_WIDTH: usize = 8;

/// Longest string value that fits in one record.
const STRING_VALUE_WIDTH: usize = 68;

/// Write pixels and header to `path` as a single primary HDU of `f64`
/// samples, overwriting any existing file.
///
/// Structural keywords present in `header` are ignored and regenerated from
/// the array shape.
pub fn write_fits(path: &Path, pixels: &ArrayD<f64>, header: &Header) -> Result<()> {
    if pixels.ndim() == 0 {
        return Err(FinestresError::InvalidFits(
            "cannot write a zero-dimensional array".into(),
        ));
    }
    // A header that cannot be written must not cost the existing file.
    validate_header(header)?;

    // fitsio won't overwrite
    if path.exists() {
        std::fs::remove_file(path)?;
    }

    let description = ImageDescription {
        data_type: ImageType::Double,
        dimensions: pixels.shape(),
    };
    let mut fptr = FitsFile::create(path)
        .with_custom_primary(&description)
        .open()?;
    let hdu = fptr.primary_hdu()?;

    let data: Vec<f64> = pixels.iter().copied().collect();
    hdu.write_image(&mut fptr, &data)?;

    for card in header.cards() {
        match card {
            Card::Value { keyword, .. } if is_structural_keyword(keyword) => continue,
            Card::Value {
                keyword,
                value,
                comment,
            } => {
                match value {
                    HeaderValue::Str(s) => hdu.write_key(&mut fptr, keyword, s.clone())?,
                    HeaderValue::Int(i) => hdu.write_key(&mut fptr, keyword, *i)?,
                    HeaderValue::Float(v) => hdu.write_key(&mut fptr, keyword, *v)?,
                    HeaderValue::Bool(b) => write_logical(&mut fptr, keyword, *b)?,
                }
                if let Some(comment) = comment {
                    write_comment(&mut fptr, keyword, comment)?;
                }
            }
            Card::Commentary { keyword, text } => write_commentary(&mut fptr, keyword, text)?,
        }
    }

    debug!(path = %path.display(), shape = ?pixels.shape(), cards = header.len(), "Wrote FITS file");
    Ok(())
}

fn validate_header(header: &Header) -> Result<()> {
    for card in header.cards() {
        let keyword = card.keyword();
        let valid = keyword.len() <= KEYWORD_WIDTH
            && keyword
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'-' || b == b'_');
        if !valid {
            return Err(FinestresError::InvalidFits(format!(
                "invalid keyword '{keyword}'"
            )));
        }

        match card {
            Card::Value { value, comment, .. } => {
                match value {
                    HeaderValue::Str(s) if s.len() > STRING_VALUE_WIDTH || !s.is_ascii() => {
                        return Err(FinestresError::InvalidFits(format!(
                            "string value of {keyword} does not fit in one record"
                        )));
                    }
                    HeaderValue::Float(v) if !v.is_finite() => {
                        return Err(FinestresError::InvalidFits(format!(
                            "non-finite value {v} for {keyword}"
                        )));
                    }
                    _ => {}
                }
                if comment.as_deref().is_some_and(|c| !c.is_ascii()) {
                    return Err(FinestresError::InvalidFits(format!(
                        "non-ASCII comment in {keyword} record"
                    )));
                }
            }
            Card::Commentary { text, .. } if !text.is_ascii() => {
                return Err(FinestresError::InvalidFits(format!(
                    "non-ASCII content in {keyword} record"
                )));
            }
            Card::Commentary { .. } => {}
        }
    }
    Ok(())
}
