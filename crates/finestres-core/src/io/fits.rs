use std::path::Path;

use fitsio::hdu::{FitsHdu, HduInfo};
use fitsio::images::ImageType;
use fitsio::FitsFile;
use ndarray::{ArrayD, IxDyn};
use tracing::debug;

use crate::error::{FinestresError, Result};
use crate::io::header::{Card, Header};
use crate::io::records::read_cards;

/// Keywords that describe the data layout. They are consumed by the reader
/// and regenerated by the writer, never kept in a frame's header.
const STRUCTURAL_KEYWORDS: &[&str] = &[
    "SIMPLE", "XTENSION", "BITPIX", "NAXIS", "EXTEND", "BZERO", "BSCALE", "BLANK", "PCOUNT",
    "GCOUNT", "END",
];

pub fn is_structural_keyword(keyword: &str) -> bool {
    STRUCTURAL_KEYWORDS.contains(&keyword)
        || keyword
            .strip_prefix("NAXIS")
            .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

/// Image payload and metadata of one HDU.
#[derive(Clone, Debug)]
pub struct FitsImage {
    /// Pixel data with axes in C order (reverse of `NAXISn`).
    pub pixels: ArrayD<f64>,
    /// Non-structural header cards.
    pub header: Header,
}

/// Read the first HDU that carries image data: the primary HDU, or the
/// first `IMAGE` extension when the primary array is empty.
pub fn read_fits(path: &Path) -> Result<FitsImage> {
    let file_len = std::fs::metadata(path)?.len();
    let mut fptr = FitsFile::open(path)?;

    let mut index: usize = 0;
    while let Ok(hdu) = fptr.hdu(index) {
        let (shape, pixel_size, is_integer) = match &hdu.info {
            HduInfo::ImageInfo { shape, image_type } => (
                shape.clone(),
                bytes_per_pixel(image_type),
                !matches!(image_type, ImageType::Float | ImageType::Double),
            ),
            _ => {
                index += 1;
                continue;
            }
        };

        let count = element_count(&shape)?;
        if count > 0 {
            let data_len = count
                .checked_mul(pixel_size)
                .filter(|&len| len as u64 <= file_len)
                .ok_or_else(|| {
                    FinestresError::InvalidFits(format!(
                        "HDU {index} is truncated: {shape:?} pixels do not fit in {file_len} bytes"
                    ))
                })?;
            debug!(hdu = index, shape = ?shape, bytes = data_len, "Found image HDU");

            let pixels = read_pixels(&mut fptr, &hdu, is_integer)?;
            let pixels = ArrayD::from_shape_vec(IxDyn(&shape), pixels).map_err(|e| {
                FinestresError::InvalidFits(format!("bad image shape {shape:?}: {e}"))
            })?;
            let header = user_header(read_cards(&mut fptr)?);
            return Ok(FitsImage { pixels, header });
        }
        index += 1;
    }

    if index == 0 {
        Err(FinestresError::InvalidFits("no HDU found".into()))
    } else {
        Err(FinestresError::InvalidFits(format!(
            "none of the {index} HDU(s) contains image data"
        )))
    }
}

/// Number of pixels in an image of `shape`. Header-supplied sizes may be
/// arbitrary, so the product is checked.
fn element_count(shape: &[usize]) -> Result<usize> {
    if shape.is_empty() {
        return Ok(0);
    }
    shape
        .iter()
        .try_fold(1usize, |acc, &len| acc.checked_mul(len))
        .ok_or_else(|| FinestresError::InvalidFits(format!("image size {shape:?} overflows")))
}

fn bytes_per_pixel(image_type: &ImageType) -> usize {
    match image_type {
        ImageType::UnsignedByte | ImageType::Byte => 1,
        ImageType::Short | ImageType::UnsignedShort => 2,
        ImageType::Long | ImageType::UnsignedLong | ImageType::Float => 4,
        ImageType::LongLong | ImageType::Double => 8,
    }
}

/// Pixels as `f64`. cfitsio applies `BSCALE`/`BZERO`; integer samples equal
/// to `BLANK` become NaN.
fn read_pixels(fptr: &mut FitsFile, hdu: &FitsHdu, is_integer: bool) -> Result<Vec<f64>> {
    let mut pixels: Vec<f64> = hdu.read_image(fptr)?;
    if is_integer {
        if let Ok(blank) = hdu.read_key::<i64>(fptr, "BLANK") {
            let bscale = hdu.read_key::<f64>(fptr, "BSCALE").unwrap_or(1.0);
            let bzero = hdu.read_key::<f64>(fptr, "BZERO").unwrap_or(0.0);
            let null = blank as f64 * bscale + bzero;
            pixels
                .iter_mut()
                .filter(|v| **v == null)
                .for_each(|v| *v = f64::NAN);
        }
    }
    Ok(pixels)
}

fn user_header(cards: Vec<Card>) -> Header {
    let mut header = Header::new();
    for card in cards {
        let structural = matches!(&card, Card::Value { keyword, .. } if is_structural_keyword(keyword));
        if !structural {
            header.push(card);
        }
    }
    header
}
