mod common;

use fitsio::FitsFile;
use ndarray::{Array2, Array3};

use finestres_core::io::fits::read_fits;
use finestres_core::io::fits_writer::write_fits;
use finestres_core::io::header::{Card, Header, HeaderValue};

use common::{raw_fits, record};

fn be_bytes<const N: usize>(values: impl IntoIterator<Item = [u8; N]>) -> Vec<u8> {
    values.into_iter().flatten().collect()
}

#[test]
fn test_long_history_is_wrapped() {
    let mut header = Header::new();
    let text = "x".repeat(100);
    header.push_history(&text);

    let entries: Vec<&str> = header.history().collect();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].len(), 72);
    assert_eq!(entries.concat(), text);
}

#[test]
fn test_header_set_replaces_first_value() {
    let mut header = Header::new();
    header.set("IMAGETYP", "Flat");
    header.set("EXPTIME", 2.0);
    header.set("imagetyp", "Master Flat");

    assert_eq!(header.len(), 2);
    assert_eq!(header.get_str("IMAGETYP"), Some("Master Flat"));
    assert!(header.remove("EXPTIME"));
    assert!(!header.contains("EXPTIME"));
}

#[test]
fn test_write_read_roundtrip() {
    let data = Array2::from_shape_fn((3, 5), |(r, c)| r as f64 * 10.0 + c as f64 - 0.25).into_dyn();
    let mut header = Header::new();
    header.set("IMAGETYP", "Light Frame");
    header.set("EXPTIME", 30.0);
    header.set("GAIN", 120i64);
    header.set("COOLED", true);
    header.set("OBSERVER", "O'Brien");
    header.push_history("first step");
    header.push_comment("taken at dusk");

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roundtrip.fits");
    write_fits(&path, &data, &header).unwrap();

    let image = read_fits(&path).unwrap();
    assert_eq!(image.pixels, data);
    assert_eq!(image.header, header);
}

#[test]
fn test_value_comment_roundtrip() {
    let mut header = Header::new();
    header.push(Card::Value {
        keyword: "FILTER".into(),
        value: HeaderValue::Str("Red".into()),
        comment: Some("filter name".into()),
    });

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("comment.fits");
    write_fits(&path, &Array2::<f64>::zeros((2, 2)).into_dyn(), &header).unwrap();

    let image = read_fits(&path).unwrap();
    assert_eq!(image.header, header);
}

#[test]
fn test_created_header_carries_no_extra_comments() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bare.fits");
    write_fits(&path, &Array2::<f64>::ones((2, 3)).into_dyn(), &Header::new()).unwrap();

    let image = read_fits(&path).unwrap();
    assert!(image.header.is_empty(), "{:?}", image.header);
}

#[test]
fn test_color_axes_are_reversed() {
    let data = Array3::from_shape_fn((2, 4, 3), |(y, x, c)| (y * 100 + x * 10 + c) as f64).into_dyn();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("color.fits");
    write_fits(&path, &data, &Header::new()).unwrap();

    let mut fptr = FitsFile::open(&path).unwrap();
    let hdu = fptr.primary_hdu().unwrap();
    assert_eq!(hdu.read_key::<i64>(&mut fptr, "BITPIX").unwrap(), -64);
    assert_eq!(hdu.read_key::<i64>(&mut fptr, "NAXIS1").unwrap(), 3);
    assert_eq!(hdu.read_key::<i64>(&mut fptr, "NAXIS2").unwrap(), 4);
    assert_eq!(hdu.read_key::<i64>(&mut fptr, "NAXIS3").unwrap(), 2);

    let image = read_fits(&path).unwrap();
    assert_eq!(image.pixels.shape(), &[2, 4, 3]);
    assert_eq!(image.pixels[[1, 3, 2]], 132.0);
}

#[test]
fn test_write_overwrites_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("again.fits");
    write_fits(&path, &Array2::<f64>::zeros((8, 8)).into_dyn(), &Header::new()).unwrap();
    write_fits(&path, &Array2::<f64>::ones((2, 2)).into_dyn(), &Header::new()).unwrap();

    let image = read_fits(&path).unwrap();
    assert_eq!(image.pixels.shape(), &[2, 2]);
    assert_eq!(image.pixels[[1, 1]], 1.0);
}

#[test]
fn test_invalid_header_keeps_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("keep.fits");
    write_fits(&path, &Array2::<f64>::ones((2, 2)).into_dyn(), &Header::new()).unwrap();

    let mut long_keyword = Header::new();
    long_keyword.set("EXPOSURETIME", 1.0);
    assert!(write_fits(&path, &Array2::<f64>::zeros((2, 2)).into_dyn(), &long_keyword).is_err());

    let mut not_finite = Header::new();
    not_finite.set("EXPTIME", f64::NAN);
    assert!(write_fits(&path, &Array2::<f64>::zeros((2, 2)).into_dyn(), &not_finite).is_err());

    let image = read_fits(&path).unwrap();
    assert_eq!(image.pixels[[0, 0]], 1.0);
}

#[test]
fn test_read_int16_with_bzero_and_blank() {
    let data = be_bytes([-32768i16, 0, 100, -1].map(i16::to_be_bytes));
    let bytes = raw_fits(
        &[
            &record("SIMPLE", "T"),
            &record("BITPIX", "16"),
            &record("NAXIS", "2"),
            &record("NAXIS1", "2"),
            &record("NAXIS2", "2"),
            &record("BZERO", "32768"),
            &record("BLANK", "-1"),
            "IMAGETYP= 'Dark Frame'",
        ],
        &data,
    );

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("int16.fits");
    std::fs::write(&path, bytes).unwrap();

    let image = read_fits(&path).unwrap();
    assert_eq!(image.pixels.shape(), &[2, 2]);
    assert_eq!(image.pixels[[0, 0]], 0.0);
    assert_eq!(image.pixels[[0, 1]], 32768.0);
    assert_eq!(image.pixels[[1, 0]], 32868.0);
    assert!(image.pixels[[1, 1]].is_nan());
    assert!(!image.header.contains("BZERO"));
    assert_eq!(image.header.get_str("IMAGETYP"), Some("Dark Frame"));
}

#[test]
fn test_read_image_extension() {
    let data = be_bytes([1.5f32, 2.5].map(f32::to_be_bytes));
    let mut bytes = raw_fits(
        &[
            &record("SIMPLE", "T"),
            &record("BITPIX", "8"),
            &record("NAXIS", "0"),
            &record("EXTEND", "T"),
        ],
        &[],
    );
    bytes.extend(raw_fits(
        &[
            "XTENSION= 'IMAGE   '",
            &record("BITPIX", "-32"),
            &record("NAXIS", "2"),
            &record("NAXIS1", "2"),
            &record("NAXIS2", "1"),
            &record("PCOUNT", "0"),
            &record("GCOUNT", "1"),
        ],
        &data,
    ));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ext.fits");
    std::fs::write(&path, bytes).unwrap();

    let image = read_fits(&path).unwrap();
    assert_eq!(image.pixels.shape(), &[1, 2]);
    assert_eq!(image.pixels[[0, 1]], 2.5);
    assert!(!image.header.contains("XTENSION"));
}

#[test]
fn test_empty_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.fits");
    std::fs::write(&path, b"").unwrap();
    assert!(read_fits(&path).is_err());
}

#[test]
fn test_table_only_file_fails() {
    let mut bytes = raw_fits(
        &[
            &record("SIMPLE", "T"),
            &record("BITPIX", "8"),
            &record("NAXIS", "0"),
            &record("EXTEND", "T"),
        ],
        &[],
    );
    bytes.extend(raw_fits(
        &[
            "XTENSION= 'BINTABLE'",
            &record("BITPIX", "8"),
            &record("NAXIS", "2"),
            &record("NAXIS1", "4"),
            &record("NAXIS2", "2"),
            &record("PCOUNT", "0"),
            &record("GCOUNT", "1"),
            &record("TFIELDS", "1"),
            "TFORM1  = '4A      '",
        ],
        &[0u8; 8],
    ));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("table.fits");
    std::fs::write(&path, bytes).unwrap();

    let err = read_fits(&path).unwrap_err();
    assert!(err.to_string().contains("image data"), "{err}");
}

#[test]
fn test_truncated_data_fails() {
    let bytes = raw_fits(
        &[
            &record("SIMPLE", "T"),
            &record("BITPIX", "-64"),
            &record("NAXIS", "2"),
            &record("NAXIS1", "100"),
            &record("NAXIS2", "100"),
        ],
        &[],
    );

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("short.fits");
    std::fs::write(&path, &bytes[..2880]).unwrap();
    assert!(read_fits(&path).is_err());
}

#[test]
fn test_oversized_axes_fail_without_panicking() {
    let dir = tempfile::tempdir().unwrap();
    for (name, axis) in [("overflow.fits", "4294967296"), ("huge.fits", "2147483648")] {
        let bytes = raw_fits(
            &[
                &record("SIMPLE", "T"),
                &record("BITPIX", "-64"),
                &record("NAXIS", "2"),
                &record("NAXIS1", axis),
                &record("NAXIS2", axis),
            ],
            &[],
        );
        let path = dir.path().join(name);
        std::fs::write(&path, bytes).unwrap();
        assert!(read_fits(&path).is_err(), "{name}");
    }
}
