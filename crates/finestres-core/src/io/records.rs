//! Header record access that `fitsio` does not wrap: walking every keyword of
//! the current HDU and appending commentary cards.

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};

use fitsio::FitsFile;
use fitsio_sys as sys;

use crate::error::{FinestresError, Result};
use crate::io::header::{Card, HeaderValue};

// `ffc2s` is exported by cfitsio but declared in its internal `fitsio2.h`,
// so `fitsio-sys` does not generate a binding for it.
extern "C" {
    fn ffc2s(instr: *const c_char, outstr: *mut c_char, status: *mut c_int) -> c_int;
}

/// Large enough for any keyword name, value or comment of one record.
const RECORD_BUFFER: usize = 81;

/// Comment lines cfitsio adds to every primary header it creates.
const CFITSIO_BOILERPLATE: &[&str] = &[
    "FITS (Flexible Image Transport System) format is defined in 'Astronomy",
    "and Astrophysics', volume 376, page 359; bibcode: 2001A&A...376..359H",
];

fn check(status: c_int) -> Result<()> {
    if status == 0 {
        return Ok(());
    }
    let mut text = [0 as c_char; RECORD_BUFFER];
    unsafe { sys::ffgerr(status, text.as_mut_ptr()) };
    Err(FinestresError::InvalidFits(format!(
        "cfitsio error {status}: {}",
        buffer_text(&text)
    )))
}

fn buffer_text(buf: &[c_char]) -> String {
    unsafe { CStr::from_ptr(buf.as_ptr()) }
        .to_string_lossy()
        .trim_end()
        .to_string()
}

fn c_string(text: &str) -> Result<CString> {
    CString::new(text)
        .map_err(|_| FinestresError::InvalidFits(format!("NUL byte in header text '{text}'")))
}

/// Every keyword record of the current HDU, in file order.
pub(crate) fn read_cards(fptr: &mut FitsFile) -> Result<Vec<Card>> {
    let raw = unsafe { fptr.as_raw() };
    let mut status = 0;
    let mut count: c_int = 0;
    let mut more: c_int = 0;
    unsafe { sys::ffghsp(raw, &mut count, &mut more, &mut status) };
    check(status)?;

    let mut cards = Vec::with_capacity(count.max(0) as usize);
    for n in 1..=count {
        let mut name = [0 as c_char; RECORD_BUFFER];
        let mut value = [0 as c_char; RECORD_BUFFER];
        let mut comment = [0 as c_char; RECORD_BUFFER];
        unsafe {
            sys::ffgkyn(
                raw,
                n,
                name.as_mut_ptr(),
                value.as_mut_ptr(),
                comment.as_mut_ptr(),
                &mut status,
            )
        };
        check(status)?;

        let keyword = buffer_text(&name);
        let comment = buffer_text(&comment);
        if value[0] == 0 {
            if let Some(card) = commentary(keyword, comment) {
                cards.push(card);
            }
            continue;
        }

        let value = typed_value(&value)?;
        cards.push(Card::Value {
            keyword,
            value,
            comment: (!comment.is_empty()).then_some(comment),
        });
    }
    Ok(cards)
}

fn commentary(keyword: String, text: String) -> Option<Card> {
    if keyword.is_empty() && text.is_empty() {
        return None;
    }
    if keyword == "COMMENT" && CFITSIO_BOILERPLATE.iter().any(|b| text.contains(b)) {
        return None;
    }
    Some(Card::Commentary { keyword, text })
}

/// Convert a raw value field with cfitsio's own type detection.
fn typed_value(raw: &[c_char]) -> Result<HeaderValue> {
    let mut status = 0;
    let mut dtype: c_char = 0;
    unsafe { sys::ffdtyp(raw.as_ptr(), &mut dtype, &mut status) };
    check(status)?;

    let text = buffer_text(raw);
    Ok(match dtype as u8 {
        b'C' => {
            let mut unquoted = [0 as c_char; RECORD_BUFFER];
            unsafe { ffc2s(raw.as_ptr(), unquoted.as_mut_ptr(), &mut status) };
            check(status)?;
            HeaderValue::Str(buffer_text(&unquoted))
        }
        b'L' => HeaderValue::Bool(text.trim() == "T"),
        b'I' => match text.trim().parse::<i64>() {
            Ok(i) => HeaderValue::Int(i),
            Err(_) => HeaderValue::Str(text),
        },
        b'F' => match text.trim().replace(['D', 'd'], "E").parse::<f64>() {
            Ok(f) => HeaderValue::Float(f),
            Err(_) => HeaderValue::Str(text),
        },
        _ => HeaderValue::Str(text),
    })
}

/// Append a `HISTORY`, `COMMENT` or other commentary record.
pub(crate) fn write_commentary(fptr: &mut FitsFile, keyword: &str, text: &str) -> Result<()> {
    let raw = unsafe { fptr.as_raw() };
    let mut status = 0;
    match keyword {
        "HISTORY" => unsafe { sys::ffphis(raw, c_string(text)?.as_ptr(), &mut status) },
        "COMMENT" => unsafe { sys::ffpcom(raw, c_string(text)?.as_ptr(), &mut status) },
        _ => {
            let record = c_string(&format!("{keyword:<8}{text}"))?;
            unsafe { sys::ffprec(raw, record.as_ptr(), &mut status) }
        }
    };
    check(status)
}

pub(crate) fn write_logical(fptr: &mut FitsFile, keyword: &str, value: bool) -> Result<()> {
    let raw = unsafe { fptr.as_raw() };
    let mut status = 0;
    let keyword = c_string(keyword)?;
    unsafe {
        sys::ffpkyl(
            raw,
            keyword.as_ptr(),
            c_int::from(value),
            std::ptr::null(),
            &mut status,
        )
    };
    check(status)
}

/// Attach `comment` to the existing value record `keyword`.
pub(crate) fn write_comment(fptr: &mut FitsFile, keyword: &str, comment: &str) -> Result<()> {
    let raw = unsafe { fptr.as_raw() };
    let mut status = 0;
    let keyword = c_string(keyword)?;
    let comment = c_string(comment)?;
    unsafe { sys::ffmcom(raw, keyword.as_ptr(), comment.as_ptr(), &mut status) };
    check(status)
}
