use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use ndarray::ArrayD;
use tracing::debug;

use crate::consts::{COLOR_CHANNEL_COUNT, KEY_EXPOSURE, KEY_FILTER, KEY_IMAGE_TYPE};
use crate::error::{FinestresError, Result};
use crate::io::fits::read_fits;
use crate::io::fits_writer::write_fits;
use crate::io::header::Header;

/// Structural classification of a frame's pixel data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameKind {
    /// Single-channel 2-D image.
    Image,
    /// `(H, W, 3)` color image.
    ColorImage,
    Unrecognized,
}

impl FrameKind {
    pub fn from_shape(shape: &[usize]) -> Self {
        match shape {
            [_, _] => Self::Image,
            [_, _, COLOR_CHANNEL_COUNT] => Self::ColorImage,
            _ => Self::Unrecognized,
        }
    }
}

impl std::fmt::Display for FrameKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Image => write!(f, "IMAGE"),
            Self::ColorImage => write!(f, "COLOR IMAGE"),
            Self::Unrecognized => write!(f, "UNRECOGNIZED"),
        }
    }
}

/// Acquisition role of a frame, as stored in the `IMAGETYP` keyword.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum FrameRole {
    Light,
    Dark,
    Flat,
    MasterLight,
    MasterDark,
    MasterFlat,
    ColorStack,
    Other(String),
}

impl FrameRole {
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "Light Frame" => Self::Light,
            "Dark Frame" => Self::Dark,
            "Flat" => Self::Flat,
            "Master Light Frame" => Self::MasterLight,
            "Master Dark Frame" => Self::MasterDark,
            "Master Flat" => Self::MasterFlat,
            "Color Stack" => Self::ColorStack,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Light => "Light Frame",
            Self::Dark => "Dark Frame",
            Self::Flat => "Flat",
            Self::MasterLight => "Master Light Frame",
            Self::MasterDark => "Master Dark Frame",
            Self::MasterFlat => "Master Flat",
            Self::ColorStack => "Color Stack",
            Self::Other(s) => s,
        }
    }

    /// Role of a frame combined from frames of this role ("Master " + role).
    pub fn master(&self) -> Self {
        match self {
            Self::Light => Self::MasterLight,
            Self::Dark => Self::MasterDark,
            Self::Flat => Self::MasterFlat,
            other => Self::Other(format!("Master {}", other.as_str())),
        }
    }
}

impl std::fmt::Display for FrameRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for FrameRole {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

/// One exposure: pixel data, header metadata and classification fields.
///
/// Frames compare and sort by title (ties broken by path).
#[derive(Clone, Debug)]
pub struct Frame {
    path: PathBuf,
    title: String,
    pixels: Option<ArrayD<f64>>,
    /// Ordered metadata table, including the `HISTORY` log.
    pub header: Header,
    pub kind: FrameKind,
    pub role: Option<FrameRole>,
    /// Exposure time in seconds.
    pub exposure: Option<f64>,
    pub filter: Option<String>,
    dirty: bool,
}

impl Frame {
    /// A frame with no pixel data yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            title: title_of(&path),
            path,
            pixels: None,
            header: Header::new(),
            kind: FrameKind::Unrecognized,
            role: None,
            exposure: None,
            filter: None,
            dirty: false,
        }
    }

    /// Build an in-memory frame, classifying it from `header` and the array shape.
    /// The frame has never been persisted, so it starts dirty.
    pub fn from_pixels(path: impl Into<PathBuf>, pixels: ArrayD<f64>, header: Header) -> Self {
        let mut frame = Self::new(path);
        frame.kind = FrameKind::from_shape(pixels.shape());
        frame.pixels = Some(pixels);
        frame.header = header;
        frame.classify_from_header();
        frame.dirty = true;
        frame
    }

    /// Load the image data and metadata of a FITS file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let image = read_fits(path).map_err(|e| FinestresError::Load {
            path: path.to_path_buf(),
            reason: match e {
                FinestresError::InvalidFits(reason) => reason,
                other => other.to_string(),
            },
        })?;

        let mut frame = Self::from_pixels(path, image.pixels, image.header);
        frame.dirty = false;
        debug!(
            title = %frame.title,
            kind = %frame.kind,
            role = ?frame.role,
            exposure = ?frame.exposure,
            filter = ?frame.filter,
            "Loaded frame"
        );
        Ok(frame)
    }

    fn classify_from_header(&mut self) {
        self.role = self.header.get_str(KEY_IMAGE_TYPE).map(FrameRole::parse);
        self.exposure = self.header.get_f64(KEY_EXPOSURE);
        self.filter = self
            .header
            .get_str(KEY_FILTER)
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_string);
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name of the frame, used for display and ordering.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Same frame under a different path (and title).
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.set_path(path);
        self
    }

    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        self.path = path.into();
        self.title = title_of(&self.path);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn has_pixels(&self) -> bool {
        self.pixels.is_some()
    }

    pub fn shape(&self) -> Option<&[usize]> {
        self.pixels.as_ref().map(|p| p.shape())
    }

    pub fn pixels(&self) -> Result<&ArrayD<f64>> {
        self.pixels.as_ref().ok_or_else(|| FinestresError::MissingData {
            title: self.title.clone(),
        })
    }

    /// Mutable access to the pixel data. Marks the frame as modified.
    pub fn pixels_mut(&mut self) -> Result<&mut ArrayD<f64>> {
        match self.pixels.as_mut() {
            Some(pixels) => {
                self.dirty = true;
                Ok(pixels)
            }
            None => Err(FinestresError::MissingData {
                title: self.title.clone(),
            }),
        }
    }

    /// Replace the pixel data, reclassifying the frame kind.
    pub fn set_pixels(&mut self, pixels: ArrayD<f64>) {
        self.kind = FrameKind::from_shape(pixels.shape());
        self.pixels = Some(pixels);
        self.dirty = true;
    }

    pub fn push_history(&mut self, text: impl AsRef<str>) {
        self.header.push_history(text.as_ref());
    }

    /// Write the frame back to its own path.
    pub fn save(&mut self) -> Result<()> {
        let path = self.path.clone();
        self.save_as(&path)
    }

    /// Write the frame to `path`, overwriting any existing file. The frame
    /// keeps its own path and title.
    pub fn save_as(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.sync_header();
        let pixels = self.pixels()?;
        write_fits(path, pixels, &self.header)?;
        self.dirty = false;
        debug!(title = %self.title, path = %path.display(), "Saved frame");
        Ok(())
    }

    /// Mirror the classification fields into the header.
    fn sync_header(&mut self) {
        if let Some(role) = &self.role {
            self.header.set(KEY_IMAGE_TYPE, role.as_str());
        }
        if let Some(exposure) = self.exposure.filter(|e| e.is_finite()) {
            self.header.set(KEY_EXPOSURE, exposure);
        }
        if let Some(filter) = &self.filter {
            self.header.set(KEY_FILTER, filter.as_str());
        }
    }
}

impl PartialEq for Frame {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frame {}

impl PartialOrd for Frame {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Frame {
    fn cmp(&self, other: &Self) -> Ordering {
        self.title
            .cmp(&other.title)
            .then_with(|| self.path.cmp(&other.path))
    }
}

fn title_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
