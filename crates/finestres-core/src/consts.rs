/// Minimum pixel count to use Rayon parallelism inside a reduction.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Number of channels in a color frame (R, G, B).
pub const COLOR_CHANNEL_COUNT: usize = 3;

/// Text columns available to a `HISTORY`/`COMMENT` card.
pub const HISTORY_TEXT_WIDTH: usize = 72;

/// File extensions picked up when scanning a calibration folder.
pub const FITS_EXTENSIONS: &[&str] = &["fits", "fit", "fts"];

/// Header keyword holding the frame role ("Dark Frame", "Flat", ...).
pub const KEY_IMAGE_TYPE: &str = "IMAGETYP";

/// Header keyword holding the exposure time in seconds.
pub const KEY_EXPOSURE: &str = "EXPTIME";

/// Header keyword holding the filter name.
pub const KEY_FILTER: &str = "FILTER";

/// Group name used for frames without a filter.
pub const UNKNOWN_FILTER: &str = "Unknown";

/// Default file name of a color composite.
pub const COLOR_STACK_FILE_NAME: &str = "color_stack.fits";
