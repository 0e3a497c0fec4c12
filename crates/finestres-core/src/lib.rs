pub mod calibrate;
pub mod calibration;
pub mod color;
pub mod consts;
pub mod error;
pub mod frame;
pub mod io;
pub mod stack;
