pub mod calibrate;
pub mod color;
pub mod config;
pub mod info;
pub mod masters;
pub mod stack;
