//! Trajectory storage: bounded path history and TUM files.

pub mod path;
pub mod tum;

pub use path::{PathBuffer, DEFAULT_PATH_CAPACITY};
pub use tum::{format_tum_line, read_tum, write_tum};
