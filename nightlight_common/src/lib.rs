pub use serde_json;

pub mod color;
pub mod packets;

pub use color::Rgb;

/// Port the server listens on unless told otherwise.
pub const DEFAULT_PORT: u16 = 6000;

pub const PATH_LED: &str = "/led";
pub const PATH_NIGHT: &str = "/night";
