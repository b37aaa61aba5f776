//! Low-level codecs shared by the artifact decoders.
//!
//! Timestamps stored as 1601-epoch ticks, the rotated-alphabet name cipher,
//! and a bounds-checked little-endian byte reader.

pub mod cursor;
pub mod name;
pub mod time;

pub use cursor::*;
pub use name::*;
pub use time::*;
