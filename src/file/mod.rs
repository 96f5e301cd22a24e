//! Low-level byte access.
//!
//! - [`crate::file::parser::Parser`] - bounds-checked cursor used by the decoder and the
//!   method header parser
//! - [`crate::file::io`] - little-endian reads at an offset

pub mod io;
pub mod parser;
