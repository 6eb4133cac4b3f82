//! Input and output for split runs.
//!
//! - [`reader`] opens delimited or JSON input and streams [`Row`](reader::Row)s
//! - [`sniff`] guesses the delimiter of a delimited file
//! - [`compression`] transparently decodes compressed input
//! - [`writer`] writes one output part in the requested format

pub mod compression;
pub mod reader;
pub mod sniff;
pub mod writer;
