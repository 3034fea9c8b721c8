//! Readers and writers for the text formats the validation tools consume.

pub mod tess_dump;

pub use tess_dump::{EdgeTess, FaceTess, TessDump, TessDumpError};
