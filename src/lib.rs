#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Distance validation between a solid and a tessellation, and cross-blend
//! surfaces that close the gap between two open loops, both written against a
//! small [`kernel::GeometryKernel`] interface.

pub mod blend;
pub mod compare;
pub mod geom;
pub mod kernel;
pub mod parse;

pub use blend::{BlendError, BlendInput, BlendOptions, BlendOutcome, CrossBlendBuilder};
pub use compare::{Histogram, SearchOptions, SolidSnapshot, ValidateOptions, ValidateReport};
pub use kernel::memory::MemoryKernel;
pub use kernel::{GeometryKernel, KernelError};
