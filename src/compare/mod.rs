//! Distance queries against captured solids and the tools built on them.

pub mod histogram;
pub mod matching;
pub mod search;
pub mod validate;

pub use histogram::{Histogram, HistogramError, classify};
pub use matching::{BodyMatches, MatchError, MatchOptions, match_bodies, transfer_attributes};
pub use search::{
    DistanceResult, EdgeRecord, FaceRecord, NodeRecord, SearchError, SearchOptions, SearchPhase,
    SolidSnapshot, distance_to_solid, distance_to_solid_exhaustive,
};
pub use validate::{ValidateError, ValidateOptions, ValidateReport, validate_dump};

#[cfg(test)]
mod tests;
