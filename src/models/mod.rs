pub mod core;
pub mod matching;
pub mod resolution;

pub use self::core::{Platform, Property};
pub use self::matching::{MatchCandidate, MatchRule, MatchVerdict, ScoredCandidate};
pub use self::resolution::{ResolutionRecord, ResolutionStatus, RATE_LIMITED_MARKER};
