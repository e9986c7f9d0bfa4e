pub mod config;
pub mod recognize;
pub mod storage;

// Re-export matching types for convenience
pub use faceid_match::{
    match_encoding, Encoding, Gallery, GalleryEntry, MatchError, MatchResult, Matcher,
};
