pub mod encoding;
pub mod gallery;
pub mod matcher;

// Re-export commonly used types
pub use encoding::{euclidean_distance, Encoding, EncodingError};
pub use gallery::{Gallery, GalleryEntry};
pub use matcher::{
    compare_faces, face_distance, match_encoding, MatchError, MatchResult, Matcher,
    DEFAULT_TOLERANCE,
};
