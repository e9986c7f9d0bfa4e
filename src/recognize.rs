use anyhow::{Context, Result};
use faceid_match::{Encoding, Gallery, MatchResult, Matcher};
use log::{debug, error, info};
use serde::Serialize;

use crate::storage::GalleryStore;

/// Parse the embedding model's output: a JSON array with one encoding per
/// detected face, possibly empty.
pub fn parse_oracle_output(raw: &str) -> Result<Vec<Encoding>> {
    serde_json::from_str(raw.trim()).context("parsing face encodings")
}

/// Recognize the first detected face against the current gallery.
pub fn recognize<S>(store: &S, matcher: &Matcher, encodings: &[Encoding]) -> MatchResult<String>
where
    S: GalleryStore + ?Sized,
{
    let Some(query) = encodings.first() else {
        info!("No face detected");
        return MatchResult::NoFaceDetected;
    };
    if encodings.len() > 1 {
        debug!("{} faces supplied, using the first", encodings.len());
    }

    let faces = match store.load() {
        Ok(faces) => faces,
        Err(e) => {
            error!("Failed to load gallery: {:#}", e);
            return MatchResult::Error {
                reason: format!("loading gallery: {:#}", e),
            };
        }
    };
    debug!("Loaded {} stored face(s)", faces.len());

    let gallery = Gallery::from_stored(faces.into_iter().map(|f| (f.identity, f.encoding)));

    match matcher.match_query(query, &gallery) {
        Ok(result) => {
            match &result {
                MatchResult::Matched { identity, distance } => info!(
                    "Matched {} at distance {:.4} (tolerance: {:.4})",
                    identity, distance, matcher.tolerance
                ),
                MatchResult::NoMatch { best_distance } => info!(
                    "No match, closest distance {:.4} (tolerance: {:.4})",
                    best_distance, matcher.tolerance
                ),
                _ => info!("No registered faces"),
            }
            result
        }
        Err(e) => {
            error!("Recognition failed: {}", e);
            MatchResult::Error {
                reason: e.to_string(),
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success,
    NoMatch,
    NoRegisteredFaces,
    NoFace,
    Error,
}

/// User-facing form of a [`MatchResult`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub status: Status,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
}

impl Response {
    fn new(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            identity: None,
            distance: None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.status == Status::Error
    }
}

impl From<MatchResult<String>> for Response {
    fn from(result: MatchResult<String>) -> Self {
        match result {
            MatchResult::Matched { identity, distance } => Self {
                identity: Some(identity),
                distance: Some(distance),
                ..Self::new(Status::Success, "Face recognized.")
            },
            MatchResult::NoMatch { best_distance } => Self {
                distance: Some(best_distance),
                ..Self::new(Status::NoMatch, "Face not recognized.")
            },
            MatchResult::EmptyGallery => {
                Self::new(Status::NoRegisteredFaces, "No registered faces found.")
            }
            MatchResult::NoFaceDetected => {
                Self::new(Status::NoFace, "No face detected in the image.")
            }
            MatchResult::Error { reason } => {
                Self::new(Status::Error, format!("Error during recognition: {}", reason))
            }
        }
    }
}
