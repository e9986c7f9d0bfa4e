use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::encoding::{euclidean_distance, Encoding};
use crate::gallery::{Gallery, GalleryEntry};

/// Euclidean distance under which two encodings are the same person.
pub const DEFAULT_TOLERANCE: f64 = 0.6;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MatchError {
    #[error("query encoding has dimension {actual}, expected {expected}")]
    Dimension { expected: usize, actual: usize },
    #[error("tolerance must be a non-negative number, got {0}")]
    Tolerance(f64),
}

/// Outcome of one recognition request.
///
/// `NoFaceDetected` and `Error` are produced by the caller around the matcher,
/// never by [`match_encoding`] itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MatchResult<I> {
    NoFaceDetected,
    EmptyGallery,
    Matched { identity: I, distance: f64 },
    NoMatch { best_distance: f64 },
    Error { reason: String },
}

impl<I> MatchResult<I> {
    pub fn is_match(&self) -> bool {
        matches!(self, MatchResult::Matched { .. })
    }

    pub fn identity(&self) -> Option<&I> {
        match self {
            MatchResult::Matched { identity, .. } => Some(identity),
            _ => None,
        }
    }

    /// Distance to the closest gallery entry, if one was compared.
    pub fn distance(&self) -> Option<f64> {
        match self {
            MatchResult::Matched { distance, .. } => Some(*distance),
            MatchResult::NoMatch { best_distance } => Some(*best_distance),
            _ => None,
        }
    }
}

/// Distance from `query` to every gallery entry, in gallery order. Entries of
/// a different dimension yield `None`.
pub fn face_distance<I>(gallery: &Gallery<I>, query: &Encoding) -> Vec<Option<f64>> {
    gallery
        .iter()
        .map(|entry| euclidean_distance(&entry.encoding, query))
        .collect()
}

/// Per-entry "same person" flags at the given tolerance.
pub fn compare_faces<I>(gallery: &Gallery<I>, query: &Encoding, tolerance: f64) -> Vec<bool> {
    face_distance(gallery, query)
        .into_iter()
        .map(|d| d.is_some_and(|d| d <= tolerance))
        .collect()
}

/// Closest entry of the given dimension. The first entry wins among equal
/// distances.
fn nearest<'a, I>(
    gallery: &'a Gallery<I>,
    query: &Encoding,
    dimension: usize,
) -> Option<(&'a GalleryEntry<I>, f64)> {
    let mut best: Option<(&GalleryEntry<I>, f64)> = None;

    for (idx, entry) in gallery.iter().enumerate() {
        let distance = match euclidean_distance(&entry.encoding, query) {
            Some(distance) if entry.encoding.dimension() == dimension => distance,
            _ => {
                log::warn!(
                    "Skipping gallery entry #{}: dimension {} does not match {}",
                    idx,
                    entry.encoding.dimension(),
                    dimension
                );
                continue;
            }
        };

        match best {
            Some((_, d)) if d <= distance => {}
            _ => best = Some((entry, distance)),
        }
    }

    best
}

fn decide<I: Clone>(
    query: &Encoding,
    gallery: &Gallery<I>,
    tolerance: f64,
    dimension: usize,
) -> Result<MatchResult<I>, MatchError> {
    let Some((entry, distance)) = nearest(gallery, query, dimension) else {
        return Ok(MatchResult::EmptyGallery);
    };

    if tolerance.is_nan() || tolerance < 0.0 {
        return Err(MatchError::Tolerance(tolerance));
    }

    if distance <= tolerance {
        Ok(MatchResult::Matched {
            identity: entry.identity.clone(),
            distance,
        })
    } else {
        Ok(MatchResult::NoMatch {
            best_distance: distance,
        })
    }
}

/// Find the gallery entry closest to `query` and decide whether it is within
/// `tolerance` (inclusive).
///
/// The expected dimension is the one most gallery entries share. A query of
/// any other dimension is rejected, and entries that differ from it are
/// skipped.
pub fn match_encoding<I: Clone>(
    query: &Encoding,
    gallery: &Gallery<I>,
    tolerance: f64,
) -> Result<MatchResult<I>, MatchError> {
    let Some(dimension) = gallery.dimension() else {
        return Ok(MatchResult::EmptyGallery);
    };

    if query.dimension() != dimension {
        return Err(MatchError::Dimension {
            expected: dimension,
            actual: query.dimension(),
        });
    }

    decide(query, gallery, tolerance, dimension)
}

/// Matcher bound to the dimensionality of the embedding model in use.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matcher {
    pub dimension: usize,
    pub tolerance: f64,
}

impl Matcher {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn match_query<I: Clone>(
        &self,
        query: &Encoding,
        gallery: &Gallery<I>,
    ) -> Result<MatchResult<I>, MatchError> {
        if query.dimension() != self.dimension {
            return Err(MatchError::Dimension {
                expected: self.dimension,
                actual: query.dimension(),
            });
        }
        decide(query, gallery, self.tolerance, self.dimension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enc(values: &[f64]) -> Encoding {
        Encoding::new(values.to_vec()).unwrap()
    }

    fn two_entry_gallery() -> Gallery<&'static str> {
        let mut g = Gallery::new();
        g.push("A", enc(&[1.0, 0.0]));
        g.push("B", enc(&[0.0, 1.0]));
        g
    }

    #[test]
    fn test_nearest_within_tolerance() {
        let result = match_encoding(&enc(&[0.9, 0.1]), &two_entry_gallery(), 0.5).unwrap();
        match result {
            MatchResult::Matched { identity, distance } => {
                assert_eq!(identity, "A");
                assert!((distance - 0.1414).abs() < 1e-4);
            }
            other => panic!("expected match, got {:?}", other),
        }
    }

    #[test]
    fn test_all_beyond_tolerance() {
        let result = match_encoding(&enc(&[5.0, 5.0]), &two_entry_gallery(), 0.5).unwrap();
        match result {
            MatchResult::NoMatch { best_distance } => {
                assert!((best_distance - 41f64.sqrt()).abs() < 1e-12);
            }
            other => panic!("expected no match, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_gallery() {
        let empty = Gallery::<u32>::new();
        for tolerance in [0.0, 0.6, 10.0, -1.0] {
            assert_eq!(
                match_encoding(&enc(&[0.3, 0.4]), &empty, tolerance).unwrap(),
                MatchResult::EmptyGallery
            );
        }
    }

    #[test]
    fn test_matcher_with_only_mismatched_entries_is_empty() {
        let mut g = Gallery::new();
        g.push(1, enc(&[1.0, 2.0, 3.0]));
        g.push(2, enc(&[1.0]));
        let result = Matcher::new(2).match_query(&enc(&[1.0, 2.0]), &g).unwrap();
        assert_eq!(result, MatchResult::EmptyGallery);
    }

    #[test]
    fn test_mismatched_entries_are_skipped() {
        let mut g = Gallery::new();
        g.push(1, enc(&[0.0, 0.0, 0.0, 0.0]));
        g.push(2, enc(&[0.0, 0.0, 0.0]));
        g.push(3, enc(&[1.0, 1.0, 1.0]));
        let result = match_encoding(&enc(&[0.0, 0.0, 0.0]), &g, 0.6).unwrap();
        assert_eq!(
            result,
            MatchResult::Matched {
                identity: 2,
                distance: 0.0
            }
        );
    }

    #[test]
    fn test_query_dimension_differs_from_gallery() {
        let mut g = Gallery::new();
        g.push("A", enc(&[0.0; 128]));
        g.push("B", enc(&[1.0; 128]));
        let err = match_encoding(&enc(&[0.0, 0.0, 0.0]), &g, 0.6).unwrap_err();
        assert_eq!(
            err,
            MatchError::Dimension {
                expected: 128,
                actual: 3
            }
        );
    }

    #[test]
    fn test_query_never_matches_odd_sized_row() {
        let mut g = Gallery::new();
        g.push("good", enc(&[0.0; 128]));
        g.push("other", enc(&[0.5; 128]));
        g.push("corrupt3", enc(&[0.0, 0.0, 0.0]));

        let err = match_encoding(&enc(&[0.0, 0.0, 0.0]), &g, 0.6).unwrap_err();
        assert!(matches!(err, MatchError::Dimension { expected: 128, .. }));

        let result = match_encoding(&enc(&[0.0; 128]), &g, 0.6).unwrap();
        assert_eq!(result.identity(), Some(&"good"));
    }

    #[test]
    fn test_self_match_is_zero() {
        let samples = [
            vec![0.0],
            vec![0.1, -0.2, 0.3],
            vec![12.5, -7.25, 1e-6, 3.0],
        ];
        for values in samples {
            let query = enc(&values);
            let mut g = Gallery::new();
            g.push("other", enc(&vec![100.0; values.len()]));
            g.push("self", query.clone());
            let result = match_encoding(&query, &g, 0.0).unwrap();
            assert_eq!(
                result,
                MatchResult::Matched {
                    identity: "self",
                    distance: 0.0
                }
            );
        }
    }

    #[test]
    fn test_tolerance_is_inclusive() {
        let mut g = Gallery::new();
        g.push("edge", enc(&[0.6, 0.0, 0.0]));
        let query = enc(&[0.0, 0.0, 0.0]);

        let result = match_encoding(&query, &g, 0.6).unwrap();
        assert_eq!(
            result,
            MatchResult::Matched {
                identity: "edge",
                distance: 0.6
            }
        );

        let result = match_encoding(&query, &g, 0.59).unwrap();
        assert_eq!(result, MatchResult::NoMatch { best_distance: 0.6 });
    }

    #[test]
    fn test_tolerance_monotonic() {
        let g = two_entry_gallery();
        let queries = [enc(&[0.9, 0.1]), enc(&[0.5, 0.5]), enc(&[2.0, -1.0])];
        let tolerances = [0.0, 0.1, 0.15, 0.5, 0.71, 1.0, 3.0];
        for q in &queries {
            for (i, t1) in tolerances.iter().enumerate() {
                for t2 in &tolerances[i..] {
                    if match_encoding(q, &g, *t1).unwrap().is_match() {
                        assert!(match_encoding(q, &g, *t2).unwrap().is_match());
                    }
                }
            }
        }
    }

    #[test]
    fn test_first_minimum_wins() {
        let mut g = Gallery::new();
        g.push("far", enc(&[3.0, 0.0]));
        g.push("first", enc(&[1.0, 0.0]));
        g.push("second", enc(&[-1.0, 0.0]));
        g.push("third", enc(&[0.0, 1.0]));
        let result = match_encoding(&enc(&[0.0, 0.0]), &g, 1.0).unwrap();
        assert_eq!(result.identity(), Some(&"first"));
    }

    #[test]
    fn test_invalid_tolerance() {
        let g = two_entry_gallery();
        let q = enc(&[1.0, 0.0]);
        assert_eq!(
            match_encoding(&q, &g, -0.1),
            Err(MatchError::Tolerance(-0.1))
        );
        assert!(matches!(
            match_encoding(&q, &g, f64::NAN),
            Err(MatchError::Tolerance(_))
        ));
    }

    #[test]
    fn test_matcher_rejects_wrong_query_dimension() {
        let matcher = Matcher::new(3);
        let err = matcher
            .match_query(&enc(&[1.0, 0.0]), &two_entry_gallery())
            .unwrap_err();
        assert_eq!(
            err,
            MatchError::Dimension {
                expected: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn test_matcher_uses_tolerance() {
        let g = two_entry_gallery();
        let q = enc(&[0.5, 0.5]);
        let default = Matcher::new(2).match_query(&q, &g).unwrap();
        assert!(!default.is_match());

        let loose = Matcher::new(2).with_tolerance(0.75);
        assert!(loose.match_query(&q, &g).unwrap().is_match());
    }

    #[test]
    fn test_face_distance_and_compare() {
        let mut g = two_entry_gallery();
        g.push("C", enc(&[1.0]));
        let q = enc(&[1.0, 0.0]);

        let distances = face_distance(&g, &q);
        assert_eq!(distances[0], Some(0.0));
        assert!((distances[1].unwrap() - 2f64.sqrt()).abs() < 1e-12);
        assert_eq!(distances[2], None);

        assert_eq!(compare_faces(&g, &q, 0.6), vec![true, false, false]);
    }

    #[test]
    fn test_result_serializes_with_status_tag() {
        let r: MatchResult<u32> = MatchResult::Matched {
            identity: 7,
            distance: 0.25,
        };
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"status": "matched", "identity": 7, "distance": 0.25})
        );

        let r: MatchResult<u32> = MatchResult::NoFaceDetected;
        assert_eq!(
            serde_json::to_value(&r).unwrap(),
            serde_json::json!({"status": "no_face_detected"})
        );
    }
}
