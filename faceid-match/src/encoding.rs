use ndarray::Array1;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EncodingError {
    #[error("encoding is not a JSON array of numbers: {0}")]
    Json(#[from] serde_json::Error),
    #[error("encoding has no components")]
    Empty,
    #[error("encoding component {index} is not a finite number")]
    NonFinite { index: usize },
}

/// Face encoding produced by the embedding model.
///
/// Always non-empty with finite components. Serializes as a plain JSON array
/// of numbers, which is also the format the gallery store keeps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct Encoding {
    vector: Array1<f64>,
}

impl Encoding {
    pub fn new(values: Vec<f64>) -> Result<Self, EncodingError> {
        if values.is_empty() {
            return Err(EncodingError::Empty);
        }
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(EncodingError::NonFinite { index });
        }
        Ok(Self {
            vector: Array1::from_vec(values),
        })
    }

    /// Parse the serialized form, e.g. `[0.12, -0.03, ...]`.
    pub fn from_json(raw: &str) -> Result<Self, EncodingError> {
        let values: Vec<f64> = serde_json::from_str(raw.trim())?;
        Self::new(values)
    }

    pub fn to_json(&self) -> Result<String, EncodingError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn dimension(&self) -> usize {
        self.vector.len()
    }

    pub fn vector(&self) -> &Array1<f64> {
        &self.vector
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.vector.to_vec()
    }
}

impl TryFrom<Vec<f64>> for Encoding {
    type Error = EncodingError;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        Self::new(values)
    }
}

impl From<Encoding> for Vec<f64> {
    fn from(encoding: Encoding) -> Self {
        encoding.vector.to_vec()
    }
}

/// L2 distance between two encodings, `None` if their dimensions differ.
pub fn euclidean_distance(a: &Encoding, b: &Encoding) -> Option<f64> {
    if a.dimension() != b.dimension() {
        return None;
    }

    let sum: f64 = a
        .vector
        .iter()
        .zip(b.vector.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum();

    Some(sum.sqrt())
}
