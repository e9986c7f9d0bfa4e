use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::encoding::Encoding;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalleryEntry<I> {
    pub identity: I,
    pub encoding: Encoding,
}

impl<I> GalleryEntry<I> {
    pub fn new(identity: I, encoding: Encoding) -> Self {
        Self { identity, encoding }
    }
}

/// Snapshot of enrolled faces used for a single match. Order is preserved and
/// decides ties.
#[derive(Debug, Clone, PartialEq)]
pub struct Gallery<I> {
    entries: Vec<GalleryEntry<I>>,
}

impl<I> Gallery<I> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, identity: I, encoding: Encoding) {
        self.entries.push(GalleryEntry::new(identity, encoding));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[GalleryEntry<I>] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GalleryEntry<I>> {
        self.entries.iter()
    }

    /// Dimension shared by most entries, the earliest one on a tie. `None` for
    /// an empty gallery.
    pub fn dimension(&self) -> Option<usize> {
        let mut counts: Vec<(usize, usize)> = Vec::new();
        for entry in &self.entries {
            let dim = entry.encoding.dimension();
            match counts.iter_mut().find(|(d, _)| *d == dim) {
                Some((_, n)) => *n += 1,
                None => counts.push((dim, 1)),
            }
        }

        let mut best: Option<(usize, usize)> = None;
        for (dim, n) in counts {
            match best {
                Some((_, m)) if m >= n => {}
                _ => best = Some((dim, n)),
            }
        }
        best.map(|(dim, _)| dim)
    }
}

impl<I: Display> Gallery<I> {
    /// Build a gallery from `(identity, serialized encoding)` rows as kept by
    /// the store. Rows that fail to parse are logged and left out.
    pub fn from_stored<S, R>(rows: R) -> Self
    where
        S: AsRef<str>,
        R: IntoIterator<Item = (I, S)>,
    {
        let mut gallery = Self::new();
        for (identity, raw) in rows {
            match Encoding::from_json(raw.as_ref()) {
                Ok(encoding) => gallery.push(identity, encoding),
                Err(e) => {
                    log::warn!("Skipping stored face for {}: {}", identity, e);
                }
            }
        }
        gallery
    }
}

impl<I> Default for Gallery<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I> FromIterator<GalleryEntry<I>> for Gallery<I> {
    fn from_iter<T: IntoIterator<Item = GalleryEntry<I>>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a, I> IntoIterator for &'a Gallery<I> {
    type Item = &'a GalleryEntry<I>;
    type IntoIter = std::slice::Iter<'a, GalleryEntry<I>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
