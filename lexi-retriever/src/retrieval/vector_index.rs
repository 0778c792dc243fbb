//! Flat, exhaustive nearest-neighbor search.
//!
//! [`FlatIndex`] stores every vector contiguously and answers queries by
//! comparing the query against all of them with squared Euclidean distance.
//! Results are ordered by ascending distance; equal distances keep insertion
//! order, so the lower ordinal wins. The index never stores text: ordinals are
//! the join key into the separately held mapping.

use crate::error::{Result, UnavailableReason};
use serde::Serialize;

/// One search hit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Neighbor {
    pub ordinal: usize,
    pub distance: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dimension: usize,
    data: Vec<f32>,
}

pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

impl FlatIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            data: Vec::new(),
        }
    }

    /// Wraps an already flattened `count × dimension` buffer.
    pub fn from_flat(dimension: usize, data: Vec<f32>) -> Result<Self> {
        if dimension == 0 && !data.is_empty() {
            return Err(UnavailableReason::Corrupt("zero dimension with stored values".into()).into());
        }
        if dimension != 0 && data.len() % dimension != 0 {
            return Err(UnavailableReason::Corrupt(format!(
                "{} values do not divide into vectors of dimension {dimension}",
                data.len()
            ))
            .into());
        }
        Ok(Self { dimension, data })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_flat(&self) -> &[f32] {
        &self.data
    }

    pub fn vector(&self, ordinal: usize) -> Option<&[f32]> {
        if ordinal >= self.len() {
            return None;
        }
        let start = ordinal * self.dimension;
        self.data.get(start..start + self.dimension)
    }

    /// Appends a vector and returns its ordinal.
    pub fn add(&mut self, vector: &[f32]) -> Result<usize> {
        self.check_dimension(vector)?;
        let ordinal = self.len();
        self.data.extend_from_slice(vector);
        Ok(ordinal)
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(UnavailableReason::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            }
            .into());
        }
        Ok(())
    }

    /// The `k` stored vectors nearest to `query`, nearest first.
    ///
    /// Returns fewer than `k` hits when the index holds fewer vectors, and
    /// none at all for an empty index. A query of the wrong dimension is an
    /// error, never truncated or padded.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        self.check_dimension(query)?;

        let mut hits: Vec<Neighbor> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(ordinal, stored)| Neighbor {
                ordinal,
                distance: squared_l2(query, stored),
            })
            .collect();

        // Stable sort: ties stay in ordinal order.
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(k);
        Ok(hits)
    }
}
