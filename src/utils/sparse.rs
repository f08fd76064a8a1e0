use std::cmp::Ordering;

use num::{Float, NumCast};
use serde::{Deserialize, Serialize};

/// Sparse vector of (dimension, value) pairs sorted by dimension.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVec<N = f32> {
    inds: Vec<u32>,
    vals: Vec<N>,
}

impl<N> SparseVec<N>
where
    N: Float + Into<f64>,
{
    /// Build from unsorted pairs. Zero values are dropped, duplicate
    /// dimensions keep the last value.
    pub fn from_pairs(mut pairs: Vec<(u32, N)>) -> Self {
        pairs.retain(|(_, v)| !v.is_zero());
        pairs.sort_by_key(|(i, _)| *i);
        let mut inds: Vec<u32> = Vec::with_capacity(pairs.len());
        let mut vals: Vec<N> = Vec::with_capacity(pairs.len());
        for (i, v) in pairs {
            if inds.last() == Some(&i) {
                if let Some(last) = vals.last_mut() {
                    *last = v;
                }
            } else {
                inds.push(i);
                vals.push(v);
            }
        }
        Self { inds, vals }
    }

    /// Scale to unit L2 length. The zero vector stays zero.
    pub fn normalized(mut self) -> Self {
        let norm = self.norm();
        if norm > 0.0 {
            for v in &mut self.vals {
                *v = <N as NumCast>::from(Into::<f64>::into(*v) / norm).unwrap_or_else(N::zero);
            }
        }
        self
    }

    #[inline]
    pub fn norm(&self) -> f64 {
        self.vals.iter().map(|&v| Into::<f64>::into(v).powi(2)).sum::<f64>().sqrt()
    }

    /// Dot product by merge-join over the sorted dimensions.
    pub fn dot(&self, other: &Self) -> f64 {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0;
        while i < self.inds.len() && j < other.inds.len() {
            match self.inds[i].cmp(&other.inds[j]) {
                Ordering::Equal => {
                    sum += Into::<f64>::into(self.vals[i]) * Into::<f64>::into(other.vals[j]);
                    i += 1;
                    j += 1;
                }
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
            }
        }
        sum
    }

    /// cosθ = A・B / (|A||B|), 0 when either side is empty.
    pub fn cosine(&self, other: &Self) -> f64 {
        let denom = self.norm() * other.norm();
        if denom <= f64::EPSILON {
            return 0.0;
        }
        (self.dot(other) / denom).clamp(-1.0, 1.0)
    }

    pub fn get(&self, dim: u32) -> Option<N> {
        self.inds.binary_search(&dim).ok().map(|pos| self.vals[pos])
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, N)> + '_ {
        self.inds.iter().copied().zip(self.vals.iter().copied())
    }

    pub fn nnz(&self) -> usize {
        self.inds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inds.is_empty()
    }
}
