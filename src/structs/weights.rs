use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// A point on the probability simplex: the convex-combination weights over the
/// rows of a [Hull](crate::structs::hull::Hull).
///
/// This struct is a thin wrapper around [ndarray::Array1<f64>] to provide
/// simplex-specific bookkeeping (support under an epsilon, renormalization)
/// and context.
#[derive(Debug, Clone, PartialEq)]
pub struct Weights {
    weights: Array1<f64>,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            weights: Array1::zeros(0),
        }
    }
}

impl Weights {
    pub fn new(weights: Array1<f64>) -> Self {
        Self { weights }
    }

    /// Create a new [Weights] instance from a vector of weights.
    pub fn from_vec(weights: Vec<f64>) -> Self {
        Self {
            weights: Array1::from(weights),
        }
    }

    /// The uniform distribution over `n` coordinates.
    pub fn uniform(n: usize) -> Self {
        Self {
            weights: Array1::from_elem(n, 1.0 / n as f64),
        }
    }

    /// The one-hot distribution placing all mass on coordinate `index`.
    pub fn vertex(n: usize, index: usize) -> Self {
        let mut weights = Array1::zeros(n);
        weights[index] = 1.0;
        Self { weights }
    }

    /// Get a reference to the underlying vector.
    pub fn vector(&self) -> &Array1<f64> {
        &self.weights
    }

    /// Get a mutable reference to the underlying vector.
    pub fn vector_mut(&mut self) -> &mut Array1<f64> {
        &mut self.weights
    }

    /// Get the number of weights.
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn sum(&self) -> f64 {
        self.weights.sum()
    }

    /// Inner product with a vector of the same length.
    pub fn dot(&self, other: &Array1<f64>) -> f64 {
        self.weights.dot(other)
    }

    /// Indices carrying more than `epsilon` mass.
    pub fn support(&self, epsilon: f64) -> Vec<usize> {
        self.weights
            .iter()
            .enumerate()
            .filter(|(_, &w)| w > epsilon)
            .map(|(i, _)| i)
            .collect()
    }

    /// Rescale so the weights sum to one.
    pub fn normalize(&mut self) {
        let sum = self.weights.sum();
        if sum > 0.0 && sum.is_finite() {
            self.weights /= sum;
        }
    }

    /// Get a vector representation of the weights.
    pub fn to_vec(&self) -> Vec<f64> {
        self.weights.to_vec()
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.weights.iter().cloned()
    }
}

impl Serialize for Weights {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_vec().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Weights {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let weights_vec = Vec::<f64>::deserialize(deserializer)?;
        Ok(Self::from_vec(weights_vec))
    }
}

impl From<Vec<f64>> for Weights {
    fn from(weights: Vec<f64>) -> Self {
        Self::from_vec(weights)
    }
}

impl From<Array1<f64>> for Weights {
    fn from(weights: Array1<f64>) -> Self {
        Self { weights }
    }
}

impl Index<usize> for Weights {
    type Output = f64;

    fn index(&self, index: usize) -> &Self::Output {
        &self.weights[index]
    }
}

impl IndexMut<usize> for Weights {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.weights[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_sums_to_one() {
        let w = Weights::uniform(7);
        assert!((w.sum() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn vertex_is_one_hot() {
        let w = Weights::vertex(4, 2);
        assert_eq!(w.to_vec(), vec![0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn support_excludes_boundary() {
        let w = Weights::from_vec(vec![0.5, 0.0, 0.5, 1e-12]);
        assert_eq!(w.support(1e-10), vec![0, 2]);
    }

    #[test]
    fn normalize_rescales() {
        let mut w = Weights::from_vec(vec![2.0, 2.0]);
        w.normalize();
        assert_eq!(w.to_vec(), vec![0.5, 0.5]);
    }
}
