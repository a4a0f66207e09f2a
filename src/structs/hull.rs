use anyhow::{bail, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::structs::weights::Weights;

/// The geometry of one projection problem: the points spanning the convex hull
/// and the target to project into it.
///
/// Both members are immutable for the duration of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hull {
    points: Array2<f64>,
    target: Array1<f64>,
}

impl Hull {
    /// Create a new [Hull] from an `n × d` point matrix and a `d`-dimensional
    /// target, validating the dimensions.
    pub fn new(points: Array2<f64>, target: Array1<f64>) -> Result<Self> {
        if points.nrows() == 0 {
            bail!("The hull must contain at least one point");
        }
        if points.ncols() != target.len() {
            bail!(
                "Dimension mismatch: hull points have {} column(s), but the target has {} element(s)",
                points.ncols(),
                target.len()
            );
        }
        if points.iter().any(|x| !x.is_finite()) || target.iter().any(|x| !x.is_finite()) {
            bail!("Hull points and target must have finite entries");
        }
        Ok(Self { points, target })
    }

    /// The point matrix, one hull vertex per row.
    pub fn points(&self) -> &Array2<f64> {
        &self.points
    }

    /// The target point.
    pub fn target(&self) -> &Array1<f64> {
        &self.target
    }

    /// Number of hull points.
    pub fn len(&self) -> usize {
        self.points.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.points.nrows() == 0
    }

    /// The spatial dimension `d`.
    pub fn dim(&self) -> usize {
        self.points.ncols()
    }

    /// The residual `w·X − y` of a convex combination against the target.
    pub fn residual(&self, weights: &Weights) -> Array1<f64> {
        self.points.t().dot(weights.vector()) - &self.target
    }

    /// Restrict the hull to a subset of its points, preserving their order.
    pub fn select(&self, keep: &[usize]) -> Self {
        Self {
            points: self.points.select(Axis(0), keep),
            target: self.target.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn rejects_empty_hull() {
        let points = Array2::<f64>::zeros((0, 2));
        let target = array![0.0, 0.0];
        assert!(Hull::new(points, target).is_err());
    }

    #[test]
    fn rejects_dimension_mismatch() {
        let points = array![[0.0, 0.0], [1.0, 0.0]];
        let target = array![0.0, 0.0, 0.0];
        assert!(Hull::new(points, target).is_err());
    }

    #[test]
    fn serializes_round_trip() {
        let hull = Hull::new(array![[0.0, 0.0], [1.0, 2.0]], array![0.5, 1.0]).unwrap();
        let json = serde_json::to_string(&hull).unwrap();
        let parsed: Hull = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed.dim(), 2);
        assert_eq!(parsed.target()[1], 1.0);
    }

    #[test]
    fn residual_at_vertex_is_zero() {
        let points = array![[0.0, 0.0], [1.0, 2.0]];
        let hull = Hull::new(points, array![1.0, 2.0]).unwrap();
        let residual = hull.residual(&Weights::vertex(2, 1));
        assert!(residual.iter().all(|r| r.abs() < 1e-12));
    }
}
