use ndarray::Array1;

use crate::structs::hull::Hull;
use crate::structs::weights::Weights;

/// Differentiable cost over simplex weights.
///
/// Implementors expose the cost, its gradient, and optionally the exact
/// curvature along a search direction. When the curvature is unavailable
/// the optimizers fall back to backtracking line search.
pub trait Objective: Clone {
    /// Number of weight coordinates the objective is defined over.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cost at `w`.
    fn cost(&self, w: &Weights) -> f64;

    /// Gradient of the cost at `w`.
    fn gradient(&self, w: &Weights) -> Array1<f64>;

    /// Exact curvature of the cost along `direction`, when it has a closed
    /// form. `None` signals the caller to use an inexact line search.
    fn curvature_along(&self, _direction: &Array1<f64>) -> Option<f64> {
        None
    }

    /// Restriction of the objective to the coordinates in `keep`.
    fn restricted(&self, keep: &[usize]) -> Self;
}

/// Squared Euclidean distance between the weighted hull combination and the
/// target point, `½‖Xᵀw − y‖²`.
#[derive(Debug, Clone)]
pub struct HullDistance {
    hull: Hull,
}

impl HullDistance {
    pub fn new(hull: Hull) -> Self {
        Self { hull }
    }

    pub fn hull(&self) -> &Hull {
        &self.hull
    }
}

impl Objective for HullDistance {
    fn len(&self) -> usize {
        self.hull.len()
    }

    fn cost(&self, w: &Weights) -> f64 {
        let residual = self.hull.residual(w);
        0.5 * residual.dot(&residual)
    }

    fn gradient(&self, w: &Weights) -> Array1<f64> {
        let residual = self.hull.residual(w);
        self.hull.points().dot(&residual)
    }

    fn curvature_along(&self, direction: &Array1<f64>) -> Option<f64> {
        let image = self.hull.points().t().dot(direction);
        Some(image.dot(&image))
    }

    fn restricted(&self, keep: &[usize]) -> Self {
        Self {
            hull: self.hull.select(keep),
        }
    }
}
