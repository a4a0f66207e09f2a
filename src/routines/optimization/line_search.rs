use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::routines::evaluation::objective::Objective;
use crate::structs::weights::Weights;

/// One-dimensional restriction of the cost along a fixed update path.
///
/// `value(0)` is the cost at the current iterate, and `derivative(0)` must
/// be negative for a descent path.
pub trait Merit {
    fn value(&self, t: f64) -> f64;
    fn derivative(&self, t: f64) -> f64;
}

/// Acceptance criterion used by [`BisectionSearch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    /// Stop once the merit improves on `t = 0` and its derivative is flat.
    Classical,
    /// Weak Wolfe conditions, sufficient decrease plus curvature.
    Wolfe,
    /// Goldstein band on the secant slope between `0` and `t`.
    Goldstein,
}

/// Bisection line search over `[0, t_max]`.
///
/// If no candidate is accepted within the iteration budget the search falls
/// back to the best of the endpoints and the last midpoint by merit value,
/// so the returned step never increases the merit above its value at zero.
#[derive(Debug, Clone)]
pub struct BisectionSearch {
    pub resolution: f64,
    pub tol: f64,
    pub c1: f64,
    pub c2: f64,
    pub max_iter: usize,
}

impl Default for BisectionSearch {
    fn default() -> Self {
        Self {
            resolution: 1e-4,
            tol: 1e-4,
            c1: 1e-4,
            c2: 0.9,
            max_iter: 100,
        }
    }
}

impl BisectionSearch {
    pub fn search(&self, merit: &impl Merit, t_max: f64, search_type: SearchType) -> f64 {
        let q0 = merit.value(0.0);
        let d0 = merit.derivative(0.0);

        let mut lo = 0.0;
        let mut hi = t_max;
        let mut q_lo = q0;
        let mut q_hi = merit.value(hi);
        let mut mid = 0.5 * (lo + hi);
        let mut q_mid = merit.value(mid);

        for _ in 0..self.max_iter {
            mid = 0.5 * (lo + hi);
            q_mid = merit.value(mid);
            let dq_mid = merit.derivative(mid);

            if (hi - lo).abs() < self.resolution {
                break;
            }

            let accepted = match search_type {
                SearchType::Classical => q_mid < q0 && dq_mid.abs() < self.tol,
                SearchType::Wolfe => {
                    q_mid <= q0 + self.c1 * mid * d0 && dq_mid >= self.c2 * d0
                }
                SearchType::Goldstein => {
                    let secant = (q_mid - q0) / mid;
                    secant <= self.c1 * d0 && secant >= (1.0 - self.c1) * d0
                }
            };
            if accepted {
                return mid;
            }

            // The merit is unimodal along the path, so the derivative sign
            // tells which half holds the minimizer.
            if dq_mid > 0.0 {
                hi = mid;
                q_hi = q_mid;
            } else {
                lo = mid;
                q_lo = q_mid;
            }
        }

        let candidates = [(0.0, q0), (lo, q_lo), (hi, q_hi), (mid, q_mid)];
        candidates
            .iter()
            .fold((0.0, q0), |best, &(t, q)| if q < best.1 { (t, q) } else { best })
            .0
    }
}

/// Backtracking line search enforcing the Armijo sufficient-decrease
/// condition, usable with any update rule that maps a step size to a new
/// iterate.
#[derive(Debug, Clone)]
pub struct ArmijoSearch {
    pub c1: f64,
    pub shrink: f64,
    pub max_iter: usize,
}

impl Default for ArmijoSearch {
    fn default() -> Self {
        Self {
            c1: 1e-4,
            shrink: 0.5,
            max_iter: 100,
        }
    }
}

impl ArmijoSearch {
    /// Shrinks `step` until the Armijo condition holds. Returns zero when
    /// the budget is exhausted without finding an improving step.
    pub fn search<O, F>(
        &self,
        objective: &O,
        w: &Weights,
        direction: &Array1<f64>,
        mut step: f64,
        update: F,
    ) -> f64
    where
        O: Objective,
        F: Fn(&Weights, &Array1<f64>, f64) -> Weights,
    {
        let f0 = objective.cost(w);
        let grad0 = objective.gradient(w);

        let mut candidate = update(w, direction, step);
        let mut count = 0;
        while !self.accepts(objective, w, &candidate, f0, &grad0) && count < self.max_iter {
            step *= self.shrink;
            candidate = update(w, direction, step);
            count += 1;
        }

        if count == self.max_iter && f0 < objective.cost(&candidate) {
            return 0.0;
        }
        step
    }

    fn accepts<O: Objective>(
        &self,
        objective: &O,
        w: &Weights,
        candidate: &Weights,
        f0: f64,
        grad0: &Array1<f64>,
    ) -> bool {
        let shift = candidate.vector() - w.vector();
        objective.cost(candidate) <= f0 + self.c1 * grad0.dot(&shift)
    }
}
