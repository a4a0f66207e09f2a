use anyhow::Result;
use ndarray::Array1;

use crate::algorithms::{Algorithms, Status, STEP_UNDERFLOW};
use crate::routines::evaluation::objective::Objective;
use crate::routines::initialization;
use crate::routines::math::{clip, max_step_size};
use crate::routines::optimization::line_search::ArmijoSearch;
use crate::routines::output::IterationHistory;
use crate::routines::settings::Settings;
use crate::structs::weights::Weights;

/// Denominators below this are treated as flat curvature.
const CURVATURE_FLOOR: f64 = 1e-12;
/// Step substituted when a curvature or spread denominator degenerates.
const STEP_SENTINEL: f64 = 1e6;

/// Cauchy-Simplex optimizer.
///
/// Moves along the centered direction `w ⊙ (g − w·g)`, which is tangent to
/// the simplex, with the exact quadratic-minimizing step clipped to the
/// largest feasible one. Coordinates pushed to the boundary are zeroed and
/// the iterate renormalized.
///
/// With a non-negative `reset_threshold` the optimizer additionally retires
/// boundary coordinates: once enough of them have gone inactive within the
/// current epoch, the problem is compacted onto the surviving coordinates
/// and the run restarts on that subspace. Results are mapped back into the
/// original index space.
pub struct CauchySimplex<O: Objective> {
    objective: O,
    working: Vec<usize>,
    full_len: usize,
    weights: Weights,
    gradient: Array1<f64>,
    distance: f64,
    iteration: usize,
    last_step: f64,
    inactive_this_epoch: usize,
    status: Status,
    history: IterationHistory,
    settings: Settings,
    armijo: ArmijoSearch,
}

impl<O: Objective> Algorithms<O> for CauchySimplex<O> {
    fn new(settings: Settings, objective: O) -> Result<Box<Self>> {
        let n = objective.len();
        let weights = initialization::starting_weights(&settings, n, Self::default_start)?;
        Ok(Box::new(Self {
            objective,
            working: (0..n).collect(),
            full_len: n,
            weights,
            gradient: Array1::zeros(n),
            distance: f64::INFINITY,
            iteration: 0,
            last_step: 0.0,
            inactive_this_epoch: 0,
            status: Status::Starting,
            history: IterationHistory::new(),
            settings,
            armijo: ArmijoSearch::default(),
        }))
    }

    fn settings(&self) -> &Settings {
        &self.settings
    }
    fn objective(&self) -> &O {
        &self.objective
    }
    fn weights(&self) -> &Weights {
        &self.weights
    }
    fn set_weights(&mut self, weights: Weights) {
        self.weights = weights;
    }
    fn gradient(&self) -> &Array1<f64> {
        &self.gradient
    }
    fn set_gradient(&mut self, gradient: Array1<f64>) {
        self.gradient = gradient;
    }
    fn distance(&self) -> f64 {
        self.distance
    }
    fn set_distance(&mut self, distance: f64) {
        self.distance = distance;
    }
    fn inc_iteration(&mut self) -> usize {
        self.iteration += 1;
        self.iteration
    }
    fn iteration(&self) -> usize {
        self.iteration
    }
    fn last_step(&self) -> f64 {
        self.last_step
    }
    fn set_last_step(&mut self, step: f64) {
        self.last_step = step;
    }
    fn status(&self) -> &Status {
        &self.status
    }
    fn set_status(&mut self, status: Status) {
        self.status = status;
    }
    fn history(&self) -> &IterationHistory {
        &self.history
    }
    fn history_mut(&mut self) -> &mut IterationHistory {
        &mut self.history
    }

    fn optimization(&mut self) -> Result<()> {
        let eps = self.settings.convergence.active_set_eps;
        let support = self.weights.support(eps);

        // A single-vertex iterate cannot move along the centered direction.
        if support.len() <= 1 {
            self.last_step = 0.0;
            self.status = Status::ConvergedGradient;
            return Ok(());
        }

        let mean = self.weights.dot(&self.gradient);
        let direction: Array1<f64> = self.weights.vector() * &self.gradient.mapv(|g| g - mean);

        let t_max = max_step_size(&self.weights, &self.gradient, &support);

        let step = match self.objective.curvature_along(&direction) {
            Some(curvature) => {
                let t_cauchy = if curvature > CURVATURE_FLOOR {
                    direction.dot(&self.gradient) / curvature
                } else {
                    STEP_SENTINEL
                };
                clip(t_cauchy, 0.0, t_max)
            }
            None => self
                .armijo
                .search(&self.objective, &self.weights, &direction, t_max, |w, d, t| {
                    simplex_step(w, d, t, eps)
                }),
        };

        self.last_step = step;
        if step < STEP_UNDERFLOW {
            self.status = Status::ConvergedGradient;
            return Ok(());
        }

        self.weights = simplex_step(&self.weights, &direction, step, eps);

        if self.settings.convergence.reset_threshold >= 0 {
            self.compact_if_due(eps);
        }
        Ok(())
    }

    fn full_weights(&self) -> Weights {
        let eps = self.settings.convergence.active_set_eps;
        let mut full = vec![0.0; self.full_len];
        for (slot, &index) in self.working.iter().enumerate() {
            let value = self.weights[slot];
            if value > eps {
                full[index] = value;
            }
        }
        let mut weights = Weights::from_vec(full);
        weights.normalize();
        weights
    }
}

impl<O: Objective> CauchySimplex<O> {
    /// Compacts the working set once enough coordinates went inactive in
    /// the current epoch.
    fn compact_if_due(&mut self, eps: f64) {
        let keep = self.weights.support(eps);
        self.inactive_this_epoch = self.weights.len() - keep.len();

        if (self.inactive_this_epoch as i64) < self.settings.convergence.reset_threshold
            || self.inactive_this_epoch == 0
        {
            return;
        }

        tracing::debug!(
            "Restarting on a subspace of {} coordinate(s), {} retired",
            keep.len(),
            self.inactive_this_epoch
        );

        self.objective = self.objective.restricted(&keep);
        self.working = keep.iter().map(|&i| self.working[i]).collect();
        let mut compacted =
            Weights::from_vec(keep.iter().map(|&i| self.weights[i]).collect::<Vec<f64>>());
        compacted.normalize();
        self.weights = compacted;
        self.gradient = Array1::zeros(self.working.len());
        self.inactive_this_epoch = 0;
    }
}

/// One Cauchy-Simplex step. Coordinates at the boundary before the step are
/// zeroed, the rest renormalized.
fn simplex_step(w: &Weights, direction: &Array1<f64>, step: f64, eps: f64) -> Weights {
    let mut updated: Array1<f64> = w.vector() - &(direction * step);
    for (value, old) in updated.iter_mut().zip(w.iter()) {
        if old <= eps {
            *value = 0.0;
        }
    }
    let mut weights = Weights::new(updated);
    weights.normalize();
    weights
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::StoppingType;
    use crate::routines::evaluation::objective::HullDistance;
    use crate::structs::hull::Hull;
    use ndarray::array;

    fn settings() -> Settings {
        let mut settings = Settings::default();
        settings.output.write = false;
        settings
    }

    #[test]
    fn converges_to_the_centroid() {
        let hull = Hull::new(
            array![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]],
            array![1.0 / 3.0, 1.0 / 3.0],
        )
        .unwrap();
        let mut algorithm = CauchySimplex::new(settings(), HullDistance::new(hull)).unwrap();
        let result = algorithm.fit().unwrap();

        assert!(result.converged(), "status: {}", result.status());
        assert!(result.distance() < 1e-6);
        assert!((result.weights().sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn recovers_an_exact_vertex() {
        let hull = Hull::new(array![[0.0, 0.0], [2.0, 0.0], [0.0, 2.0]], array![2.0, 0.0]).unwrap();
        let mut config = settings();
        config.convergence.stopping = StoppingType::Tol;
        config.convergence.tol = 1e-8;

        let mut algorithm = CauchySimplex::new(config, HullDistance::new(hull)).unwrap();
        let result = algorithm.fit().unwrap();

        assert!(result.converged(), "status: {}", result.status());
        assert!((result.weights()[1] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn subspace_restart_maps_back_to_full_length() {
        let hull = Hull::new(
            array![[0.0, 0.0], [2.0, 0.0], [0.0, 2.0], [3.0, 3.0]],
            array![2.0, 0.0],
        )
        .unwrap();
        let mut config = settings();
        config.convergence.stopping = StoppingType::Tol;
        config.convergence.tol = 1e-8;
        config.convergence.reset_threshold = 1;

        let mut algorithm = CauchySimplex::new(config, HullDistance::new(hull)).unwrap();
        let result = algorithm.fit().unwrap();

        assert_eq!(result.weights().len(), 4);
        assert!((result.weights().sum() - 1.0).abs() < 1e-9);
        assert!((result.weights()[1] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn step_underflow_stops_the_run_under_any_stopping_type() {
        // Large coordinates blow up the gradient spread, so the feasible
        // step collapses below the underflow threshold on the first
        // iteration. The run must stop there even though the configured
        // criterion can never be satisfied.
        let hull = Hull::new(
            array![[0.0, 0.0], [1e4, 0.0], [0.0, 1e4]],
            array![2e4, 2e4],
        )
        .unwrap();
        let mut config = settings();
        config.convergence.stopping = StoppingType::Kkt;
        config.convergence.kkt_tol = 1e-18;
        config.config.max_iter = 5000;

        let mut algorithm = CauchySimplex::new(config, HullDistance::new(hull)).unwrap();
        let result = algorithm.fit().unwrap();

        assert_eq!(*result.status(), Status::ConvergedGradient);
        assert!(result.iterations() < 5000);
    }

    #[test]
    fn single_vertex_start_is_a_no_op() {
        let hull = Hull::new(array![[0.0, 0.0], [1.0, 0.0]], array![0.25, 0.0]).unwrap();
        let mut config = settings();
        config.config.initial_weights = Some(vec![1.0, 0.0]);

        let mut algorithm = CauchySimplex::new(config, HullDistance::new(hull)).unwrap();
        let result = algorithm.fit().unwrap();

        assert_eq!(*result.status(), Status::ConvergedGradient);
        assert!((result.weights()[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_malformed_initial_weights() {
        let hull = Hull::new(array![[0.0], [1.0]], array![0.5]).unwrap();
        let mut config = settings();
        config.config.initial_weights = Some(vec![0.7, 0.7]);

        assert!(CauchySimplex::new(config, HullDistance::new(hull)).is_err());
    }
}
