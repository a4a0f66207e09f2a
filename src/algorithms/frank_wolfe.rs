use anyhow::Result;
use ndarray::Array1;
use ndarray_stats::QuantileExt;

use crate::algorithms::{Algorithms, Status};
use crate::routines::evaluation::objective::Objective;
use crate::routines::initialization;
use crate::routines::math::{argmin_vertex, clip};
use crate::routines::optimization::line_search::ArmijoSearch;
use crate::routines::output::IterationHistory;
use crate::routines::settings::Settings;
use crate::structs::weights::Weights;

const CURVATURE_FLOOR: f64 = 1e-12;
const STEP_SENTINEL: f64 = 1e6;
/// Chord steps below this no longer move the iterate.
const STALL_TOL: f64 = 1e-10;

/// Vertex Frank-Wolfe.
///
/// The linear minimization oracle picks the vertex with the smallest
/// gradient coordinate and the iterate moves along the chord towards it,
/// with the exact quadratic-minimizing step clipped to `[0, 1]`.
pub struct FrankWolfe<O: Objective> {
    objective: O,
    weights: Weights,
    gradient: Array1<f64>,
    distance: f64,
    iteration: usize,
    last_step: f64,
    status: Status,
    history: IterationHistory,
    settings: Settings,
    armijo: ArmijoSearch,
}

impl<O: Objective> Algorithms<O> for FrankWolfe<O> {
    fn new(settings: Settings, objective: O) -> Result<Box<Self>> {
        let n = objective.len();
        let weights = initialization::starting_weights(&settings, n, Self::default_start)?;
        Ok(Box::new(Self {
            objective,
            weights,
            gradient: Array1::zeros(n),
            distance: f64::INFINITY,
            iteration: 0,
            last_step: 0.0,
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

    /// Starts at the first vertex rather than the centroid.
    fn default_start(n: usize) -> Weights {
        Weights::vertex(n, 0)
    }

    fn optimization(&mut self) -> Result<()> {
        let s = argmin_vertex(&self.gradient);
        let direction: Array1<f64> = Array1::from_shape_fn(self.weights.len(), |i| {
            (if i == s { 1.0 } else { 0.0 }) - self.weights[i]
        });

        let step = match self.objective.curvature_along(&direction) {
            Some(curvature) => {
                if curvature > CURVATURE_FLOOR {
                    -direction.dot(&self.gradient) / curvature
                } else {
                    STEP_SENTINEL
                }
            }
            None => self
                .armijo
                .search(&self.objective, &self.weights, &direction, 1.0, chord_step),
        };

        if step < STALL_TOL {
            self.last_step = 0.0;
            self.status = Status::ConvergedGradient;
            return Ok(());
        }

        let step = clip(step, 0.0, 1.0);
        self.weights = chord_step(&self.weights, &direction, step);
        self.last_step = step;
        Ok(())
    }
}

/// Pairwise Frank-Wolfe.
///
/// Picks the vertex with the smallest gradient coordinate as the mass
/// destination and, over the current support only, the one with the largest
/// as the source, then trades mass directly between the pair. This moves
/// along low-dimensional faces without routing through the interior.
pub struct PairwiseFrankWolfe<O: Objective> {
    objective: O,
    weights: Weights,
    gradient: Array1<f64>,
    distance: f64,
    iteration: usize,
    last_step: f64,
    status: Status,
    history: IterationHistory,
    settings: Settings,
    armijo: ArmijoSearch,
}

impl<O: Objective> Algorithms<O> for PairwiseFrankWolfe<O> {
    fn new(settings: Settings, objective: O) -> Result<Box<Self>> {
        let n = objective.len();
        let weights = initialization::starting_weights(&settings, n, Self::default_start)?;
        Ok(Box::new(Self {
            objective,
            weights,
            gradient: Array1::zeros(n),
            distance: f64::INFINITY,
            iteration: 0,
            last_step: 0.0,
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
        let Some((s, v)) = frank_wolfe_pair(&self.weights, &self.gradient, eps) else {
            self.last_step = 0.0;
            self.status = Status::ConvergedGradient;
            return Ok(());
        };

        let alpha = self.weights[v];
        let direction: Array1<f64> = Array1::from_shape_fn(self.weights.len(), |i| {
            if i == s {
                alpha
            } else if i == v {
                -alpha
            } else {
                0.0
            }
        });

        let step = match self.objective.curvature_along(&direction) {
            Some(curvature) => {
                if curvature > CURVATURE_FLOOR {
                    -direction.dot(&self.gradient) / curvature
                } else {
                    STEP_SENTINEL
                }
            }
            None => {
                self.armijo
                    .search(&self.objective, &self.weights, &direction, 1.0, |w, _d, t| {
                        pair_step(w, s, v, alpha, t)
                    })
            }
        };

        if step < STALL_TOL {
            self.last_step = 0.0;
            self.status = Status::ConvergedGradient;
            return Ok(());
        }

        let step = clip(step, 0.0, 1.0);
        self.weights = pair_step(&self.weights, s, v, alpha, step);
        self.last_step = step;
        Ok(())
    }
}

/// Mass destination and source for the pairwise scheme. The source must be
/// drawn from the current support. Returns `None` when the pair degenerates
/// to a single coordinate.
fn frank_wolfe_pair(w: &Weights, gradient: &Array1<f64>, eps: f64) -> Option<(usize, usize)> {
    let s = gradient.argmin().ok()?;

    let support = w.support(eps);
    let v = *support
        .iter()
        .max_by(|&&a, &&b| {
            gradient[a]
                .partial_cmp(&gradient[b])
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;

    (s != v).then_some((s, v))
}

fn chord_step(w: &Weights, direction: &Array1<f64>, step: f64) -> Weights {
    let mut updated = Weights::new(w.vector() + &(direction * step));
    updated.normalize();
    updated
}

/// Moves `step · alpha` of mass from `v` to `s`.
fn pair_step(w: &Weights, s: usize, v: usize, alpha: f64, step: f64) -> Weights {
    let mut updated = w.clone();
    updated[s] += step * alpha;
    updated[v] -= step * alpha;
    updated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routines::evaluation::objective::HullDistance;
    use crate::structs::hull::Hull;
    use ndarray::array;

    fn settings() -> Settings {
        let mut settings = Settings::default();
        settings.output.write = false;
        settings
    }

    fn triangle() -> Hull {
        Hull::new(
            array![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]],
            array![1.0 / 3.0, 1.0 / 3.0],
        )
        .unwrap()
    }

    #[test]
    fn vertex_variant_converges_to_the_centroid() {
        let mut algorithm = FrankWolfe::new(settings(), HullDistance::new(triangle())).unwrap();
        let result = algorithm.fit().unwrap();

        assert!(result.converged(), "status: {}", result.status());
        assert!(result.distance() < 1e-4);
    }

    #[test]
    fn chord_direction_points_at_the_best_vertex() {
        let hull = Hull::new(array![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]], array![1.0, 0.0]).unwrap();
        let mut config = settings();
        config.config.max_iter = 1;
        config.config.initial_weights = Some(vec![1.0 / 3.0; 3]);

        let mut algorithm = FrankWolfe::new(config, HullDistance::new(hull)).unwrap();
        let result = algorithm.fit().unwrap();

        // From the centroid the oracle picks vertex 1, and the exact chord
        // step lands on it in one move.
        assert!((result.weights()[1] - 1.0).abs() < 1e-12);
        assert!(result.weights()[0].abs() < 1e-12);
        assert!(result.weights()[2].abs() < 1e-12);
    }

    #[test]
    fn pairwise_variant_converges_to_the_centroid() {
        let mut algorithm =
            PairwiseFrankWolfe::new(settings(), HullDistance::new(triangle())).unwrap();
        let result = algorithm.fit().unwrap();

        assert!(result.converged(), "status: {}", result.status());
        assert!(result.distance() < 1e-6);
    }

    #[test]
    fn pair_source_is_restricted_to_the_support() {
        // Coordinate 2 has the largest gradient but no mass, so it cannot
        // be the source.
        let w = Weights::from_vec(vec![0.5, 0.5, 0.0]);
        let gradient = array![0.5, 1.0, 2.0];
        let (s, v) = frank_wolfe_pair(&w, &gradient, 1e-10).unwrap();
        assert_eq!(s, 0);
        assert_eq!(v, 1);
    }

    #[test]
    fn degenerate_pair_is_rejected() {
        let w = Weights::from_vec(vec![1.0, 0.0]);
        let gradient = array![-1.0, 5.0];
        assert!(frank_wolfe_pair(&w, &gradient, 1e-10).is_none());
    }

    #[test]
    fn pairwise_step_conserves_mass() {
        let w = Weights::from_vec(vec![0.4, 0.6]);
        let updated = pair_step(&w, 0, 1, 0.6, 0.5);
        assert!((updated.sum() - 1.0).abs() < 1e-12);
        assert!((updated[0] - 0.7).abs() < 1e-12);
    }
}
