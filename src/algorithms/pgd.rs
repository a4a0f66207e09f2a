use anyhow::Result;
use ndarray::Array1;

use crate::algorithms::{Algorithms, Status};
use crate::routines::evaluation::objective::Objective;
use crate::routines::initialization;
use crate::routines::math::project_onto_simplex;
use crate::routines::optimization::line_search::ArmijoSearch;
use crate::routines::output::IterationHistory;
use crate::routines::settings::Settings;
use crate::structs::weights::Weights;

const CURVATURE_FLOOR: f64 = 1e-12;
const STEP_SENTINEL: f64 = 1e6;

/// Projected gradient descent.
///
/// Takes an unconstrained gradient step with the exact quadratic-minimizing
/// step size and projects the result back onto the simplex.
pub struct PGD<O: Objective> {
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

impl<O: Objective> Algorithms<O> for PGD<O> {
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
        let mut step = match self.objective.curvature_along(&self.gradient) {
            Some(curvature) => {
                if curvature > CURVATURE_FLOOR {
                    self.gradient.dot(&self.gradient) / curvature
                } else {
                    STEP_SENTINEL
                }
            }
            None => self.armijo.search(
                &self.objective,
                &self.weights,
                &self.gradient,
                1.0,
                projected_step,
            ),
        };

        // The Cauchy step is exact along the raw gradient but the projection
        // can clip it past the feasible minimizer, so backtrack until the
        // projected point does not increase the cost.
        let mut candidate = projected_step(&self.weights, &self.gradient, step);
        if self.objective.cost(&candidate) > self.objective.cost(&self.weights) {
            step = self.armijo.search(
                &self.objective,
                &self.weights,
                &self.gradient,
                step,
                projected_step,
            );
            candidate = projected_step(&self.weights, &self.gradient, step);
        }

        self.weights = candidate;
        self.last_step = step;
        Ok(())
    }
}

fn projected_step(w: &Weights, gradient: &Array1<f64>, step: f64) -> Weights {
    let unconstrained: Array1<f64> = w.vector() - &(gradient * step);
    project_onto_simplex(&unconstrained)
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
        let mut algorithm = PGD::new(settings(), HullDistance::new(hull)).unwrap();
        let result = algorithm.fit().unwrap();

        assert!(result.converged(), "status: {}", result.status());
        assert!(result.distance() < 1e-6);
    }

    #[test]
    fn projection_step_stays_on_the_simplex() {
        let w = Weights::uniform(3);
        let gradient = array![10.0, -5.0, 1.0];
        let stepped = projected_step(&w, &gradient, 0.3);
        assert!((stepped.sum() - 1.0).abs() < 1e-12);
        assert!(stepped.iter().all(|v| v >= 0.0));
    }

    #[test]
    fn target_outside_the_hull_hits_the_boundary() {
        let hull = Hull::new(array![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]], array![2.0, 2.0]).unwrap();
        let mut config = settings();
        config.convergence.stopping = StoppingType::Kkt;

        let mut algorithm = PGD::new(config, HullDistance::new(hull)).unwrap();
        let result = algorithm.fit().unwrap();

        assert!(result.converged(), "status: {}", result.status());
        // Closest point is the midpoint of the far edge.
        assert!(result.weights()[0].abs() < 1e-3);
        assert!((result.weights()[1] - 0.5).abs() < 1e-3);
        assert!((result.weights()[2] - 0.5).abs() < 1e-3);
    }
}
