use anyhow::Result;
use ndarray::Array1;

use crate::algorithms::{Algorithms, Status, STEP_UNDERFLOW};
use crate::routines::evaluation::objective::Objective;
use crate::routines::initialization;
use crate::routines::math::multiplicative_step;
use crate::routines::optimization::line_search::{BisectionSearch, Merit};
use crate::routines::output::IterationHistory;
use crate::routines::settings::Settings;
use crate::structs::weights::Weights;

/// Cap for the expanding trust region on the step size.
const T_MAX_CAP: f64 = 1000.0;

/// Exponentiated gradient descent.
///
/// Multiplicative update `w_i ← w_i·exp(−t·g_i) / Z`. The merit function
/// along the exponential path is not quadratic, so the step size comes from
/// a bisection line search over `[0, t_max]` with `t_max` growing with the
/// iteration count.
pub struct EGD<O: Objective> {
    objective: O,
    weights: Weights,
    gradient: Array1<f64>,
    distance: f64,
    iteration: usize,
    last_step: f64,
    status: Status,
    history: IterationHistory,
    settings: Settings,
    search: BisectionSearch,
}

/// Cost along the exponential path `t ↦ f(w ⊙ exp(−t·g) / Z)`.
struct ExponentialMerit<'a, O: Objective> {
    objective: &'a O,
    weights: &'a Weights,
    gradient: &'a Array1<f64>,
}

impl<O: Objective> Merit for ExponentialMerit<'_, O> {
    fn value(&self, t: f64) -> f64 {
        let stepped = multiplicative_step(self.weights, self.gradient, t);
        self.objective.cost(&stepped)
    }

    // d/dt of the path is -w(t) ⊙ (g - w(t)·g), so the chain rule gives
    // q'(t) = -(∇f(w(t))·(w(t) ⊙ g) - (∇f(w(t))·w(t))(w(t)·g)).
    fn derivative(&self, t: f64) -> f64 {
        let stepped = multiplicative_step(self.weights, self.gradient, t);
        let grad_t = self.objective.gradient(&stepped);
        let weighted: Array1<f64> = stepped.vector() * self.gradient;
        -(grad_t.dot(&weighted) - grad_t.dot(stepped.vector()) * stepped.dot(self.gradient))
    }
}

impl<O: Objective> Algorithms<O> for EGD<O> {
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
            search: BisectionSearch::default(),
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
        let t_max = (2.0 * (self.iteration + 1) as f64).min(T_MAX_CAP);

        let merit = ExponentialMerit {
            objective: &self.objective,
            weights: &self.weights,
            gradient: &self.gradient,
        };
        let step = self
            .search
            .search(&merit, t_max, self.settings.convergence.egd_search);

        self.last_step = step;
        if step < STEP_UNDERFLOW {
            self.status = Status::ConvergedGradient;
            return Ok(());
        }

        self.weights = multiplicative_step(&self.weights, &self.gradient, step);
        Ok(())
    }
}
