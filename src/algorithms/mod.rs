use anyhow::Result;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::routines::evaluation::kkt::{validate_kkt, validate_kkt_var};
use crate::routines::evaluation::objective::Objective;
use crate::routines::output::{IterationHistory, IterationRecord, ProjResult};
use crate::routines::settings::Settings;
use crate::structs::weights::Weights;

use cauchy_simplex::CauchySimplex;
use egd::EGD;
use frank_wolfe::{FrankWolfe, PairwiseFrankWolfe};
use pgd::PGD;

pub mod cauchy_simplex;
pub mod egd;
pub mod frank_wolfe;
pub mod pgd;

/// Step sizes below this no longer produce useful descent.
pub const STEP_UNDERFLOW: f64 = 1e-7;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Algorithm {
    CauchySimplex,
    Egd,
    FrankWolfe,
    PairwiseFrankWolfe,
    Pgd,
}

/// Stopping policy evaluated at the top of every iteration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum StoppingType {
    /// First-order optimality, shared gradient over the support.
    Kkt,
    /// Variance form of the optimality check.
    Kktvar,
    /// Squared distance to the hull below `tol`.
    Tol,
    /// Step size underflow.
    Gradient,
}

/// Represents the status of the algorithm
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    /// Algorithm is starting up
    Starting,
    /// Algorithm is currently running
    InProgress,
    /// The KKT conditions are satisfied
    ConvergedKkt,
    /// The variance form of the KKT conditions is satisfied
    ConvergedKktVar,
    /// The squared distance fell below the tolerance
    ConvergedTolerance,
    /// The step size underflowed, no more useful descent
    ConvergedGradient,
    /// Algorithm stopped due to reaching the iteration bound
    MaxIterations,
    /// Terminal sentinel for a run abandoned without satisfying any
    /// stopping criterion. Never produced by the driver loop itself, which
    /// always ends in a Converged* status or MaxIterations; callers that
    /// abort a run between iterations can record it through
    /// [`Algorithms::set_status`].
    Failed,
}

impl Status {
    pub fn converged(&self) -> bool {
        matches!(
            self,
            Status::ConvergedKkt
                | Status::ConvergedKktVar
                | Status::ConvergedTolerance
                | Status::ConvergedGradient
        )
    }

    pub fn terminal(&self) -> bool {
        self.converged() || matches!(self, Status::MaxIterations | Status::Failed)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Starting => write!(f, "Starting"),
            Status::InProgress => write!(f, "In progress"),
            Status::ConvergedKkt => write!(f, "Converged (KKT)"),
            Status::ConvergedKktVar => write!(f, "Converged (KKT variance)"),
            Status::ConvergedTolerance => write!(f, "Converged (tolerance)"),
            Status::ConvergedGradient => write!(f, "Converged (step underflow)"),
            Status::MaxIterations => write!(f, "Maximum iterations reached"),
            Status::Failed => write!(f, "Failed"),
        }
    }
}

pub trait Algorithms<O: Objective> {
    fn new(settings: Settings, objective: O) -> Result<Box<Self>>
    where
        Self: Sized;
    fn settings(&self) -> &Settings;
    fn objective(&self) -> &O;
    fn weights(&self) -> &Weights;
    fn set_weights(&mut self, weights: Weights);
    fn gradient(&self) -> &Array1<f64>;
    fn set_gradient(&mut self, gradient: Array1<f64>);
    fn distance(&self) -> f64;
    fn set_distance(&mut self, distance: f64);
    fn inc_iteration(&mut self) -> usize;
    fn iteration(&self) -> usize;
    fn last_step(&self) -> f64;
    fn set_last_step(&mut self, step: f64);
    fn status(&self) -> &Status;
    fn set_status(&mut self, status: Status);
    fn history(&self) -> &IterationHistory;
    fn history_mut(&mut self) -> &mut IterationHistory;

    /// Starting point used when the configuration does not supply one.
    fn default_start(n: usize) -> Weights
    where
        Self: Sized,
    {
        Weights::uniform(n)
    }

    fn initialize(&mut self) -> Result<()> {
        self.set_status(Status::InProgress);
        Ok(())
    }

    /// Recomputes the gradient and distance at the current iterate.
    fn evaluation(&mut self) {
        let gradient = self.objective().gradient(self.weights());
        let distance = self.objective().cost(self.weights());
        self.set_gradient(gradient);
        self.set_distance(distance);
    }

    fn convergence_evaluation(&mut self) {
        let stopping = self.settings().convergence.stopping;
        let kkt_tol = self.settings().convergence.kkt_tol;
        let tol = self.settings().convergence.tol;
        let eps = self.settings().convergence.active_set_eps;

        match stopping {
            StoppingType::Kkt => {
                if validate_kkt(self.weights(), self.gradient(), kkt_tol, eps) {
                    self.set_status(Status::ConvergedKkt);
                }
            }
            StoppingType::Kktvar => {
                if validate_kkt_var(self.weights(), self.gradient(), kkt_tol, eps) {
                    self.set_status(Status::ConvergedKktVar);
                }
            }
            StoppingType::Tol => {
                if self.distance() < tol {
                    self.set_status(Status::ConvergedTolerance);
                }
            }
            StoppingType::Gradient => {
                if self.iteration() > 0 && self.last_step() < STEP_UNDERFLOW {
                    self.set_status(Status::ConvergedGradient);
                }
            }
        }
    }

    /// One update of the weights. Implementations record the taken step via
    /// [`Algorithms::set_last_step`] and may set a terminal status when the
    /// update stalls.
    fn optimization(&mut self) -> Result<()>;

    /// Weights in the original coordinate space, with boundary coordinates
    /// zeroed out and the rest renormalized.
    fn full_weights(&self) -> Weights {
        let eps = self.settings().convergence.active_set_eps;
        let mut values = self.weights().to_vec();
        for value in values.iter_mut() {
            if *value < eps {
                *value = 0.0;
            }
        }
        let mut weights = Weights::from_vec(values);
        weights.normalize();
        weights
    }

    fn record_iteration(&mut self) {
        let distance = self.objective().cost(self.weights());
        self.set_distance(distance);
        let weights = if self.settings().output.log_weights {
            Some(self.full_weights().to_vec())
        } else {
            None
        };
        let record = IterationRecord::new(self.iteration(), distance, self.last_step(), weights);
        self.history_mut().push(record);
    }

    fn logs(&self) {
        if self.settings().config.verbose {
            tracing::info!("Distance to hull = {:.5e}", self.distance());
        } else {
            tracing::debug!("Distance to hull = {:.5e}", self.distance());
        }
        tracing::debug!("Step size = {:.5e}", self.last_step());
    }

    fn next_iteration(&mut self) -> Result<bool> {
        let span = tracing::info_span!("", "{}", format!("Iteration {}", self.iteration() + 1));
        let _enter = span.enter();

        self.evaluation();
        self.convergence_evaluation();
        if self.status().terminal() {
            return Ok(true);
        }

        self.optimization()?;
        self.inc_iteration();
        self.record_iteration();
        self.logs();

        if self.status().terminal() {
            return Ok(true);
        }

        let max_iter = self.settings().config.max_iter;
        if max_iter >= 0 && self.iteration() as i64 >= max_iter {
            self.set_status(Status::MaxIterations);
            return Ok(true);
        }
        Ok(false)
    }

    fn fit(&mut self) -> Result<ProjResult> {
        self.initialize()?;
        while !self.next_iteration()? {}
        tracing::info!(
            "Finished after {} iteration(s) with status: {}",
            self.iteration(),
            self.status()
        );
        Ok(self.into_result())
    }

    #[allow(clippy::wrong_self_convention)]
    fn into_result(&self) -> ProjResult {
        ProjResult::new(
            self.status().clone(),
            self.distance(),
            self.iteration(),
            self.full_weights(),
            self.history().clone(),
            self.settings().clone(),
        )
    }
}

pub fn dispatch_algorithm<O: Objective + 'static>(
    settings: Settings,
    objective: O,
) -> Result<Box<dyn Algorithms<O>>> {
    match settings.config.algorithm {
        Algorithm::CauchySimplex => Ok(CauchySimplex::new(settings, objective)?),
        Algorithm::Egd => Ok(EGD::new(settings, objective)?),
        Algorithm::FrankWolfe => Ok(FrankWolfe::new(settings, objective)?),
        Algorithm::PairwiseFrankWolfe => Ok(PairwiseFrankWolfe::new(settings, objective)?),
        Algorithm::Pgd => Ok(PGD::new(settings, objective)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn algorithm_names_are_kebab_case() {
        let parsed: Algorithm = serde_json::from_str("\"pairwise-frank-wolfe\"").unwrap();
        assert_eq!(parsed, Algorithm::PairwiseFrankWolfe);
        assert!(serde_json::from_str::<Algorithm>("\"newton\"").is_err());
    }

    #[test]
    fn stopping_names_are_uppercase() {
        let parsed: StoppingType = serde_json::from_str("\"KKTVAR\"").unwrap();
        assert_eq!(parsed, StoppingType::Kktvar);
        assert!(serde_json::from_str::<StoppingType>("\"kkt\"").is_err());
    }

    #[test]
    fn terminal_statuses() {
        assert!(Status::ConvergedKkt.converged());
        assert!(Status::MaxIterations.terminal());
        assert!(!Status::MaxIterations.converged());
        assert!(Status::Failed.terminal());
        assert!(!Status::Failed.converged());
        assert!(!Status::InProgress.terminal());
    }
}
