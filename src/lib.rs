//! Projection onto the convex hull of a point set, by minimizing the
//! squared distance between the target and a weighted combination of the
//! hull points over the probability simplex.
//!
//! Five first-order optimizers are provided: Cauchy-Simplex, exponentiated
//! gradient descent, vertex and pairwise Frank-Wolfe, and projected
//! gradient descent. All of them operate on any [`Objective`], so the same
//! machinery also drives the kernel-density sample reweighting problem.

pub mod algorithms;
pub mod routines;
pub mod structs;

pub mod prelude {
    pub use crate::algorithms::{
        dispatch_algorithm, Algorithm, Algorithms, Status, StoppingType,
    };
    pub use crate::routines::evaluation::kkt::{validate_kkt, validate_kkt_var};
    pub use crate::routines::evaluation::objective::{HullDistance, Objective};
    pub use crate::routines::evaluation::sample_weighting::{
        Gaussian, Kernel, SampleWeighting, UnitNormal,
    };
    pub use crate::routines::logger::setup_log;
    pub use crate::routines::optimization::line_search::{
        ArmijoSearch, BisectionSearch, Merit, SearchType,
    };
    pub use crate::routines::output::{IterationHistory, IterationRecord, ProjResult};
    pub use crate::routines::settings::{read_settings, Settings};
    pub use crate::structs::hull::Hull;
    pub use crate::structs::weights::Weights;
}

use anyhow::Result;
use std::time::Instant;

use prelude::*;

#[cfg(test)]
mod tests;

/// Projects the hull's target point onto the hull with the configured
/// algorithm, writing outputs per the settings.
pub fn start(settings: Settings, hull: Hull) -> Result<ProjResult> {
    let now = Instant::now();
    setup_log(&settings)?;
    let result = fit(settings, HullDistance::new(hull))?;
    tracing::info!("Total time: {:.2?}", now.elapsed());
    result.write_outputs()?;
    Ok(result)
}

/// Runs the configured algorithm against an arbitrary objective. Does not
/// install a logger or write outputs.
pub fn fit<O: Objective + 'static>(settings: Settings, objective: O) -> Result<ProjResult> {
    settings.validate()?;
    let mut algorithm = dispatch_algorithm(settings, objective)?;
    algorithm.fit()
}
