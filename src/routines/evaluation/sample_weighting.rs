use anyhow::{bail, Result};
use ndarray::{Array1, Array2, Axis};

use crate::routines::evaluation::objective::Objective;
use crate::structs::weights::Weights;

const SQRT_TAU: f64 = 2.5066282746310002;

/// Smoothing kernel for the kernel density estimate.
pub trait Kernel: Clone {
    /// Kernel density at the standardized offset `u`.
    fn density(&self, u: f64) -> f64;
    /// Derivative of [`Kernel::density`] with respect to `u`.
    fn density_grad(&self, u: f64) -> f64;
}

/// Standard normal kernel.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnitNormal;

impl Kernel for UnitNormal {
    fn density(&self, u: f64) -> f64 {
        (-0.5 * u * u).exp() / SQRT_TAU
    }

    fn density_grad(&self, u: f64) -> f64 {
        -(u / SQRT_TAU) * (-0.5 * u * u).exp()
    }
}

/// Normal kernel with location `mu` and scale `std`.
#[derive(Debug, Clone, Copy)]
pub struct Gaussian {
    pub mu: f64,
    pub std: f64,
}

impl Kernel for Gaussian {
    fn density(&self, u: f64) -> f64 {
        let z = (u - self.mu) / self.std;
        (-0.5 * z * z).exp() / (self.std * SQRT_TAU)
    }

    fn density_grad(&self, u: f64) -> f64 {
        let z = (u - self.mu) / self.std;
        ((self.mu - u) / (SQRT_TAU * self.std.powi(3))) * (-0.5 * z * z).exp()
    }
}

/// Kullback-Leibler divergence between a kernel density estimate of the
/// weighted sample combination and a fixed target density, integrated on a
/// grid with the left Riemann rule.
///
/// Each weight multiplies a column of `data`, so the estimate is built from
/// the combined sample `X = data · w` of length `nrows`.
#[derive(Debug, Clone)]
pub struct SampleWeighting<K: Kernel> {
    data: Array2<f64>,
    grid: Array1<f64>,
    dx: Array1<f64>,
    target: Array1<f64>,
    bandwidth: f64,
    kernel: K,
}

impl<K: Kernel> SampleWeighting<K> {
    pub fn new(
        data: Array2<f64>,
        integration_points: Array1<f64>,
        target_density: impl Fn(f64) -> f64,
        kernel: K,
        bandwidth: f64,
    ) -> Result<Self> {
        if data.ncols() == 0 || data.nrows() == 0 {
            bail!("Sample matrix must be non-empty");
        }
        if integration_points.len() < 2 {
            bail!("At least two integration points are required");
        }
        if bandwidth <= 0.0 {
            bail!("Bandwidth must be positive, got {}", bandwidth);
        }
        let m = integration_points.len() - 1;
        let grid = integration_points.slice(ndarray::s![..m]).to_owned();
        let dx = &integration_points.slice(ndarray::s![1..]) - &grid;
        let target = grid.mapv(&target_density);
        Ok(Self {
            data,
            grid,
            dx,
            target,
            bandwidth,
            kernel,
        })
    }

    /// Kernel density estimate of `data · w` at the integration grid.
    pub fn density_estimate(&self, w: &Weights) -> Array1<f64> {
        let combined = self.data.dot(w.vector());
        let n = combined.len() as f64;
        self.grid.mapv(|x| {
            let total: f64 = combined
                .iter()
                .map(|&s| self.kernel.density((x - s) / self.bandwidth))
                .sum();
            total / (n * self.bandwidth)
        })
    }

    fn density_estimate_grad(&self, w: &Weights) -> Array2<f64> {
        let combined = self.data.dot(w.vector());
        let scale = -1.0 / (combined.len() as f64 * self.bandwidth.powi(2));
        let mut out = Array2::zeros((self.grid.len(), self.data.ncols()));
        for (j, &x) in self.grid.iter().enumerate() {
            for (i, &s) in combined.iter().enumerate() {
                let slope = self.kernel.density_grad((x - s) / self.bandwidth);
                for (k, value) in self.data.row(i).iter().enumerate() {
                    out[(j, k)] += scale * slope * value;
                }
            }
        }
        out
    }

    fn safe_log(x: f64) -> f64 {
        if x > 0.0 {
            x.ln()
        } else {
            0.0
        }
    }
}

impl<K: Kernel> Objective for SampleWeighting<K> {
    fn len(&self) -> usize {
        self.data.ncols()
    }

    fn cost(&self, w: &Weights) -> f64 {
        let rho = self.density_estimate(w);
        rho.iter()
            .zip(self.target.iter())
            .zip(self.dx.iter())
            .map(|((&r, &f), &dx)| r * Self::safe_log(r / f) * dx)
            .sum()
    }

    fn gradient(&self, w: &Weights) -> Array1<f64> {
        let rho = self.density_estimate(w);
        let rho_grad = self.density_estimate_grad(w);
        let coeff: Array1<f64> = rho
            .iter()
            .zip(self.target.iter())
            .zip(self.dx.iter())
            .map(|((&r, &f), &dx)| dx * (Self::safe_log(r / f) + 1.0))
            .collect();
        coeff.dot(&rho_grad)
    }

    fn restricted(&self, keep: &[usize]) -> Self {
        Self {
            data: self.data.select(Axis(1), keep),
            grid: self.grid.clone(),
            dx: self.dx.clone(),
            target: self.target.clone(),
            bandwidth: self.bandwidth,
            kernel: self.kernel.clone(),
        }
    }
}
