use anyhow::{bail, Result};

use crate::routines::settings::Settings;
use crate::structs::weights::Weights;

/// Resolves the starting weights for a run over `n` coordinates.
///
/// User-supplied weights must already lie on the simplex. When none are
/// given `default_start` provides the algorithm's own starting point.
pub fn starting_weights(
    settings: &Settings,
    n: usize,
    default_start: impl FnOnce(usize) -> Weights,
) -> Result<Weights> {
    match &settings.config.initial_weights {
        Some(prior) => from_prior(prior, n),
        None => Ok(default_start(n)),
    }
}

/// Validates a user-supplied starting point.
pub fn from_prior(prior: &[f64], n: usize) -> Result<Weights> {
    if prior.len() != n {
        bail!(
            "Initial weights have length {}, but the hull has {} points",
            prior.len(),
            n
        );
    }
    if prior.iter().any(|&v| v < 0.0 || !v.is_finite()) {
        bail!("Initial weights must be finite and non-negative");
    }
    let total: f64 = prior.iter().sum();
    if (total - 1.0).abs() > 1e-10 {
        bail!("Initial weights must sum to 1, got {}", total);
    }
    Ok(Weights::from_vec(prior.to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_a_valid_prior() {
        let w = from_prior(&[0.25, 0.25, 0.5], 3).unwrap();
        assert_eq!(w.len(), 3);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(from_prior(&[0.5, 0.5], 3).is_err());
    }

    #[test]
    fn rejects_off_simplex_sums() {
        assert!(from_prior(&[0.5, 0.6], 2).is_err());
    }

    #[test]
    fn rejects_negative_entries() {
        assert!(from_prior(&[1.5, -0.5], 2).is_err());
    }

    #[test]
    fn falls_back_to_the_default_start() {
        let settings = Settings::default();
        let w = starting_weights(&settings, 4, Weights::uniform).unwrap();
        assert!((w.sum() - 1.0).abs() < 1e-12);
    }
}
