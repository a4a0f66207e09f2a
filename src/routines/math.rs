use ndarray::Array1;
use ndarray_stats::QuantileExt;

use crate::structs::weights::Weights;

/// Clamp `value` into `[min, max]`, mapping non-finite input to `min`.
pub fn clip(value: f64, min: f64, max: f64) -> f64 {
    if !value.is_finite() {
        return min;
    }
    value.clamp(min, max)
}

/// Median of a slice. Averages the two central elements for even lengths.
///
/// Returns `None` for an empty slice.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Euclidean projection of an arbitrary vector onto the probability simplex.
///
/// Sorts the coordinates in descending order and scans for the largest
/// prefix whose shifted mean keeps every retained coordinate positive.
pub fn project_onto_simplex(y: &Array1<f64>) -> Weights {
    let n = y.len();
    let mut sorted: Vec<f64> = y.to_vec();
    sorted.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));

    let mut tau = 0.0;
    let mut running_sum = 0.0;
    for (i, &value) in sorted.iter().enumerate() {
        running_sum += value;
        let candidate = (running_sum - 1.0) / (i + 1) as f64;
        let next = if i + 1 < n {
            sorted[i + 1]
        } else {
            f64::NEG_INFINITY
        };
        if candidate >= next {
            tau = candidate;
            break;
        }
    }

    Weights::new(y.mapv(|v| (v - tau).max(0.0)))
}

/// Multiplicative (exponentiated gradient) update of `w` with step `t`.
///
/// Exponents are shifted by their maximum so that the largest factor is
/// exactly one, which keeps the unnormalized iterate representable. If the
/// update still degenerates the current weights are returned unchanged.
pub fn multiplicative_step(w: &Weights, gradient: &Array1<f64>, t: f64) -> Weights {
    let exponents = gradient.mapv(|g| -t * g);
    let shift = exponents
        .iter()
        .cloned()
        .fold(f64::NEG_INFINITY, f64::max);
    let unnormalized: Array1<f64> = w.vector() * &exponents.mapv(|e| (e - shift).exp());
    let total = unnormalized.sum();
    if !total.is_finite() || total <= 0.0 {
        return w.clone();
    }
    Weights::new(unnormalized / total)
}

/// Largest step that keeps a multiplicative or chord update inside the
/// simplex, bounded by the spread between the steepest supported gradient
/// coordinate and the weighted mean gradient.
///
/// A spread at or below 1e-6 means the gradient is constant over the
/// support, in which case a large sentinel step is returned and the caller's
/// own safeguards take over.
pub fn max_step_size(w: &Weights, gradient: &Array1<f64>, support: &[usize]) -> f64 {
    let mean = w.dot(gradient);
    let max_supported = support
        .iter()
        .map(|&i| gradient[i])
        .fold(f64::NEG_INFINITY, f64::max);
    let diff = max_supported - mean;
    if diff > 1e-6 {
        1.0 / diff
    } else {
        1e6
    }
}

/// Index of the smallest gradient coordinate, the argmin oracle over the
/// simplex vertices.
pub fn argmin_vertex(gradient: &Array1<f64>) -> usize {
    gradient.argmin().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn clip_handles_non_finite() {
        assert_eq!(clip(f64::NAN, 0.0, 1.0), 0.0);
        assert_eq!(clip(f64::INFINITY, 0.0, 1.0), 1.0);
        assert_eq!(clip(0.5, 0.0, 1.0), 0.5);
        assert_eq!(clip(-3.0, 0.0, 1.0), 0.0);
    }

    #[test]
    fn median_of_even_and_odd() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn projection_is_identity_on_simplex() {
        let w = array![0.2, 0.5, 0.3];
        let projected = project_onto_simplex(&w);
        for (a, b) in projected.iter().zip(w.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn projection_lands_on_simplex() {
        let y = array![2.0, -1.0, 0.5, 0.3];
        let projected = project_onto_simplex(&y);
        assert!((projected.sum() - 1.0).abs() < 1e-12);
        assert!(projected.iter().all(|v| v >= 0.0));
    }

    #[test]
    fn projection_of_a_constant_vector_is_uniform() {
        let projected = project_onto_simplex(&array![0.5, 0.5, 0.5]);
        for v in projected.iter() {
            assert!((v - 1.0 / 3.0).abs() < 1e-12);
        }
    }

    #[test]
    fn projection_is_the_nearest_simplex_point() {
        let y = array![0.9, -0.2, 0.4];
        let projected = project_onto_simplex(&y);
        let distance = |w: &Weights| -> f64 {
            w.iter()
                .zip(y.iter())
                .map(|(a, &b)| (a - b) * (a - b))
                .sum()
        };
        let best = distance(&projected);

        // No point on a coarse simplex grid comes closer.
        let steps = 50;
        for i in 0..=steps {
            for j in 0..=(steps - i) {
                let a = i as f64 / steps as f64;
                let b = j as f64 / steps as f64;
                let candidate = Weights::from_vec(vec![a, b, 1.0 - a - b]);
                assert!(best <= distance(&candidate) + 1e-12);
            }
        }
    }

    #[test]
    fn projection_of_large_vertex() {
        let y = array![10.0, 0.0, 0.0];
        let projected = project_onto_simplex(&y);
        assert!((projected[0] - 1.0).abs() < 1e-12);
        assert!(projected[1].abs() < 1e-12);
    }

    #[test]
    fn multiplicative_step_stays_on_simplex() {
        let w = Weights::uniform(3);
        let gradient = array![1.0, -2.0, 0.5];
        let updated = multiplicative_step(&w, &gradient, 0.7);
        assert!((updated.sum() - 1.0).abs() < 1e-12);
        assert!(updated.iter().all(|v| v >= 0.0));
        // The most negative gradient coordinate gains mass.
        assert!(updated[1] > w[1]);
    }

    #[test]
    fn multiplicative_step_survives_huge_steps() {
        let w = Weights::uniform(3);
        let gradient = array![1e4, -1e4, 0.0];
        let updated = multiplicative_step(&w, &gradient, 1e3);
        assert!((updated.sum() - 1.0).abs() < 1e-12);
        assert!(updated.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn max_step_uses_sentinel_for_flat_gradients() {
        let w = Weights::uniform(3);
        let gradient = array![1.0, 1.0, 1.0];
        let support = vec![0, 1, 2];
        assert_eq!(max_step_size(&w, &gradient, &support), 1e6);
    }

    #[test]
    fn max_step_bounds_by_gradient_spread() {
        let w = Weights::uniform(2);
        let gradient = array![2.0, 0.0];
        let support = vec![0, 1];
        // mean = 1.0, max supported = 2.0, so the bound is 1 / 1.0
        assert!((max_step_size(&w, &gradient, &support) - 1.0).abs() < 1e-12);
    }
}
