use ndarray::Array1;

use crate::routines::math::median;
use crate::structs::weights::Weights;

/// First-order optimality check over the simplex.
///
/// The supported coordinates must share (up to `tol`) a common gradient
/// value, the Lagrange multiplier of the equality constraint. Coordinates
/// at the boundary must then sit at or above that shared value.
pub fn validate_kkt(w: &Weights, gradient: &Array1<f64>, tol: f64, epsilon: f64) -> bool {
    let support = w.support(epsilon);
    let supported: Vec<f64> = support.iter().map(|&i| gradient[i]).collect();

    // An empty support cannot satisfy the equality constraint.
    let Some(multiplier) = median(&supported) else {
        return false;
    };

    let max = supported.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let min = supported.iter().cloned().fold(f64::INFINITY, f64::min);
    if (max - min).abs() >= tol {
        return false;
    }

    check_active_set(w, gradient, -multiplier, tol, epsilon)
}

/// Variance form of the optimality check. Uses the weighted mean gradient as
/// the multiplier and the weighted standard deviation as the spread measure,
/// which avoids sorting the supported gradient.
pub fn validate_kkt_var(w: &Weights, gradient: &Array1<f64>, tol: f64, epsilon: f64) -> bool {
    let multiplier = w.dot(gradient);
    let second_moment = gradient.mapv(|g| g * g).dot(w.vector());
    let spread = (second_moment - multiplier * multiplier).max(0.0).sqrt();
    if spread >= tol {
        return false;
    }

    check_active_set(w, gradient, -multiplier, tol, epsilon)
}

fn check_active_set(
    w: &Weights,
    gradient: &Array1<f64>,
    multiplier: f64,
    tol: f64,
    epsilon: f64,
) -> bool {
    w.iter()
        .zip(gradient.iter())
        .filter(|&(wi, _)| wi <= epsilon)
        .all(|(_, &gi)| gi + multiplier > -tol)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn interior_optimum_satisfies_kkt() {
        let w = Weights::uniform(3);
        let gradient = array![0.5, 0.5, 0.5];
        assert!(validate_kkt(&w, &gradient, 1e-3, 1e-10));
        assert!(validate_kkt_var(&w, &gradient, 1e-3, 1e-10));
    }

    #[test]
    fn unequal_supported_gradient_fails() {
        let w = Weights::uniform(3);
        let gradient = array![0.0, 1.0, 0.5];
        assert!(!validate_kkt(&w, &gradient, 1e-3, 1e-10));
        assert!(!validate_kkt_var(&w, &gradient, 1e-3, 1e-10));
    }

    #[test]
    fn boundary_coordinate_may_have_larger_gradient() {
        let w = Weights::from_vec(vec![0.5, 0.5, 0.0]);
        let gradient = array![0.2, 0.2, 1.0];
        assert!(validate_kkt(&w, &gradient, 1e-3, 1e-10));
    }

    #[test]
    fn boundary_coordinate_with_smaller_gradient_fails() {
        let w = Weights::from_vec(vec![0.5, 0.5, 0.0]);
        let gradient = array![0.2, 0.2, -1.0];
        assert!(!validate_kkt(&w, &gradient, 1e-3, 1e-10));
        assert!(!validate_kkt_var(&w, &gradient, 1e-3, 1e-10));
    }

    #[test]
    fn empty_support_is_rejected() {
        let w = Weights::from_vec(vec![0.0, 0.0, 0.0]);
        let gradient = array![0.0, 0.0, 0.0];
        assert!(!validate_kkt(&w, &gradient, 1e-3, 1e-10));
    }
}
