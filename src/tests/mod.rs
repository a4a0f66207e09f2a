use crate::prelude::*;

#[test]
fn read_mandatory_settings() {
    let settings = read_settings("src/tests/config.toml").unwrap();
    assert_eq!(settings.config.algorithm, Algorithm::Egd);
    assert_eq!(settings.config.max_iter, 500);
    assert!(!settings.output.write);
    assert_eq!(settings.log.level, "debug");
}

#[test]
fn read_convergence_settings() {
    let settings = read_settings("src/tests/config.toml").unwrap();
    assert_eq!(settings.convergence.stopping, StoppingType::Kktvar);
    assert_eq!(settings.convergence.egd_search, SearchType::Wolfe);
    assert!((settings.convergence.kkt_tol - 1e-4).abs() < f64::EPSILON);
}

#[test]
fn missing_keys_fall_back_to_defaults() {
    let settings = read_settings("src/tests/config.toml").unwrap();
    assert!((settings.convergence.tol - 1e-6).abs() < f64::EPSILON);
    assert!((settings.convergence.active_set_eps - 1e-10).abs() < f64::EPSILON);
    assert_eq!(settings.convergence.reset_threshold, -1);
    assert_eq!(settings.output.path, "output");
    assert!(settings.config.initial_weights.is_none());
}

#[test]
fn validation_rejects_bad_tolerances() {
    let mut settings = Settings::default();
    settings.convergence.kkt_tol = 0.0;
    assert!(settings.validate().is_err());

    let mut settings = Settings::default();
    settings.config.max_iter = 0;
    assert!(settings.validate().is_err());
}

#[test]
fn unbounded_iterations_are_allowed() {
    let mut settings = Settings::default();
    settings.config.max_iter = -1;
    assert!(settings.validate().is_ok());
}
