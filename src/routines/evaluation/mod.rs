pub mod kkt;
pub mod objective;
pub mod sample_weighting;
