pub mod hull;
pub mod weights;
