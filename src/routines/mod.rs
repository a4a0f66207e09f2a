pub mod evaluation;
pub mod initialization;
pub mod logger;
pub mod math;
pub mod optimization;
pub mod output;
pub mod settings;
