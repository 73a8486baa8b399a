pub mod detector;
pub mod engine;
pub mod error;
pub mod forest;
pub mod rules;
pub mod types;
