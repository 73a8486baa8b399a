pub mod error;
pub mod loader;
pub mod matrix;
pub mod types;
