//! Utility functions for training and evaluation.

pub mod optimization;
pub mod stats;

pub use optimization::{Adam, AdamConfig};
pub use stats::{dispersion, mean, mean_squared_error, std_dev, variance};
