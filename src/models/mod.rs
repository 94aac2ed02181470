//! Sequence regression models.

mod traits;

pub mod lstm;

pub use lstm::{LstmConfig, LstmRegressor, LstmTrainer};
pub use traits::Trainer;
