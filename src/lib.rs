//! # aquacast
//!
//! Per-entity water forecasting from heterogeneous annual datasets.
//!
//! Raw temperature, water and population records are aligned on entity
//! labels, fused into one annual series per entity, normalized, sliced into
//! windows and used to train a small LSTM regressor. The trained model then
//! forecasts water use or resources recursively for a chosen horizon,
//! together with a held-out residual dispersion.
//!
//! The entry point is [`pipeline::PipelineOrchestrator`].

// Allow some clippy warnings for cleaner code in specific cases
#![allow(clippy::too_many_arguments)]
#![allow(clippy::needless_range_loop)]

pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod fusion;
pub mod models;
pub mod pipeline;
pub mod progress;
pub mod resolve;
pub mod transform;
pub mod utils;

pub use error::{ForecastError, Result};

pub mod prelude {
    pub use crate::config::{PipelineConfig, ResolverConfig, TrainingConfig};
    pub use crate::core::{
        ForecastResult, FusedRecord, NumericPolicy, RawRecord, SourceTag, WaterKind, YearValue,
    };
    pub use crate::error::{ForecastError, Result};
    pub use crate::fusion::RawDatasets;
    pub use crate::models::{LstmConfig, LstmTrainer, Trainer};
    pub use crate::pipeline::PipelineOrchestrator;
    pub use crate::progress::{progress_channel, CancellationToken, EpochEvent, ProgressObserver};
}
