//! Data transformations for the fused series.
//!
//! Provides z-score scaling and sliding-window construction.
//!
//! # Example
//!
//! ```
//! use aquacast::transform::ScalerParams;
//!
//! let params = ScalerParams::fit(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
//! let z = params.forward(4.0);
//! assert!((params.inverse(z) - 4.0).abs() < 1e-12);
//! ```

pub mod scale;
pub mod window;

pub use scale::{FeatureScalers, NormalizedRecord, ScalerParams};
pub use window::{
    build_windows, split, InputWindow, Window, WindowBuilder, DEFAULT_TRAIN_FRACTION,
    DEFAULT_WINDOW_SIZE,
};
