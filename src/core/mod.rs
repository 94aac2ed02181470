//! Core data structures shared by every pipeline stage.

mod forecast;
mod record;

pub use forecast::{ForecastResult, YearValue};
pub use record::{
    parse_numeric, FeatureVector, FusedRecord, NumericPolicy, RawRecord, SourceTag, WaterKind,
    FEATURE_COUNT, WATER_FEATURE,
};
