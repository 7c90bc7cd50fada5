mod cycle;
mod denormalize;
mod predictor;
mod query;
mod severity;
mod targets;
mod timestamps;
mod window;


pub use cycle::{
    CycleReport, CycleSettings, ForecastCycle, ForecastDocument, ForecastEntry, ForecastSink, ReadingSource,
};
pub use denormalize::{restore_level, DenormalizedStep, ResultDenormalizer};
pub use predictor::{HttpPredictor, ModelVariant, Predictor};
pub use query::{floor_hour, order_buckets, BucketReading, QueryWindow, WindowMode};
pub use severity::{classify, ColorCode, SeverityClassifier};
pub use targets::{forecast_targets, ForecastTarget, HORIZON};
pub use timestamps::{format_timestamp, prediction_timestamp, TIMESTAMP_FORMAT};
pub use window::{WindowBuilder, WindowTensor, WINDOW_ROWS};
