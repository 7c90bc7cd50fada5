//! Offline preparation: raw exports to cleaned series, statistics and training windows.

pub mod aggregate;
pub mod dataset;
pub mod outliers;
pub mod repair;
pub mod splitter;

pub use dataset::{prepare, run_prepare, PrepareOptions, PrepareReport, PreparedDataset};
pub use outliers::{filter_series, FilterReport};
pub use repair::{repair_series, RepairOutcome};
pub use splitter::{split_many, split_sequences, SequencePair, SequenceSplit};
