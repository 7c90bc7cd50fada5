pub mod artifacts;
pub mod config;
pub mod days;
pub mod db;
pub mod encoding;
pub mod error;
pub mod features;
pub mod inference;
pub mod metrics;
pub mod prep;
pub mod rooms;
pub mod series;
pub mod stats;
