use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "sensor-forecast",
    version,
    about = "Hourly CO2 / sound / light forecasts for indoor sensors"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one forecast cycle, or one per interval with --schedule.
    Predict(PredictArgs),
    /// Build training artifacts and datasets from raw reading exports.
    Prepare(PrepareArgs),
    /// Delete readings older than the retention window.
    Prune(PruneArgs),
}

#[derive(Args, Debug)]
pub struct PredictArgs {
    /// Fold the running hour's readings into the newest bucket.
    #[arg(long, default_value_t = false)]
    pub live: bool,
    #[arg(long, default_value_t = false)]
    pub schedule: bool,
}

#[derive(Args, Debug)]
pub struct PrepareArgs {
    #[arg(long)]
    pub readings: PathBuf,
    #[arg(long)]
    pub output: PathBuf,
    #[arg(long)]
    pub rooms: Option<PathBuf>,
    #[arg(long)]
    pub val_ratio: Option<f64>,
    #[arg(long)]
    pub test_ratio: Option<f64>,
    #[arg(long, default_value_t = false)]
    pub without_roomtype: bool,
}

#[derive(Args, Debug)]
pub struct PruneArgs {
    #[arg(long)]
    pub days: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predict_flags_parse() {
        let cli = Cli::parse_from(["sensor-forecast", "predict", "--live", "--schedule"]);
        match cli.command {
            Commands::Predict(args) => assert!(args.live && args.schedule),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn prepare_requires_readings_and_output() {
        assert!(Cli::try_parse_from(["sensor-forecast", "prepare", "--readings", "raw"]).is_err());
        let cli = Cli::parse_from([
            "sensor-forecast",
            "prepare",
            "--readings",
            "raw",
            "--output",
            "out",
            "--val-ratio",
            "0.2",
        ]);
        match cli.command {
            Commands::Prepare(args) => {
                assert_eq!(args.readings, PathBuf::from("raw"));
                assert_eq!(args.val_ratio, Some(0.2));
                assert_eq!(args.test_ratio, None);
                assert!(!args.without_roomtype);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn prune_days_is_optional() {
        let cli = Cli::parse_from(["sensor-forecast", "prune"]);
        assert!(matches!(cli.command, Commands::Prune(PruneArgs { days: None })));
    }
}
