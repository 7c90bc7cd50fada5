use crate::days::HOURS_PER_DAY;
use crate::metrics::Metric;
use crate::series::{SensorSeries, SeriesRow};
use crate::stats::slot_stats;

pub const OUTLIER_Z_THRESHOLD: f64 = 2.5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterReport {
    pub outlier_rows: usize,
    pub partial_days: usize,
    pub partial_day_rows: usize,
}

/// Drops z-score outliers, then every day block that is missing an hour.
pub fn filter_series(series: &SensorSeries) -> (SensorSeries, FilterReport) {
    let (kept, outlier_rows) = remove_outliers(&series.rows, OUTLIER_Z_THRESHOLD);
    let before = kept.len();
    let (kept, partial_days) = remove_partial_days(kept);
    let report = FilterReport {
        outlier_rows,
        partial_days,
        partial_day_rows: before - kept.len(),
    };
    tracing::debug!(
        sensor = %series.sensor,
        outlier_rows = report.outlier_rows,
        partial_days = report.partial_days,
        "filtered series"
    );
    (
        SensorSeries::new(series.sensor.clone(), series.roomtype.clone(), kept),
        report,
    )
}

/// A row is an outlier when its largest absolute per-slot z-score exceeds `threshold`.
pub fn remove_outliers(rows: &[SeriesRow], threshold: f64) -> (Vec<SeriesRow>, usize) {
    let stats = slot_stats(rows);
    let mut kept = Vec::with_capacity(rows.len());
    let mut removed = 0;
    for row in rows {
        let max_z = stats
            .get(&(row.day, row.hour))
            .map(|slot| {
                Metric::ALL
                    .iter()
                    .map(|metric| slot.get(*metric).normalize(*row.values.get(*metric)).abs())
                    .fold(0.0, f64::max)
            })
            .unwrap_or(0.0);
        if max_z > threshold {
            removed += 1;
        } else {
            kept.push(row.clone());
        }
    }
    (kept, removed)
}

/// Removes each run of consecutive same-day rows that does not cover all 24 hours.
/// Returns the kept rows and the number of removed day blocks.
pub fn remove_partial_days(rows: Vec<SeriesRow>) -> (Vec<SeriesRow>, usize) {
    let mut kept = Vec::with_capacity(rows.len());
    let mut removed_days = 0;
    let mut block: Vec<SeriesRow> = Vec::new();
    let mut seen = [false; HOURS_PER_DAY as usize];

    let mut close_block = |block: &mut Vec<SeriesRow>, seen: &mut [bool; 24], kept: &mut Vec<SeriesRow>| {
        if block.is_empty() {
            return;
        }
        if seen.iter().all(|hour| *hour) {
            kept.append(block);
        } else {
            removed_days += 1;
            block.clear();
        }
        *seen = [false; HOURS_PER_DAY as usize];
    };

    for row in rows {
        if block.last().map(|prev| prev.day != row.day).unwrap_or(false) {
            close_block(&mut block, &mut seen, &mut kept);
        }
        if let Some(slot) = seen.get_mut(row.hour as usize) {
            *slot = true;
        }
        block.push(row);
    }
    close_block(&mut block, &mut seen, &mut kept);

    (kept, removed_days)
}
