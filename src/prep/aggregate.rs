use crate::days::DayOfWeek;
use crate::metrics::PerMetric;
use crate::rooms::RoomDirectory;
use crate::series::{light_from_rgb, SensorSeries, SeriesRow};
use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::{Path, PathBuf};

const TIME_FORMATS: [&str; 3] = ["%Y-%m-%d_%H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// One row of a raw sensor export. The devices publish metric and colour
/// readings as separate messages, so each row carries only one half.
#[derive(Debug, Clone, Deserialize)]
pub struct RawMessage {
    pub time: String,
    pub sensor: String,
    #[serde(rename = "eCO2", default)]
    pub eco2: Option<f64>,
    #[serde(default)]
    pub sound: Option<f64>,
    #[serde(default)]
    pub color_r: Option<f64>,
    #[serde(default)]
    pub color_g: Option<f64>,
    #[serde(default)]
    pub color_b: Option<f64>,
}

impl RawMessage {
    fn is_metric(&self) -> bool {
        self.eco2.is_some() && self.color_r.is_none()
    }

    fn is_color(&self) -> bool {
        self.eco2.is_none() && self.color_r.is_some()
    }
}

/// A metric message joined with the colour message that followed it.
#[derive(Debug, Clone, PartialEq)]
pub struct RawReading {
    pub sensor: String,
    pub time: NaiveDateTime,
    pub values: PerMetric<f64>,
}

pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|ts| ts.naive_local()))
}

/// Pairs each sensor's metric message with its next colour message. Only every
/// other completed pair of a sensor is kept, starting with the first. Colour
/// messages without a pending metric message are dropped, as are rows whose
/// timestamp cannot be parsed.
pub fn pair_messages(messages: impl IntoIterator<Item = RawMessage>) -> Vec<RawReading> {
    let mut pending: HashMap<String, RawMessage> = HashMap::new();
    let mut skip_next: HashMap<String, bool> = HashMap::new();
    let mut readings = Vec::new();
    let mut unparsable = 0usize;

    for message in messages {
        if message.is_metric() {
            pending.insert(message.sensor.clone(), message);
            continue;
        }
        if !message.is_color() {
            continue;
        }
        let Some(metric) = pending.remove(&message.sensor) else {
            continue;
        };
        let skip = skip_next.entry(message.sensor.clone()).or_default();
        let dropped = *skip;
        *skip = !*skip;
        if dropped {
            continue;
        }
        let Some(time) = parse_timestamp(&metric.time) else {
            unparsable += 1;
            continue;
        };
        let light = light_from_rgb(
            message.color_r.unwrap_or_default(),
            message.color_g.unwrap_or_default(),
            message.color_b.unwrap_or_default(),
        );
        readings.push(RawReading {
            sensor: metric.sensor,
            time,
            values: PerMetric::new(metric.eco2.unwrap_or_default(), metric.sound.unwrap_or_default(), light),
        });
    }

    if unparsable > 0 {
        tracing::warn!(unparsable, "dropped readings with unparsable timestamps");
    }
    readings
}

pub fn read_messages<R: Read>(reader: R) -> Result<Vec<RawMessage>> {
    let mut csv = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    csv.deserialize()
        .collect::<Result<Vec<RawMessage>, _>>()
        .context("failed to decode raw reading rows")
}

/// Reads every `*.csv` export in `dir` (sorted by name) and pairs messages per file.
pub fn load_readings_dir(dir: &Path) -> Result<Vec<RawReading>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("failed to list readings directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "csv"))
        .collect();
    files.sort();

    let mut readings = Vec::new();
    for path in files {
        let file = std::fs::File::open(&path).with_context(|| format!("failed to open {}", path.display()))?;
        let messages = read_messages(file).with_context(|| format!("failed to read {}", path.display()))?;
        let before = readings.len();
        readings.extend(pair_messages(messages));
        tracing::debug!(file = %path.display(), readings = readings.len() - before, "paired raw messages");
    }
    Ok(readings)
}

#[derive(Debug, Default, Clone, Copy)]
struct HourSum {
    values: PerMetric<f64>,
    count: usize,
}

/// Averages readings per (sensor, date, hour), rounds, and returns one
/// chronological series per sensor with the room type attached.
pub fn hourly_series(readings: &[RawReading], rooms: &RoomDirectory) -> Vec<SensorSeries> {
    let mut sums: BTreeMap<&str, BTreeMap<(NaiveDate, u8), HourSum>> = BTreeMap::new();
    for reading in readings {
        let hour = reading.time.hour() as u8;
        let sum = sums
            .entry(reading.sensor.as_str())
            .or_default()
            .entry((reading.time.date(), hour))
            .or_default();
        for metric in crate::metrics::Metric::ALL {
            *sum.values.get_mut(metric) += *reading.values.get(metric);
        }
        sum.count += 1;
    }

    sums.into_iter()
        .map(|(sensor, hours)| {
            let rows = hours
                .into_iter()
                .map(|((date, hour), sum)| {
                    let count = sum.count as f64;
                    let values = sum.values.map(|_, total| total / count).round();
                    SeriesRow::new(DayOfWeek::from_weekday(date.weekday()), hour, values)
                })
                .collect();
            let roomtype = rooms.roomtype(sensor).map(str::to_string);
            if roomtype.is_none() {
                tracing::warn!(sensor, "sensor is missing from the room table");
            }
            SensorSeries::new(sensor, roomtype, rows)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPORT: &str = "\
time,sensor,eCO2,sound,color_r,color_g,color_b
2024-03-04_09:10:00,thingy001,600,40,,,
2024-03-04_09:10:05,thingy001,,,30,60,90
2024-03-04_09:40:00,thingy001,700,50,,,
2024-03-04_09:40:02,thingy002,,,1,1,1
2024-03-04_09:40:05,thingy001,,,60,60,60
2024-03-04_10:05:00,thingy001,501,31,,,
2024-03-04_10:05:01,thingy001,,,10,10,10
";

    #[test]
    fn pairs_metric_and_colour_messages_per_sensor() {
        let messages = read_messages(EXPORT.as_bytes()).unwrap();
        assert_eq!(messages.len(), 7);

        // the 09:40 pair is the second of thingy001 and is dropped
        let readings = pair_messages(messages);
        assert_eq!(readings.len(), 2);
        assert!(readings.iter().all(|r| r.sensor == "thingy001"));
        assert_eq!(readings[0].values, PerMetric::new(600.0, 40.0, 60.0));
        assert_eq!(readings[0].time.minute(), 10);
        assert_eq!(readings[1].values, PerMetric::new(501.0, 31.0, 10.0));
    }

    #[test]
    fn every_other_pair_is_kept_per_sensor() {
        let export = "\
time,sensor,eCO2,sound,color_r,color_g,color_b
2024-03-04_09:00:00,thingy001,600,40,,,
2024-03-04_09:00:00,thingy002,800,60,,,
2024-03-04_09:00:01,thingy001,,,30,30,30
2024-03-04_09:00:01,thingy002,,,90,90,90
2024-03-04_09:00:30,thingy001,610,41,,,
2024-03-04_09:00:31,thingy001,,,30,30,30
2024-03-04_09:01:00,thingy001,620,42,,,
2024-03-04_09:01:01,thingy001,,,30,30,30
";
        let readings = pair_messages(read_messages(export.as_bytes()).unwrap());
        let eco2: Vec<(&str, f64)> = readings
            .iter()
            .map(|r| (r.sensor.as_str(), r.values.eco2))
            .collect();
        assert_eq!(eco2, vec![("thingy001", 600.0), ("thingy002", 800.0), ("thingy001", 620.0)]);
    }

    #[test]
    fn averages_per_hour_with_day_from_the_date() {
        let readings = pair_messages(read_messages(EXPORT.as_bytes()).unwrap());
        let rooms = RoomDirectory::from_pairs([("thingy001", "Office")]);

        let series = hourly_series(&readings, &rooms);
        assert_eq!(series.len(), 1);
        let series = &series[0];
        assert_eq!(series.roomtype.as_deref(), Some("Office"));
        assert_eq!(series.rows.len(), 2);

        // 2024-03-04 is a Monday
        let first = &series.rows[0];
        assert_eq!(first.day.store_index(), 1);
        assert_eq!(first.hour, 9);
        assert_eq!(first.values, PerMetric::new(600.0, 40.0, 60.0));
        assert_eq!(series.rows[1].hour, 10);
    }

    #[test]
    fn readings_in_one_hour_are_averaged_and_rounded() {
        let at = |minute: u32| {
            NaiveDate::from_ymd_opt(2024, 3, 9)
                .unwrap()
                .and_hms_opt(22, minute, 0)
                .unwrap()
        };
        let readings = vec![
            RawReading {
                sensor: "thingy001".to_string(),
                time: at(5),
                values: PerMetric::new(600.0, 40.0, 61.0),
            },
            RawReading {
                sensor: "thingy001".to_string(),
                time: at(50),
                values: PerMetric::new(701.0, 45.0, 60.0),
            },
        ];
        let series = hourly_series(&readings, &RoomDirectory::default());
        assert_eq!(series[0].rows.len(), 1);
        // 2024-03-09 is a Saturday
        assert_eq!(series[0].rows[0].day.store_index(), 6);
        assert_eq!(series[0].rows[0].values, PerMetric::new(651.0, 43.0, 61.0));
    }

    #[test]
    fn accepts_several_timestamp_spellings() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(9, 10, 0)
            .unwrap();
        for raw in [
            "2024-03-04_09:10:00",
            "2024-03-04T09:10:00",
            "2024-03-04 09:10:00",
            "2024-03-04T09:10:00+01:00",
        ] {
            assert_eq!(parse_timestamp(raw), Some(expected), "{raw}");
        }
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn loads_every_csv_in_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("sensors-thingy-a.csv"), EXPORT).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let readings = load_readings_dir(dir.path()).unwrap();
        assert_eq!(readings.len(), 2);
    }
}
