use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct RoomRecord {
    #[serde(rename = "Device ID", default)]
    device_id: Option<String>,
    #[serde(rename = "Room type", default)]
    room_type: Option<String>,
}

/// Sensor -> room type reference table.
#[derive(Debug, Clone, Default)]
pub struct RoomDirectory {
    by_sensor: BTreeMap<String, String>,
    /// Every listed room type, including rows without a device.
    roomtypes: BTreeSet<String>,
}

impl RoomDirectory {
    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("failed to open room table {}", path.display()))?;
        Self::from_reader(file).with_context(|| format!("failed to parse room table {}", path.display()))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut by_sensor = BTreeMap::new();
        let mut roomtypes = BTreeSet::new();
        for record in csv.deserialize::<RoomRecord>() {
            let record = record?;
            let Some(room) = record.room_type.filter(|room| !room.is_empty()) else {
                continue;
            };
            roomtypes.insert(room.clone());
            if let Some(device) = record.device_id.filter(|device| !device.is_empty()) {
                by_sensor.insert(device, room);
            }
        }
        Ok(Self { by_sensor, roomtypes })
    }

    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        let by_sensor: BTreeMap<String, String> = pairs
            .into_iter()
            .map(|(sensor, room)| (sensor.into(), room.into()))
            .collect();
        let roomtypes = by_sensor.values().cloned().collect();
        Self { by_sensor, roomtypes }
    }

    pub fn roomtype(&self, sensor: &str) -> Option<&str> {
        self.by_sensor.get(sensor).map(String::as_str)
    }

    pub fn roomtypes(&self) -> impl Iterator<Item = &str> {
        self.roomtypes.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_table_and_skips_blank_rows() {
        let csv = "Device ID,Room type,Floor\nthingy001,Office,1\n,Kitchen,2\nthingy002, Lecture hall ,3\nthingy003,,1\n";
        let rooms = RoomDirectory::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(rooms.roomtype("thingy001"), Some("Office"));
        assert_eq!(rooms.roomtype("thingy002"), Some("Lecture hall"));
        assert_eq!(rooms.roomtype("thingy003"), None);
        assert_eq!(rooms.roomtype(""), None);
    }

    #[test]
    fn room_types_without_a_device_are_still_listed() {
        let csv = "Device ID,Room type\nthingy001,Office\n,Kitchen\nthingy002,Office\n";
        let rooms = RoomDirectory::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(rooms.roomtypes().collect::<Vec<_>>(), vec!["Kitchen", "Office"]);
        assert_eq!(rooms.roomtype("thingy002"), Some("Office"));
    }
}
