use crate::days::{DayOfWeek, HOURS_PER_DAY};
use serde::Serialize;

/// Number of hourly steps each model predicts.
pub const HORIZON: usize = 3;

/// The (day, hour) slot a predicted row stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ForecastTarget {
    pub day: DayOfWeek,
    pub hour: u8,
}

/// The three hours following the window's newest row. Crossing midnight moves
/// the target to the next day.
pub fn forecast_targets(last_day: DayOfWeek, last_hour: u8) -> [ForecastTarget; HORIZON] {
    let target = |step: u8| {
        let hour = (last_hour + step) % HOURS_PER_DAY;
        let day = if hour < last_hour { last_day.next() } else { last_day };
        ForecastTarget { day, hour }
    };
    [target(1), target(2), target(3)]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(index: i64) -> DayOfWeek {
        DayOfWeek::from_store(index).unwrap()
    }

    #[test]
    fn same_day_targets() {
        let targets = forecast_targets(day(3), 9);
        let hours: Vec<u8> = targets.iter().map(|t| t.hour).collect();
        assert_eq!(hours, vec![10, 11, 12]);
        assert!(targets.iter().all(|t| t.day == day(3)));
    }

    #[test]
    fn targets_past_midnight_roll_the_day() {
        let targets = forecast_targets(day(2), 22);
        assert_eq!(targets[0], ForecastTarget { day: day(2), hour: 23 });
        assert_eq!(targets[1], ForecastTarget { day: day(3), hour: 0 });
        assert_eq!(targets[2], ForecastTarget { day: day(3), hour: 1 });
    }

    #[test]
    fn saturday_night_rolls_to_sunday() {
        let targets = forecast_targets(day(6), 23);
        assert!(targets.iter().all(|t| t.day == DayOfWeek::SUNDAY));
        assert_eq!(targets[2].hour, 2);
    }
}
