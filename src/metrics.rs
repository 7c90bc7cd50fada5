use serde::{Deserialize, Serialize};
use std::fmt;

/// The three forecast metrics, in feature-column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Metric {
    #[serde(rename = "eCO2")]
    Eco2,
    #[serde(rename = "sound")]
    Sound,
    #[serde(rename = "light")]
    Light,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Eco2, Metric::Sound, Metric::Light];

    pub fn as_str(self) -> &'static str {
        match self {
            Metric::Eco2 => "eCO2",
            Metric::Sound => "sound",
            Metric::Light => "light",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One value per metric.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PerMetric<T> {
    #[serde(rename = "eCO2")]
    pub eco2: T,
    pub sound: T,
    pub light: T,
}

impl<T> PerMetric<T> {
    pub fn new(eco2: T, sound: T, light: T) -> Self {
        Self { eco2, sound, light }
    }

    pub fn get(&self, metric: Metric) -> &T {
        match metric {
            Metric::Eco2 => &self.eco2,
            Metric::Sound => &self.sound,
            Metric::Light => &self.light,
        }
    }

    pub fn get_mut(&mut self, metric: Metric) -> &mut T {
        match metric {
            Metric::Eco2 => &mut self.eco2,
            Metric::Sound => &mut self.sound,
            Metric::Light => &mut self.light,
        }
    }

    pub fn map<U>(self, mut f: impl FnMut(Metric, T) -> U) -> PerMetric<U> {
        PerMetric {
            eco2: f(Metric::Eco2, self.eco2),
            sound: f(Metric::Sound, self.sound),
            light: f(Metric::Light, self.light),
        }
    }

    pub fn try_map<U, E>(
        self,
        mut f: impl FnMut(Metric, T) -> Result<U, E>,
    ) -> Result<PerMetric<U>, E> {
        Ok(PerMetric {
            eco2: f(Metric::Eco2, self.eco2)?,
            sound: f(Metric::Sound, self.sound)?,
            light: f(Metric::Light, self.light)?,
        })
    }

    pub fn from_fn(mut f: impl FnMut(Metric) -> T) -> Self {
        PerMetric {
            eco2: f(Metric::Eco2),
            sound: f(Metric::Sound),
            light: f(Metric::Light),
        }
    }

    pub fn try_from_fn<E>(mut f: impl FnMut(Metric) -> Result<T, E>) -> Result<Self, E> {
        Ok(PerMetric {
            eco2: f(Metric::Eco2)?,
            sound: f(Metric::Sound)?,
            light: f(Metric::Light)?,
        })
    }
}

impl PerMetric<f64> {
    pub fn round(self) -> Self {
        self.map(|_, v| v.round())
    }
}
