use crate::error::{ForecastError, ForecastResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryKind {
    Sensor,
    Roomtype,
}

impl CategoryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CategoryKind::Sensor => "sensor",
            CategoryKind::Roomtype => "roomtype",
        }
    }
}

/// Dense integer encoding of a closed set of category labels.
///
/// Classes are kept sorted and deduplicated, so fitting the same universe twice
/// always yields the same indices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    kind: CategoryKind,
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn fit<I, S>(kind: CategoryKind, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut classes: Vec<String> = labels
            .into_iter()
            .map(|label| label.as_ref().trim().to_string())
            .filter(|label| !label.is_empty())
            .collect();
        classes.sort();
        classes.dedup();
        Self { kind, classes }
    }

    pub fn kind(&self) -> CategoryKind {
        self.kind
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn transform(&self, label: &str) -> ForecastResult<usize> {
        self.classes
            .binary_search_by(|class| class.as_str().cmp(label.trim()))
            .map_err(|_| ForecastError::UnknownCategory {
                kind: self.kind.as_str(),
                value: label.to_string(),
            })
    }
}
