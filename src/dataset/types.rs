//! Record types for labeled flow captures.
//!
//! A record's category is a typed field attached when the row is loaded,
//! never inferred from the row's text.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Device type that produced a flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "amazonEcho")]
    AmazonEcho,
    #[serde(rename = "babyMonitor")]
    BabyMonitor,
    #[serde(rename = "belkinMotion")]
    BelkinMotion,
    #[serde(rename = "blipcareBP")]
    BlipcareBp,
    #[serde(rename = "laptop")]
    Laptop,
    #[serde(rename = "lifxlighbulb")]
    LifxLightbulb,
    #[serde(rename = "netatmo")]
    Netatmo,
    #[serde(rename = "sleepSensor")]
    SleepSensor,
    #[serde(rename = "tribySpeaker")]
    TribySpeaker,
}

impl Category {
    /// Every category, in report order.
    pub const ALL: [Category; 9] = [
        Category::AmazonEcho,
        Category::BabyMonitor,
        Category::BelkinMotion,
        Category::BlipcareBp,
        Category::Laptop,
        Category::LifxLightbulb,
        Category::Netatmo,
        Category::SleepSensor,
        Category::TribySpeaker,
    ];

    /// Token written into labeled files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::AmazonEcho => "amazonEcho",
            Category::BabyMonitor => "babyMonitor",
            Category::BelkinMotion => "belkinMotion",
            Category::BlipcareBp => "blipcareBP",
            Category::Laptop => "laptop",
            Category::LifxLightbulb => "lifxlighbulb",
            Category::Netatmo => "netatmo",
            Category::SleepSensor => "sleepSensor",
            Category::TribySpeaker => "tribySpeaker",
        }
    }

    /// Position in [`Category::ALL`], used as the class index.
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn from_index(index: usize) -> Option<Category> {
        Category::ALL.get(index).copied()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a token names no known category.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category '{0}'")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .iter()
            .find(|c| c.as_str() == s)
            .copied()
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// One row of a capture summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowRecord {
    pub bytes_out: u64,
    pub packets: u64,
}

/// A flow record tagged with its device category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledRecord {
    pub flow: FlowRecord,
    pub category: Category,
    /// 1-based line in the source file
    pub line: u64,
}

impl LabeledRecord {
    pub fn new(bytes_out: u64, packets: u64, category: Category) -> Self {
        Self {
            flow: FlowRecord { bytes_out, packets },
            category,
            line: 0,
        }
    }

    pub fn at_line(mut self, line: u64) -> Self {
        self.line = line;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_tokens_round_trip() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>(), Ok(category));
        }
    }

    #[test]
    fn test_category_index_matches_order() {
        for (i, category) in Category::ALL.iter().enumerate() {
            assert_eq!(category.index(), i);
            assert_eq!(Category::from_index(i), Some(*category));
        }
        assert_eq!(Category::from_index(9), None);
    }

    #[test]
    fn test_unknown_category() {
        let err = "laptopX".parse::<Category>().unwrap_err();
        assert_eq!(err.to_string(), "unknown category 'laptopX'");
        // Exact match only, no substring containment
        assert!("lap".parse::<Category>().is_err());
    }

    #[test]
    fn test_serde_uses_tokens() {
        let json = serde_json::to_string(&Category::BlipcareBp).unwrap();
        assert_eq!(json, "\"blipcareBP\"");
        let back: Category = serde_json::from_str("\"lifxlighbulb\"").unwrap();
        assert_eq!(back, Category::LifxLightbulb);
    }
}
