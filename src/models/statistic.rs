use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::writers::mapping::{FieldType, IndexMapping};

/// Grouping key of a grouped statistic: a dimension name or a numeric code.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatCategory {
    Code(i64),
    Name(String),
}

impl fmt::Display for StatCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatCategory::Code(code) => write!(f, "{}", code),
            StatCategory::Name(name) => write!(f, "{}", name),
        }
    }
}

/// One row of the analytics index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticDocument {
    pub stat_name: String,
    pub value: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<StatCategory>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by_value: Option<i64>,

    pub timestamp: DateTime<Utc>,
}

impl StatisticDocument {
    pub fn scalar(stat_name: &str, value: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            stat_name: stat_name.to_string(),
            value,
            category: None,
            group_by_value: None,
            timestamp,
        }
    }

    pub fn with_category(mut self, category: StatCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_group_by_value(mut self, value: i64) -> Self {
        self.group_by_value = Some(value);
        self
    }

    /// `category` mixes names and codes, so it is a keyword.
    pub fn mapping() -> IndexMapping {
        IndexMapping::from_fields([
            ("stat_name", FieldType::Keyword),
            ("value", FieldType::Float),
            ("category", FieldType::Keyword),
            ("group_by_value", FieldType::Integer),
            ("timestamp", FieldType::Date),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_serialized_shape() {
        let at = Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap();
        let doc = StatisticDocument::scalar("trips_by_hour", 42.0, at)
            .with_category(StatCategory::Code(8));

        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["category"], json!(8));
        assert!(value.get("group_by_value").is_none());
        assert!(StatisticDocument::mapping().check_document(&value).is_ok());

        let named = StatisticDocument::scalar("revenue_per_payment_type", 1.0, at)
            .with_category(StatCategory::Name("Cash".to_string()));
        assert_eq!(serde_json::to_value(&named).unwrap()["category"], json!("Cash"));
    }
}
