use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Store field types. Strings are always `keyword`: aggregations group on
/// exact values and never need analyzed text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Float,
    Integer,
    Date,
    Keyword,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Float => "float",
            FieldType::Integer => "integer",
            FieldType::Date => "date",
            FieldType::Keyword => "keyword",
        }
    }

    /// Whether a JSON value can be indexed under this type.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldType::Float => value.is_number(),
            FieldType::Integer => value.is_i64() || value.is_u64(),
            FieldType::Date => value
                .as_str()
                .map(|s| {
                    s.parse::<chrono::NaiveDateTime>().is_ok()
                        || chrono::DateTime::parse_from_rfc3339(s).is_ok()
                })
                .unwrap_or(false),
            FieldType::Keyword => value.is_string() || value.is_number(),
        }
    }
}

/// Explicit per-field type declaration for an index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexMapping {
    properties: BTreeMap<String, FieldType>,
}

impl IndexMapping {
    pub fn from_fields<'a>(fields: impl IntoIterator<Item = (&'a str, FieldType)>) -> Self {
        Self {
            properties: fields
                .into_iter()
                .map(|(name, field_type)| (name.to_string(), field_type))
                .collect(),
        }
    }

    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        self.properties.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Index creation body: `{"mappings": {"properties": {...}}}`.
    pub fn to_create_body(&self) -> Value {
        let properties: serde_json::Map<String, Value> = self
            .properties
            .iter()
            .map(|(name, field_type)| (name.clone(), json!({ "type": field_type.as_str() })))
            .collect();

        json!({ "mappings": { "properties": properties } })
    }

    /// Checks a document against the declared types. Unmapped fields and
    /// nulls are rejected; the first offending field is reported.
    pub fn check_document(&self, document: &Value) -> std::result::Result<(), String> {
        let object = document
            .as_object()
            .ok_or_else(|| "document is not a JSON object".to_string())?;

        for (name, value) in object {
            match self.properties.get(name) {
                None => return Err(format!("field [{}] is not mapped", name)),
                Some(field_type) if !field_type.accepts(value) => {
                    return Err(format!(
                        "failed to parse field [{}] of type [{}]: {}",
                        name,
                        field_type.as_str(),
                        value
                    ))
                }
                Some(_) => {}
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn mapping() -> IndexMapping {
        IndexMapping::from_fields([
            ("total_amount", FieldType::Float),
            ("PULocationID", FieldType::Integer),
            ("tpep_pickup_datetime", FieldType::Date),
            ("rate_code_name", FieldType::Keyword),
        ])
    }

    #[test]
    fn test_create_body() {
        let body = mapping().to_create_body();
        assert_eq!(
            body,
            json!({
                "mappings": {
                    "properties": {
                        "PULocationID": { "type": "integer" },
                        "rate_code_name": { "type": "keyword" },
                        "total_amount": { "type": "float" },
                        "tpep_pickup_datetime": { "type": "date" }
                    }
                }
            })
        );
    }

    #[test]
    fn test_check_document() {
        let mapping = mapping();
        let good = json!({
            "total_amount": 12,
            "PULocationID": 4,
            "tpep_pickup_datetime": "2019-01-01T00:46:40",
            "rate_code_name": "JFK"
        });
        assert!(mapping.check_document(&good).is_ok());

        let bad_date = json!({ "tpep_pickup_datetime": "yesterday" });
        assert!(mapping.check_document(&bad_date).is_err());

        let fractional_id = json!({ "PULocationID": 4.5 });
        assert!(mapping.check_document(&fractional_id).is_err());

        let unmapped = json!({ "tip_amount": 1.0 });
        assert!(mapping.check_document(&unmapped).is_err());

        let null_value = json!({ "rate_code_name": null });
        assert!(mapping.check_document(&null_value).is_err());
    }
}
