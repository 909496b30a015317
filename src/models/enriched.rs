use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::writers::mapping::{FieldType, IndexMapping};

/// The fully joined output record.
///
/// Field names on the wire keep the TLC column names so downstream queries
/// written against the raw files keep working.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedTrip {
    #[serde(rename = "tpep_pickup_datetime", with = "iso_datetime")]
    pub pickup_datetime: NaiveDateTime,

    #[serde(rename = "tpep_dropoff_datetime", with = "iso_datetime")]
    pub dropoff_datetime: NaiveDateTime,

    pub passenger_count: i64,

    pub trip_distance: f64,

    #[serde(rename = "RatecodeID")]
    pub rate_code_id: i64,

    pub rate_code_name: String,

    pub payment_type: i64,

    pub payment_type_name: String,

    #[serde(rename = "PULocationID")]
    pub pickup_location_id: i64,

    #[serde(rename = "DOLocationID")]
    pub dropoff_location_id: i64,

    #[serde(rename = "PU_centroid_lat")]
    pub pickup_centroid_lat: f64,

    #[serde(rename = "PU_centroid_long")]
    pub pickup_centroid_long: f64,

    #[serde(rename = "DO_centroid_lat")]
    pub dropoff_centroid_lat: f64,

    #[serde(rename = "DO_centroid_long")]
    pub dropoff_centroid_long: f64,

    pub total_amount: f64,
}

impl EnrichedTrip {
    /// Store mapping for the enriched trip index, one entry per output field.
    pub fn mapping() -> IndexMapping {
        IndexMapping::from_fields(
            OutputField::ALL
                .iter()
                .map(|field| (field.name(), field.field_type())),
        )
    }
}

/// The retained output columns, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputField {
    PickupDatetime,
    DropoffDatetime,
    PassengerCount,
    TripDistance,
    RateCodeId,
    RateCodeName,
    PaymentType,
    PaymentTypeName,
    PickupLocationId,
    DropoffLocationId,
    PickupCentroidLat,
    PickupCentroidLong,
    DropoffCentroidLat,
    DropoffCentroidLong,
    TotalAmount,
}

impl OutputField {
    pub const ALL: [OutputField; 15] = [
        OutputField::PickupDatetime,
        OutputField::DropoffDatetime,
        OutputField::PassengerCount,
        OutputField::TripDistance,
        OutputField::RateCodeId,
        OutputField::RateCodeName,
        OutputField::PaymentType,
        OutputField::PaymentTypeName,
        OutputField::PickupLocationId,
        OutputField::DropoffLocationId,
        OutputField::PickupCentroidLat,
        OutputField::PickupCentroidLong,
        OutputField::DropoffCentroidLat,
        OutputField::DropoffCentroidLong,
        OutputField::TotalAmount,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            OutputField::PickupDatetime => "tpep_pickup_datetime",
            OutputField::DropoffDatetime => "tpep_dropoff_datetime",
            OutputField::PassengerCount => "passenger_count",
            OutputField::TripDistance => "trip_distance",
            OutputField::RateCodeId => "RatecodeID",
            OutputField::RateCodeName => "rate_code_name",
            OutputField::PaymentType => "payment_type",
            OutputField::PaymentTypeName => "payment_type_name",
            OutputField::PickupLocationId => "PULocationID",
            OutputField::DropoffLocationId => "DOLocationID",
            OutputField::PickupCentroidLat => "PU_centroid_lat",
            OutputField::PickupCentroidLong => "PU_centroid_long",
            OutputField::DropoffCentroidLat => "DO_centroid_lat",
            OutputField::DropoffCentroidLong => "DO_centroid_long",
            OutputField::TotalAmount => "total_amount",
        }
    }

    pub fn field_type(&self) -> FieldType {
        match self {
            OutputField::PickupDatetime | OutputField::DropoffDatetime => FieldType::Date,
            OutputField::PassengerCount
            | OutputField::RateCodeId
            | OutputField::PaymentType
            | OutputField::PickupLocationId
            | OutputField::DropoffLocationId => FieldType::Integer,
            OutputField::TripDistance
            | OutputField::PickupCentroidLat
            | OutputField::PickupCentroidLong
            | OutputField::DropoffCentroidLat
            | OutputField::DropoffCentroidLong
            | OutputField::TotalAmount => FieldType::Float,
            OutputField::RateCodeName | OutputField::PaymentTypeName => FieldType::Keyword,
        }
    }
}

impl std::fmt::Display for OutputField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// ISO-8601 rendering without a zone designator, fractional seconds only
/// when present (`2019-01-01T00:46:40`, `2019-01-01T00:46:40.250`).
pub mod iso_datetime {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

    pub fn format(value: &NaiveDateTime) -> String {
        value.format(FORMAT).to_string()
    }

    pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&value.format(FORMAT))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse::<NaiveDateTime>().map_err(serde::de::Error::custom)
    }
}
