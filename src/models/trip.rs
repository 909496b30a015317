use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One taxi ride as read from a TLC trip file.
///
/// Every column is nullable in the source data, so every field is optional
/// here. Nothing is defaulted at read time; the enricher decides what to drop.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTrip {
    pub pickup_datetime: Option<NaiveDateTime>,
    pub dropoff_datetime: Option<NaiveDateTime>,
    pub passenger_count: Option<i64>,
    pub trip_distance: Option<f64>,
    pub pickup_location_id: Option<i64>,
    pub dropoff_location_id: Option<i64>,
    pub rate_code_id: Option<i64>,
    pub payment_type: Option<i64>,
    pub total_amount: Option<f64>,
}

impl RawTrip {
    pub fn builder() -> RawTripBuilder {
        RawTripBuilder::new()
    }

    pub fn touches_zone(&self, zone_ids: &[i64]) -> bool {
        [self.pickup_location_id, self.dropoff_location_id]
            .into_iter()
            .flatten()
            .any(|id| zone_ids.contains(&id))
    }
}

/// Fluent construction of [`RawTrip`] values, mostly for fixtures.
#[derive(Debug, Default)]
pub struct RawTripBuilder {
    trip: RawTrip,
}

impl RawTripBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn times(mut self, pickup: NaiveDateTime, dropoff: NaiveDateTime) -> Self {
        self.trip.pickup_datetime = Some(pickup);
        self.trip.dropoff_datetime = Some(dropoff);
        self
    }

    pub fn passenger_count(mut self, count: i64) -> Self {
        self.trip.passenger_count = Some(count);
        self
    }

    pub fn trip_distance(mut self, distance: f64) -> Self {
        self.trip.trip_distance = Some(distance);
        self
    }

    pub fn locations(mut self, pickup: i64, dropoff: i64) -> Self {
        self.trip.pickup_location_id = Some(pickup);
        self.trip.dropoff_location_id = Some(dropoff);
        self
    }

    pub fn rate_code_id(mut self, code: i64) -> Self {
        self.trip.rate_code_id = Some(code);
        self
    }

    pub fn payment_type(mut self, code: i64) -> Self {
        self.trip.payment_type = Some(code);
        self
    }

    pub fn total_amount(mut self, amount: f64) -> Self {
        self.trip.total_amount = Some(amount);
        self
    }

    pub fn build(self) -> RawTrip {
        self.trip
    }
}
