use crate::config::EnrichmentConfig;
use crate::dimensions::{payment_type_name, rate_code_name};
use crate::models::{EnrichedTrip, OutputField, RawTrip, ZoneTable};
use crate::processors::enrichment_report::EnrichmentReport;
use crate::utils::progress::ProgressReporter;
use chrono::NaiveDateTime;
use tracing::info;

/// Filters raw trips, joins them to zone centroids and the dimension tables,
/// and keeps only fully populated records.
pub struct TripEnricher {
    max_trip_distance: f64,
    excluded_zone_ids: Vec<i64>,
}

/// A trip after the joins, before the null-drop. Mirrors the output columns.
#[derive(Debug, Clone, Default)]
struct JoinedTrip {
    pickup_datetime: Option<NaiveDateTime>,
    dropoff_datetime: Option<NaiveDateTime>,
    passenger_count: Option<i64>,
    trip_distance: Option<f64>,
    rate_code_id: Option<i64>,
    rate_code_name: Option<&'static str>,
    payment_type: Option<i64>,
    payment_type_name: Option<&'static str>,
    pickup_location_id: Option<i64>,
    dropoff_location_id: Option<i64>,
    pickup_centroid: Option<(f64, f64)>,
    dropoff_centroid: Option<(f64, f64)>,
    total_amount: Option<f64>,
}

impl JoinedTrip {
    /// The complete record, or the first null field in output order.
    /// Struct fields are evaluated top to bottom, matching `OutputField::ALL`.
    fn into_enriched(self) -> Result<EnrichedTrip, OutputField> {
        Ok(EnrichedTrip {
            pickup_datetime: self.pickup_datetime.ok_or(OutputField::PickupDatetime)?,
            dropoff_datetime: self.dropoff_datetime.ok_or(OutputField::DropoffDatetime)?,
            passenger_count: self.passenger_count.ok_or(OutputField::PassengerCount)?,
            trip_distance: self.trip_distance.ok_or(OutputField::TripDistance)?,
            rate_code_id: self.rate_code_id.ok_or(OutputField::RateCodeId)?,
            rate_code_name: self.rate_code_name.ok_or(OutputField::RateCodeName)?.to_string(),
            payment_type: self.payment_type.ok_or(OutputField::PaymentType)?,
            payment_type_name: self
                .payment_type_name
                .ok_or(OutputField::PaymentTypeName)?
                .to_string(),
            pickup_location_id: self.pickup_location_id.ok_or(OutputField::PickupLocationId)?,
            dropoff_location_id: self.dropoff_location_id.ok_or(OutputField::DropoffLocationId)?,
            pickup_centroid_lat: self
                .pickup_centroid
                .map(|(lat, _)| lat)
                .ok_or(OutputField::PickupCentroidLat)?,
            pickup_centroid_long: self
                .pickup_centroid
                .map(|(_, long)| long)
                .ok_or(OutputField::PickupCentroidLong)?,
            dropoff_centroid_lat: self
                .dropoff_centroid
                .map(|(lat, _)| lat)
                .ok_or(OutputField::DropoffCentroidLat)?,
            dropoff_centroid_long: self
                .dropoff_centroid
                .map(|(_, long)| long)
                .ok_or(OutputField::DropoffCentroidLong)?,
            total_amount: self.total_amount.ok_or(OutputField::TotalAmount)?,
        })
    }
}

impl TripEnricher {
    pub fn new(config: &EnrichmentConfig) -> Self {
        Self {
            max_trip_distance: config.max_trip_distance,
            excluded_zone_ids: config.excluded_zone_ids.clone(),
        }
    }

    pub fn with_max_trip_distance(mut self, max_trip_distance: f64) -> Self {
        self.max_trip_distance = max_trip_distance;
        self
    }

    pub fn with_excluded_zone_ids(mut self, zone_ids: Vec<i64>) -> Self {
        self.excluded_zone_ids = zone_ids;
        self
    }

    /// Run filter, joins, projection and null-drop over one batch
    pub fn enrich(
        &self,
        trips: &[RawTrip],
        zones: &ZoneTable,
        progress: Option<&ProgressReporter>,
    ) -> (Vec<EnrichedTrip>, EnrichmentReport) {
        let mut report = EnrichmentReport::new(trips.len());
        let mut enriched = Vec::with_capacity(trips.len());

        for (i, trip) in trips.iter().enumerate() {
            if let Some(p) = progress {
                if i % 10_000 == 0 {
                    p.set_message(&format!("Enriching trip {}/{}", i, trips.len()));
                }
            }

            if !self.within_distance(trip) {
                report.dropped_distance += 1;
                continue;
            }
            if trip.touches_zone(&self.excluded_zone_ids) {
                report.dropped_excluded_zone += 1;
                continue;
            }

            match Self::join(trip, zones).into_enriched() {
                Ok(record) => enriched.push(record),
                Err(field) => report.record_null(field),
            }
        }

        report.emitted_records = enriched.len();

        info!(
            input = report.input_records,
            emitted = report.emitted_records,
            dropped_distance = report.dropped_distance,
            dropped_excluded_zone = report.dropped_excluded_zone,
            dropped_null = report.dropped_null,
            "Enriched trip batch"
        );

        (enriched, report)
    }

    /// A missing distance never compares as within range
    fn within_distance(&self, trip: &RawTrip) -> bool {
        matches!(trip.trip_distance, Some(d) if d <= self.max_trip_distance)
    }

    fn join(trip: &RawTrip, zones: &ZoneTable) -> JoinedTrip {
        JoinedTrip {
            pickup_datetime: trip.pickup_datetime,
            dropoff_datetime: trip.dropoff_datetime,
            passenger_count: trip.passenger_count,
            trip_distance: trip.trip_distance,
            rate_code_id: trip.rate_code_id,
            rate_code_name: trip.rate_code_id.and_then(rate_code_name),
            payment_type: trip.payment_type,
            payment_type_name: trip.payment_type.and_then(payment_type_name),
            pickup_location_id: trip.pickup_location_id,
            dropoff_location_id: trip.dropoff_location_id,
            pickup_centroid: trip.pickup_location_id.and_then(|id| zones.centroid(id)),
            dropoff_centroid: trip.dropoff_location_id.and_then(|id| zones.centroid(id)),
            total_amount: trip.total_amount,
        }
    }
}

impl Default for TripEnricher {
    fn default() -> Self {
        Self::new(&EnrichmentConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Zone, ZoneAttributes};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn zone(id: i64, lat: f64, long: f64) -> Zone {
        Zone::from_attributes(
            ZoneAttributes {
                location_id: id,
                borough: "Queens".to_string(),
                zone: format!("Zone {}", id),
                service_zone: "Boro Zone".to_string(),
            },
            lat,
            long,
        )
    }

    fn zones() -> ZoneTable {
        ZoneTable::new(vec![
            zone(1, 40.69, -74.17),
            zone(2, 40.61, -73.82),
            zone(264, 0.0, 0.0),
        ])
    }

    fn trip(distance: f64, pickup: i64, dropoff: i64) -> RawTrip {
        let day = NaiveDate::from_ymd_opt(2019, 1, 1).unwrap();
        RawTrip::builder()
            .times(day.and_hms_opt(8, 0, 0).unwrap(), day.and_hms_opt(8, 20, 0).unwrap())
            .passenger_count(1)
            .trip_distance(distance)
            .locations(pickup, dropoff)
            .rate_code_id(1)
            .payment_type(1)
            .total_amount(25.3)
            .build()
    }

    #[test]
    fn test_three_trip_scenario() {
        let trips = vec![trip(150.0, 1, 2), trip(3.0, 264, 2), trip(3.0, 1, 2)];
        let (enriched, report) = TripEnricher::default().enrich(&trips, &zones(), None);

        assert_eq!(enriched.len(), 1);
        let record = &enriched[0];
        assert_eq!(record.rate_code_name, "Standard rate");
        assert_eq!(record.payment_type_name, "Credit card");
        assert_eq!(record.pickup_centroid_lat, 40.69);
        assert_eq!(record.dropoff_centroid_long, -73.82);

        assert_eq!(report.dropped_distance, 1);
        assert_eq!(report.dropped_excluded_zone, 1);
        assert_eq!(report.dropped_null, 0);
        assert!(report.is_balanced());
    }

    #[test]
    fn test_distance_filter_is_inclusive() {
        let trips = vec![trip(100.0, 1, 2), trip(100.01, 1, 2)];
        let (enriched, report) = TripEnricher::default().enrich(&trips, &zones(), None);

        assert_eq!(enriched.len(), 1);
        assert_eq!(enriched[0].trip_distance, 100.0);
        assert_eq!(report.dropped_distance, 1);
    }

    #[test]
    fn test_missing_distance_is_filtered() {
        let mut raw = trip(1.0, 1, 2);
        raw.trip_distance = None;
        let (enriched, report) = TripEnricher::default().enrich(&[raw], &zones(), None);

        assert!(enriched.is_empty());
        assert_eq!(report.dropped_distance, 1);
    }

    #[test]
    fn test_excluded_dropoff_zone() {
        let trips = vec![trip(1.0, 1, 265), trip(1.0, 2, 264)];
        let (enriched, report) = TripEnricher::default().enrich(&trips, &zones(), None);

        assert!(enriched.is_empty());
        assert_eq!(report.dropped_excluded_zone, 2);
    }

    #[test]
    fn test_configured_filters() {
        let enricher = TripEnricher::default()
            .with_max_trip_distance(5.0)
            .with_excluded_zone_ids(vec![2]);
        let trips = vec![trip(6.0, 1, 1), trip(1.0, 1, 2), trip(1.0, 264, 1)];
        let (enriched, report) = enricher.enrich(&trips, &zones(), None);

        assert_eq!(enriched.len(), 1);
        assert_eq!(enriched[0].pickup_location_id, 264);
        assert_eq!(report.dropped_distance, 1);
        assert_eq!(report.dropped_excluded_zone, 1);
    }

    #[test]
    fn test_unknown_codes_and_zones_are_null_dropped() {
        let mut bad_rate = trip(1.0, 1, 2);
        bad_rate.rate_code_id = Some(7);
        let mut bad_payment = trip(1.0, 1, 2);
        bad_payment.payment_type = Some(0);
        let unknown_zone = trip(1.0, 1, 99);
        let mut no_passengers = trip(1.0, 1, 2);
        no_passengers.passenger_count = None;

        let trips = vec![bad_rate, bad_payment, unknown_zone, no_passengers];
        let (enriched, report) = TripEnricher::default().enrich(&trips, &zones(), None);

        assert!(enriched.is_empty());
        assert_eq!(report.dropped_null, 4);
        assert_eq!(report.null_fields.get("rate_code_name"), Some(&1));
        assert_eq!(report.null_fields.get("payment_type_name"), Some(&1));
        assert_eq!(report.null_fields.get("DO_centroid_lat"), Some(&1));
        assert_eq!(report.null_fields.get("passenger_count"), Some(&1));
    }

    #[test]
    fn test_undefined_rate_code_is_kept() {
        let mut raw = trip(1.0, 1, 2);
        raw.rate_code_id = Some(99);
        let (enriched, _) = TripEnricher::default().enrich(&[raw], &zones(), None);

        assert_eq!(enriched[0].rate_code_name, "Undefined");
    }

    #[test]
    fn test_output_never_longer_than_input() {
        let trips: Vec<RawTrip> = (0..50)
            .map(|i| trip(i as f64 * 3.0, 1 + (i % 3), 2))
            .collect();
        let (enriched, report) = TripEnricher::default().enrich(&trips, &zones(), None);

        assert!(enriched.len() <= trips.len());
        assert!(report.is_balanced());
        assert!(enriched.iter().all(|t| t.trip_distance <= 100.0));
    }
}
