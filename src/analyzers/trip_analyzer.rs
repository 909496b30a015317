use crate::error::{PipelineError, Result};
use crate::models::{EnrichedTrip, StatCategory, StatisticDocument};
use crate::writers::ParquetWriter;
use chrono::{DateTime, Timelike, Utc};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TripStatistics {
    pub total_revenue: f64,
    pub number_of_trips: usize,
    /// `None` for an empty batch
    pub average_fare: Option<f64>,
    pub average_distance: Option<f64>,
    pub revenue_per_rate_code: BTreeMap<String, f64>,
    pub revenue_per_payment_type: BTreeMap<String, f64>,
    pub revenue_per_passenger: BTreeMap<i64, f64>,
    pub trips_per_passenger: BTreeMap<i64, usize>,
    pub trips_by_hour: BTreeMap<u32, usize>,
    /// Pickup zone id and trip count, busiest first
    pub trips_by_pickup_location: Vec<(i64, usize)>,
}

pub struct TripAnalyzer;

impl TripAnalyzer {
    pub fn new() -> Self {
        Self
    }

    pub fn analyze_parquet(&self, path: &Path) -> Result<TripStatistics> {
        self.analyze_parquet_with_limit(path, 0)
    }

    pub fn analyze_parquet_with_limit(&self, path: &Path, limit: usize) -> Result<TripStatistics> {
        let writer = ParquetWriter::new();
        let trips = if limit == 0 {
            writer.read_all_trips(path)?
        } else {
            writer.read_sample_trips(path, limit)?
        };
        if trips.is_empty() {
            return Err(PipelineError::MissingData(format!(
                "No enriched trips in {}",
                path.display()
            )));
        }

        Ok(self.calculate_statistics(&trips))
    }

    pub fn calculate_statistics(&self, trips: &[EnrichedTrip]) -> TripStatistics {
        let mut stats = TripStatistics {
            number_of_trips: trips.len(),
            ..TripStatistics::default()
        };

        let mut distance_sum = 0.0;
        let mut by_location: HashMap<i64, usize> = HashMap::new();

        for trip in trips {
            stats.total_revenue += trip.total_amount;
            distance_sum += trip.trip_distance;

            *stats
                .revenue_per_rate_code
                .entry(trip.rate_code_name.clone())
                .or_insert(0.0) += trip.total_amount;
            *stats
                .revenue_per_payment_type
                .entry(trip.payment_type_name.clone())
                .or_insert(0.0) += trip.total_amount;
            *stats
                .revenue_per_passenger
                .entry(trip.passenger_count)
                .or_insert(0.0) += trip.total_amount;
            *stats
                .trips_per_passenger
                .entry(trip.passenger_count)
                .or_insert(0) += 1;
            *stats
                .trips_by_hour
                .entry(trip.pickup_datetime.hour())
                .or_insert(0) += 1;
            *by_location.entry(trip.pickup_location_id).or_insert(0) += 1;
        }

        if !trips.is_empty() {
            let n = trips.len() as f64;
            stats.average_fare = Some(stats.total_revenue / n);
            stats.average_distance = Some(distance_sum / n);
        }

        let mut locations: Vec<(i64, usize)> = by_location.into_iter().collect();
        locations.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        stats.trips_by_pickup_location = locations;

        stats
    }
}

impl Default for TripAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl TripStatistics {
    /// Flatten into analytics documents sharing one computation timestamp
    pub fn to_documents(&self, timestamp: DateTime<Utc>) -> Vec<StatisticDocument> {
        let scalar = |name: &str, value: f64| StatisticDocument::scalar(name, value, timestamp);
        let mut docs = vec![
            scalar("total_revenue", self.total_revenue),
            scalar("number_of_trips", self.number_of_trips as f64),
        ];

        if let Some(avg) = self.average_fare {
            docs.push(scalar("average_fare", avg));
        }
        if let Some(avg) = self.average_distance {
            docs.push(scalar("average_distance", avg));
        }

        for (name, revenue) in &self.revenue_per_rate_code {
            docs.push(scalar("revenue_per_rate_code", *revenue).with_category(StatCategory::Name(name.clone())));
        }
        for (name, revenue) in &self.revenue_per_payment_type {
            docs.push(
                scalar("revenue_per_payment_type", *revenue).with_category(StatCategory::Name(name.clone())),
            );
        }
        for (passengers, revenue) in &self.revenue_per_passenger {
            docs.push(scalar("revenue_per_passenger", *revenue).with_category(StatCategory::Code(*passengers)));
        }
        for (passengers, count) in &self.trips_per_passenger {
            docs.push(
                scalar("trips_per_passenger", *count as f64).with_category(StatCategory::Code(*passengers)),
            );
        }
        for (hour, count) in &self.trips_by_hour {
            docs.push(scalar("trips_by_hour", *count as f64).with_category(StatCategory::Code(*hour as i64)));
        }
        for (location, count) in &self.trips_by_pickup_location {
            docs.push(scalar("trips_by_pickup_location", *count as f64).with_group_by_value(*location));
        }

        docs
    }

    pub fn summary(&self) -> String {
        let average = |value: Option<f64>| match value {
            Some(v) => format!("{:.2}", v),
            None => "n/a".to_string(),
        };

        let busiest = self
            .trips_by_pickup_location
            .iter()
            .take(5)
            .map(|(zone, count)| format!("{} ({})", zone, count))
            .collect::<Vec<_>>()
            .join(", ");

        let peak_hour = self
            .trips_by_hour
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
            .map(|(hour, count)| format!("{:02}:00 ({} trips)", hour, count))
            .unwrap_or_else(|| "n/a".to_string());

        format!(
            "Trips: {}\n\
            Total Revenue: ${:.2}\n\
            Average Fare: ${}\n\
            Average Distance: {} mi\n\
            Peak Pickup Hour: {}\n\
            Busiest Pickup Zones: {}",
            self.number_of_trips,
            self.total_revenue,
            average(self.average_fare),
            average(self.average_distance),
            peak_hour,
            if busiest.is_empty() { "n/a".to_string() } else { busiest },
        )
    }
}
