pub mod enrichment_report;
pub mod trip_enricher;
pub mod zone_resolver;

pub use enrichment_report::EnrichmentReport;
pub use trip_enricher::TripEnricher;
pub use zone_resolver::ZoneResolver;
