use crate::models::OutputField;
use std::collections::BTreeMap;

/// Where each input trip of one enrichment run went.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichmentReport {
    pub input_records: usize,
    pub dropped_distance: usize,
    pub dropped_excluded_zone: usize,
    pub dropped_null: usize,
    /// First null output field of each null-dropped trip, by field name.
    pub null_fields: BTreeMap<&'static str, usize>,
    pub emitted_records: usize,
}

impl EnrichmentReport {
    pub fn new(input_records: usize) -> Self {
        Self {
            input_records,
            ..Self::default()
        }
    }

    pub fn record_null(&mut self, field: OutputField) {
        self.dropped_null += 1;
        *self.null_fields.entry(field.name()).or_insert(0) += 1;
    }

    pub fn dropped(&self) -> usize {
        self.dropped_distance + self.dropped_excluded_zone + self.dropped_null
    }

    /// Every input trip is either emitted or counted under exactly one drop reason
    pub fn is_balanced(&self) -> bool {
        self.dropped() + self.emitted_records == self.input_records
    }

    pub fn generate_summary(&self) -> String {
        let mut summary = String::new();
        let percent = |count: usize| {
            if self.input_records == 0 {
                0.0
            } else {
                100.0 * count as f64 / self.input_records as f64
            }
        };

        summary.push_str("=== Enrichment Report ===\n");
        summary.push_str(&format!("Input Trips: {}\n", self.input_records));
        summary.push_str(&format!(
            "Emitted Trips: {} ({:.1}%)\n",
            self.emitted_records,
            percent(self.emitted_records)
        ));
        summary.push_str(&format!(
            "Dropped (distance): {} ({:.1}%)\n",
            self.dropped_distance,
            percent(self.dropped_distance)
        ));
        summary.push_str(&format!(
            "Dropped (excluded zone): {} ({:.1}%)\n",
            self.dropped_excluded_zone,
            percent(self.dropped_excluded_zone)
        ));
        summary.push_str(&format!(
            "Dropped (null field): {} ({:.1}%)\n",
            self.dropped_null,
            percent(self.dropped_null)
        ));

        if !self.null_fields.is_empty() {
            summary.push_str("\nNull Fields:\n");
            let mut fields: Vec<_> = self.null_fields.iter().collect();
            fields.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
            for (field, count) in fields {
                summary.push_str(&format!("  {}: {}\n", field, count));
            }
        }

        summary
    }
}
