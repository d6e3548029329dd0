use std::collections::BTreeMap;

use serde::Serialize;

use crate::matcher::MatchOutcome;
use crate::registry::RegistryIndex;
use crate::survey::SurveyIndex;

/// Counter block reported at unit, region and run level.
#[derive(Debug, Default, Clone, Serialize)]
pub struct Stats {
    /// Registry entries considered for matching, ancillaries excluded.
    pub registry: usize,
    pub ancillary: usize,
    pub duplicates: usize,
    pub buildings: usize,
    pub points: usize,
    pub matched: usize,
    pub matched_ancillary: usize,
    pub missing: usize,
    pub postcode: usize,
    pub city: usize,
    pub distance: usize,
    pub place: usize,
    pub no_street: usize,
    pub not_official: usize,
    pub non_registry: usize,
    pub warnings: usize,
}

impl Stats {
    pub fn from_outcome(
        registry: &RegistryIndex,
        survey: &SurveyIndex,
        outcome: &MatchOutcome,
    ) -> Self {
        Stats {
            registry: registry.count,
            ancillary: registry.ancillary_count,
            duplicates: outcome.duplicates,
            buildings: survey.building_count,
            points: survey.point_count,
            matched: outcome.matched.len(),
            matched_ancillary: outcome.matched_ancillary.len(),
            missing: outcome.missing.len(),
            postcode: outcome.postcode_mismatches,
            city: outcome.city_mismatches,
            distance: outcome.distance_mismatches,
            place: outcome.place_mismatches,
            no_street: outcome.no_street,
            not_official: outcome.not_official,
            non_registry: outcome.non_registry,
            warnings: outcome.warnings.len(),
        }
    }

    /// Fold another counter block into this one.
    pub fn absorb(&mut self, other: &Stats) {
        self.registry += other.registry;
        self.ancillary += other.ancillary;
        self.duplicates += other.duplicates;
        self.buildings += other.buildings;
        self.points += other.points;
        self.matched += other.matched;
        self.matched_ancillary += other.matched_ancillary;
        self.missing += other.missing;
        self.postcode += other.postcode;
        self.city += other.city;
        self.distance += other.distance;
        self.place += other.place;
        self.no_street += other.no_street;
        self.not_official += other.not_official;
        self.non_registry += other.non_registry;
        self.warnings += other.warnings;
    }

    pub fn survey_total(&self) -> usize {
        self.buildings + self.points
    }

    /// Matched share of the deduplicated registry, in whole percent.
    /// `None` when the unit has no registry entries to match against.
    pub fn match_percentage(&self) -> Option<u32> {
        let denom = self.registry.saturating_sub(self.duplicates);
        if denom == 0 {
            return None;
        }
        Some((self.matched * 100 / denom) as u32)
    }
}

/// Accumulates stats at the run and region level while units stream through.
#[derive(Debug, Default)]
pub struct StatsTracker {
    pub global: Stats,
    pub regions: BTreeMap<String, Stats>,
}

impl StatsTracker {
    pub fn record(&mut self, region: &str, stats: &Stats) {
        self.global.absorb(stats);
        self.regions
            .entry(region.to_string())
            .or_default()
            .absorb(stats);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absorb_sums_every_counter() {
        let a = Stats {
            registry: 10,
            ancillary: 1,
            duplicates: 2,
            buildings: 5,
            points: 3,
            matched: 7,
            matched_ancillary: 1,
            missing: 1,
            postcode: 1,
            city: 2,
            distance: 3,
            place: 4,
            no_street: 5,
            not_official: 6,
            non_registry: 7,
            warnings: 8,
        };
        let mut total = Stats::default();
        total.absorb(&a);
        total.absorb(&a);
        assert_eq!(total.registry, 20);
        assert_eq!(total.survey_total(), 16);
        assert_eq!(total.warnings, 16);
    }

    #[test]
    fn match_percentage_excludes_duplicates() {
        let stats = Stats {
            registry: 12,
            duplicates: 2,
            matched: 5,
            ..Stats::default()
        };
        assert_eq!(stats.match_percentage(), Some(50));
    }

    #[test]
    fn match_percentage_none_for_empty_unit() {
        assert_eq!(Stats::default().match_percentage(), None);
        let all_dups = Stats {
            registry: 3,
            duplicates: 3,
            ..Stats::default()
        };
        assert_eq!(all_dups.match_percentage(), None);
    }

    #[test]
    fn tracker_groups_by_region() {
        let mut tracker = StatsTracker::default();
        let unit = Stats {
            registry: 4,
            matched: 2,
            ..Stats::default()
        };
        tracker.record("ZH", &unit);
        tracker.record("ZH", &unit);
        tracker.record("BE", &unit);

        assert_eq!(tracker.global.registry, 12);
        assert_eq!(tracker.regions["ZH"].matched, 4);
        assert_eq!(tracker.regions["BE"].matched, 2);
        assert_eq!(tracker.regions.len(), 2);
    }
}
