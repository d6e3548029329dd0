use std::collections::BTreeMap;

use crate::config::CompareConfig;
use crate::index::MultiIndex;
use crate::model::{distance_between, normalized_key, Address, Language, Warning};
use crate::registry::RegistryIndex;
use crate::survey::SurveyIndex;

/// Everything one reconciliation pass produces for a unit.
#[derive(Debug, Default)]
pub struct MatchOutcome {
    pub matched: Vec<Address>,
    pub matched_ancillary: Vec<Address>,
    /// Registry entries with no crowd-sourced counterpart.
    pub missing: Vec<Address>,
    pub warnings: Vec<Warning>,
    pub duplicates: usize,
    pub postcode_mismatches: usize,
    pub city_mismatches: usize,
    pub distance_mismatches: usize,
    pub place_mismatches: usize,
    pub no_street: usize,
    pub not_official: usize,
    pub non_registry: usize,
}

/// Reconcile a unit's registry index against its crowd-sourced index.
///
/// Consumes entries from both indices as it goes: registry entries end up
/// matched, missing or removed as duplicates; crowd-sourced entries end up
/// consumed as candidates or flagged as leftovers.
pub fn reconcile(
    registry: &mut RegistryIndex,
    survey: &mut SurveyIndex,
    config: &CompareConfig,
) -> MatchOutcome {
    let mut outcome = MatchOutcome::default();

    outcome.duplicates = eliminate_duplicates(&mut registry.index);

    let keys: Vec<String> = registry.index.keys().cloned().collect();
    for key in keys {
        for gwr in registry.index.get(&key).to_vec() {
            match_one(registry, survey, config, &key, &gwr, &mut outcome);
        }
    }

    // Whatever survived in the crowd-sourced index was never a candidate
    // for any registry entry.
    for leftover in survey.index.values().cloned().collect::<Vec<_>>() {
        let mut w = Warning::for_address(&leftover);
        if leftover.street.is_none() && leftover.place.is_none() {
            w.no_street = true;
            outcome.no_street += 1;
        } else {
            w.non_registry = true;
            outcome.non_registry += 1;
        }
        outcome.warnings.push(w);
    }

    outcome
}

/// Remove same-key registry entries sharing a postcode, keeping one per
/// postcode group. Survivor is the lowest external id, so the result does
/// not depend on input order. Running this twice changes nothing.
pub fn eliminate_duplicates(index: &mut MultiIndex<Address>) -> usize {
    let mut removed = 0;
    let keys: Vec<String> = index.keys().cloned().collect();
    for key in keys {
        let bucket = index.get(&key);
        if bucket.len() < 2 {
            continue;
        }
        let mut by_postcode: BTreeMap<String, Vec<Address>> = BTreeMap::new();
        for addr in bucket {
            by_postcode
                .entry(addr.postcode.clone().unwrap_or_default())
                .or_default()
                .push(addr.clone());
        }
        for (_, mut group) in by_postcode {
            if group.len() < 2 {
                continue;
            }
            group.sort_by_key(|a| a.external_id);
            for dup in &group[1..] {
                if index.remove_value(&key, dup) {
                    removed += 1;
                }
            }
        }
    }
    removed
}

fn match_one(
    registry: &mut RegistryIndex,
    survey: &mut SurveyIndex,
    config: &CompareConfig,
    key: &str,
    gwr: &Address,
    outcome: &mut MatchOutcome,
) {
    // Resolve the key to look candidates up under. Entries that went
    // through the multilingual fold have no primary street; probe the
    // language slots in fixed order and take the first with candidates.
    let lookup_key = if gwr.street.is_some() {
        Some(key.to_string())
    } else {
        Language::ALL.iter().find_map(|&lang| {
            let street = gwr.street_names.get(lang)?;
            let k = normalized_key(Some(street), gwr.house_number.as_deref());
            (!survey.index.get(&k).is_empty()).then_some(k)
        })
    };

    let ancillary = gwr.is_ancillary();

    let primary = lookup_key.as_deref().and_then(|k| {
        let mut best: Option<(f64, &Address)> = None;
        for candidate in survey.index.get(k) {
            let d = distance_between(gwr, candidate);
            if !admissible(gwr, candidate, d, config) {
                continue;
            }
            if best.as_ref().map_or(true, |(bd, _)| d < *bd) {
                best = Some((d, candidate));
            }
        }
        best.map(|(_, a)| a.clone())
    });

    let Some(primary) = primary else {
        // Units without a trustworthy official flag report every
        // non-ancillary entry; validated units only the official ones.
        if !ancillary && (gwr.official || !registry.validated) {
            outcome.missing.push(gwr.clone());
        }
        return;
    };
    let lookup_key = lookup_key.unwrap_or_default();

    // Warn about every admissible candidate under the key, not just the
    // primary match, and consume them all.
    for candidate in survey.index.get(&lookup_key).to_vec() {
        let postcode_differs = !postcode_matches(gwr, &candidate);
        let d = distance_between(gwr, &candidate);
        if postcode_differs && d > config.matching_distance {
            continue;
        }

        let mut w = Warning::for_address(&candidate);
        if postcode_differs {
            w.postcode = true;
            w.osm_postcode = candidate.postcode.clone();
            w.gwr_postcode = gwr.postcode.clone();
            outcome.postcode_mismatches += 1;
        }
        if !city_matches(gwr, &candidate) {
            w.city = true;
            w.osm_city = candidate.city.clone();
            w.gwr_city = gwr.city.clone();
            outcome.city_mismatches += 1;
        }
        if d > config.matching_distance {
            w.distance = true;
            outcome.distance_mismatches += 1;
        }
        if !gwr.street_based() && candidate.place.is_none() {
            w.place = true;
            outcome.place_mismatches += 1;
        }
        w.not_official = !gwr.official;
        if w.not_official && !ancillary {
            outcome.not_official += 1;
        }
        if w.has_warning() {
            outcome.warnings.push(w);
        }
        survey.index.remove_value(&lookup_key, &candidate);
    }

    if ancillary {
        outcome.matched_ancillary.push(primary);
    } else {
        outcome.matched.push(primary);
    }
    registry.index.remove_value(key, gwr);
}

fn admissible(gwr: &Address, candidate: &Address, distance: f64, config: &CompareConfig) -> bool {
    postcode_matches(gwr, candidate) || distance <= config.matching_distance
}

/// Absent postcodes never match anything.
fn postcode_matches(a: &Address, b: &Address) -> bool {
    matches!((&a.postcode, &b.postcode), (Some(x), Some(y)) if x == y)
}

fn city_matches(a: &Address, b: &Address) -> bool {
    matches!((&a.city, &b.city), (Some(x), Some(y)) if x == y)
}
