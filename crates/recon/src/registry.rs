use std::collections::HashMap;

use crate::config::CompareConfig;
use crate::index::MultiIndex;
use crate::model::{normalized_key, Address, Language, RegistryRow};

/// Registry addresses of one administrative unit, indexed for matching.
#[derive(Debug)]
pub struct RegistryIndex {
    pub index: MultiIndex<Address>,
    /// Non-ancillary entries; the denominator for match percentages.
    pub count: usize,
    pub ancillary_count: usize,
    /// Rows discarded because they carry no house number. Not an error,
    /// just unusable as a point of comparison.
    pub no_number_count: usize,
    pub official_count: usize,
    /// True when enough entries carry the official flag to trust it, which
    /// relaxes the missing-address rule for unofficial entries.
    pub validated: bool,
}

/// Fold raw registry rows into one Address per physical entry and index
/// them by (street, house number).
///
/// Rows are grouped by record id. The first row for an id becomes the
/// canonical Address with its street in the primary slot; later rows for
/// the same id carry other-language street names. When the first such row
/// arrives, the provisional street text is relocated into its language slot
/// and the primary slot cleared. Rows with unrecognized language codes are
/// skipped.
///
/// The index key is always derived from the first row's street text, so the
/// multilingual fold never moves an entry to a different key.
pub fn load_registry(rows: &[RegistryRow], config: &CompareConfig) -> RegistryIndex {
    let mut pending: Vec<(String, Address)> = Vec::new();
    let mut seen: HashMap<i64, usize> = HashMap::new();

    let mut count = 0usize;
    let mut ancillary_count = 0usize;
    let mut no_number_count = 0usize;
    let mut official_count = 0usize;

    for row in rows {
        if let Some(&pos) = seen.get(&row.record_id) {
            let addr = &mut pending[pos].1;
            // Additional language for an entry we already have.
            if let Some(street) = addr.street.take() {
                if let Some(lang) = addr.street_lang {
                    addr.street_names.set(lang, street);
                }
            }
            let lang = row
                .language
                .as_deref()
                .and_then(Language::from_registry_code);
            if let (Some(lang), Some(street)) = (lang, row.street.clone()) {
                addr.street_names.set(lang, street);
            }
            continue;
        }

        let Some(house_number) = row.house_number.clone() else {
            no_number_count += 1;
            continue;
        };

        let addr = Address {
            external_id: row.record_id,
            house_number: Some(house_number),
            street: row.street.clone(),
            street_lang: row
                .language
                .as_deref()
                .and_then(Language::from_registry_code),
            street_type: row.street_type.clone(),
            postcode: row.postcode.clone(),
            city: row.city.clone(),
            category: row.category,
            class: row.class,
            official: row.official,
            lon: row.lon,
            lat: row.lat,
            ..Address::default()
        };

        if addr.official {
            official_count += 1;
        }
        if addr.is_ancillary() {
            ancillary_count += 1;
        } else {
            count += 1;
        }

        let key = normalized_key(addr.street.as_deref(), addr.house_number.as_deref());
        seen.insert(row.record_id, pending.len());
        pending.push((key, addr));
    }

    let mut index = MultiIndex::new();
    for (key, addr) in pending {
        index.insert(key, addr);
    }

    let validated =
        count > 0 && official_count as f32 / count as f32 >= config.official_valid_limit;

    RegistryIndex {
        index,
        count,
        ancillary_count,
        no_number_count,
        official_count,
        validated,
    }
}
