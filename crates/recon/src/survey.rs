use crate::index::MultiIndex;
use crate::model::{normalized_key, Address, GeometrySource, Language, SurveyRow};
use crate::registry::RegistryIndex;

/// Crowd-sourced addresses of one administrative unit, indexed by
/// (street-or-place, house-number-or-house-name).
#[derive(Debug, Default)]
pub struct SurveyIndex {
    pub index: MultiIndex<Address>,
    pub building_count: usize,
    pub point_count: usize,
}

impl SurveyIndex {
    pub fn new() -> Self {
        SurveyIndex::default()
    }

    /// Add one stream of raw rows. Returns the raw row count for the stream.
    ///
    /// Multi-valued house numbers ("5;7" or "5, 7") fan out into one Address
    /// per number with whitespace stripped. Rows without a house number are
    /// keyed by house name instead. Name variants are disambiguated against
    /// the registry index: the first per-language variant that forms a key
    /// the registry knows supersedes the primary name.
    pub fn add_rows(
        &mut self,
        source: GeometrySource,
        rows: &[SurveyRow],
        registry: &RegistryIndex,
    ) -> usize {
        let mut count = 0;
        for row in rows {
            count += 1;
            match row.house_number.as_deref() {
                None => {
                    let addr = build_address(source, row, None, registry);
                    let key = normalized_key(
                        addr.street.as_deref().or(addr.place.as_deref()),
                        addr.house_name.as_deref(),
                    );
                    self.index.insert(key, addr);
                }
                Some(numbers) => {
                    for number in numbers.split([';', ',']) {
                        let number: String =
                            number.chars().filter(|c| !c.is_whitespace()).collect();
                        // Trailing separators ("5;") leave empty segments.
                        if number.is_empty() {
                            continue;
                        }
                        let addr = build_address(source, row, Some(number), registry);
                        let key = normalized_key(
                            addr.street.as_deref().or(addr.place.as_deref()),
                            addr.house_number.as_deref(),
                        );
                        self.index.insert(key, addr);
                    }
                }
            }
        }
        match source {
            GeometrySource::Polygon => self.building_count += count,
            GeometrySource::Point => self.point_count += count,
        }
        count
    }
}

fn build_address(
    source: GeometrySource,
    row: &SurveyRow,
    house_number: Option<String>,
    registry: &RegistryIndex,
) -> Address {
    let mut addr = Address {
        geometry_source: Some(source),
        external_id: row.source_id,
        house_number,
        house_name: row.house_name.clone(),
        street: row.street.clone(),
        place: row.place.clone(),
        postcode: row.postcode.clone(),
        city: row.city.clone(),
        full: row.full.clone(),
        lon: row.lon,
        lat: row.lat,
        ..Address::default()
    };

    // Multilingual street or place names: prefer the variant the registry
    // actually indexes under, e.g. in bilingual municipalities.
    for lang in Language::ALL {
        let Some(variant) = row.street_names.get(lang) else {
            continue;
        };
        let key = normalized_key(Some(variant), addr.house_number.as_deref());
        if registry.index.contains_key(&key) {
            addr.street = Some(variant.to_string());
            addr.street_lang = Some(lang);
            break;
        }
    }
    for lang in Language::ALL {
        let Some(variant) = row.place_names.get(lang) else {
            continue;
        };
        let key = normalized_key(Some(variant), addr.house_number.as_deref());
        if registry.index.contains_key(&key) {
            addr.place = Some(variant.to_string());
            addr.street_lang = Some(lang);
            break;
        }
    }

    addr
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompareConfig;
    use crate::model::{LocalizedNames, RegistryRow};
    use crate::registry::load_registry;

    fn empty_registry() -> RegistryIndex {
        load_registry(&[], &CompareConfig::default())
    }

    fn registry_with(street: &str, number: &str) -> RegistryIndex {
        let row = RegistryRow {
            record_id: 1,
            region: "BE".into(),
            municipality_ref: "371".into(),
            municipality_name: "Biel/Bienne".into(),
            street: Some(street.into()),
            house_number: Some(number.into()),
            postcode: Some("2502".into()),
            postcode_ext: None,
            city: Some("Biel/Bienne".into()),
            language: Some("9901".into()),
            street_type: Some("Street".into()),
            category: 1020,
            class: 1110,
            official: true,
            lon: 7.24,
            lat: 47.13,
        };
        load_registry(&[row], &CompareConfig::default())
    }

    fn survey_row(number: Option<&str>, street: Option<&str>) -> SurveyRow {
        SurveyRow {
            source_id: 100,
            house_number: number.map(Into::into),
            street: street.map(Into::into),
            postcode: Some("2502".into()),
            city: Some("Biel/Bienne".into()),
            lon: 7.24,
            lat: 47.13,
            ..SurveyRow::default()
        }
    }

    #[test]
    fn compound_house_numbers_fan_out() {
        let registry = empty_registry();
        let mut survey = SurveyIndex::new();
        let count = survey.add_rows(
            GeometrySource::Polygon,
            &[survey_row(Some("5; 7,9"), Some("Nidaugasse"))],
            &registry,
        );

        assert_eq!(count, 1, "raw rows are counted once");
        assert_eq!(survey.building_count, 1);
        assert_eq!(survey.index.len(), 3);
        assert_eq!(survey.index.get("nidaugasse 5").len(), 1);
        assert_eq!(survey.index.get("nidaugasse 7").len(), 1);
        assert_eq!(survey.index.get("nidaugasse 9").len(), 1);
    }

    #[test]
    fn trailing_separator_leaves_no_empty_number() {
        let registry = empty_registry();
        let mut survey = SurveyIndex::new();
        survey.add_rows(
            GeometrySource::Polygon,
            &[survey_row(Some("5;"), Some("Nidaugasse"))],
            &registry,
        );

        assert_eq!(survey.index.len(), 1);
        assert_eq!(survey.index.get("nidaugasse 5").len(), 1);
        assert!(survey.index.get("nidaugasse ").is_empty());
    }

    #[test]
    fn house_name_used_when_number_absent() {
        let registry = empty_registry();
        let mut survey = SurveyIndex::new();
        let mut row = survey_row(None, Some("Nidaugasse"));
        row.house_name = Some("Altes Zeughaus".into());
        survey.add_rows(GeometrySource::Point, &[row], &registry);

        assert_eq!(survey.point_count, 1);
        assert_eq!(survey.index.get("nidaugasse altes zeughaus").len(), 1);
    }

    #[test]
    fn street_variant_matching_registry_wins() {
        // Registry indexes the French name; the survey's primary name is
        // German, with the French variant in its language slot.
        let registry = registry_with("Rue de Nidau", "5");
        let mut row = survey_row(Some("5"), Some("Nidaugasse"));
        row.street_names = LocalizedNames {
            fr: Some("Rue de Nidau".into()),
            ..LocalizedNames::default()
        };

        let mut survey = SurveyIndex::new();
        survey.add_rows(GeometrySource::Polygon, &[row], &registry);

        let bucket = survey.index.get("rue de nidau 5");
        assert_eq!(bucket.len(), 1);
        assert_eq!(bucket[0].street.as_deref(), Some("Rue de Nidau"));
        assert_eq!(bucket[0].street_lang, Some(Language::Fr));
        assert!(survey.index.get("nidaugasse 5").is_empty());
    }

    #[test]
    fn primary_street_kept_when_no_variant_matches() {
        let registry = registry_with("Rue de Nidau", "5");
        let mut row = survey_row(Some("7"), Some("Nidaugasse"));
        row.street_names = LocalizedNames {
            fr: Some("Rue de Nidau".into()),
            ..LocalizedNames::default()
        };

        let mut survey = SurveyIndex::new();
        survey.add_rows(GeometrySource::Polygon, &[row], &registry);

        // Number 7 does not exist in the registry, so the variant loses.
        let bucket = survey.index.get("nidaugasse 7");
        assert_eq!(bucket.len(), 1);
        assert_eq!(bucket[0].street_lang, None);
    }

    #[test]
    fn place_variant_disambiguated_independently() {
        let registry = registry_with("Petinesca", "2");
        let mut row = survey_row(Some("2"), None);
        row.place = Some("Studen".into());
        row.place_names = LocalizedNames {
            de: Some("Petinesca".into()),
            ..LocalizedNames::default()
        };

        let mut survey = SurveyIndex::new();
        survey.add_rows(GeometrySource::Point, &[row], &registry);

        let bucket = survey.index.get("petinesca 2");
        assert_eq!(bucket.len(), 1);
        assert_eq!(bucket[0].place.as_deref(), Some("Petinesca"));
        assert_eq!(bucket[0].street_lang, Some(Language::De));
    }
}
