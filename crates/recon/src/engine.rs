use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::CompareConfig;
use crate::error::CompareError;
use crate::matcher::{reconcile, MatchOutcome};
use crate::model::{Address, GeometrySource, RegistryRow, SurveyRow, Warning};
use crate::registry::load_registry;
use crate::stats::{Stats, StatsTracker};
use crate::survey::SurveyIndex;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Everything needed to reconcile one administrative unit.
#[derive(Debug, Default)]
pub struct UnitInput {
    /// Stable unit reference, e.g. the BFS municipality number.
    pub id: String,
    pub name: String,
    pub region: String,
    pub registry_rows: Vec<RegistryRow>,
    /// Crowd-sourced rows derived from building outlines.
    pub polygon_rows: Vec<SurveyRow>,
    /// Crowd-sourced rows mapped as single points.
    pub point_rows: Vec<SurveyRow>,
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct UnitReport {
    pub id: String,
    pub name: String,
    pub region: String,
    pub stats: Stats,
    pub matched: Vec<Address>,
    pub matched_ancillary: Vec<Address>,
    pub missing: Vec<Address>,
    pub warnings: Vec<Warning>,
}

#[derive(Debug, Serialize)]
pub struct RunMeta {
    pub config_name: String,
    pub engine_version: String,
    /// RFC3339 wall-clock timestamp of when the run started.
    pub run_at: String,
}

#[derive(Debug, Serialize)]
pub struct RunResult {
    pub meta: RunMeta,
    pub units: Vec<UnitReport>,
    pub regions: BTreeMap<String, Stats>,
    pub global: Stats,
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// Reconcile a single unit.
pub fn run_unit(input: &UnitInput, config: &CompareConfig) -> UnitReport {
    let mut registry = load_registry(&input.registry_rows, config);

    let mut survey = SurveyIndex::new();
    survey.add_rows(GeometrySource::Polygon, &input.polygon_rows, &registry);
    survey.add_rows(GeometrySource::Point, &input.point_rows, &registry);

    let outcome: MatchOutcome = reconcile(&mut registry, &mut survey, config);
    let stats = Stats::from_outcome(&registry, &survey, &outcome);

    UnitReport {
        id: input.id.clone(),
        name: input.name.clone(),
        region: input.region.clone(),
        stats,
        matched: outcome.matched,
        matched_ancillary: outcome.matched_ancillary,
        missing: outcome.missing,
        warnings: outcome.warnings,
    }
}

/// Reconcile every unit and aggregate region and run totals.
pub fn run(units: &[UnitInput], config: &CompareConfig) -> RunResult {
    let meta = RunMeta {
        config_name: config.name.clone(),
        engine_version: env!("CARGO_PKG_VERSION").to_string(),
        run_at: chrono::Utc::now().to_rfc3339(),
    };

    let mut tracker = StatsTracker::default();
    let mut reports = Vec::with_capacity(units.len());
    for unit in units {
        let report = run_unit(unit, config);
        tracker.record(&report.region, &report.stats);
        reports.push(report);
    }

    RunResult {
        meta,
        units: reports,
        regions: tracker.regions,
        global: tracker.global,
    }
}

/// Group loaded rows into per-unit inputs, ordered by unit id. Units that
/// only appear in the crowd-sourced data still get an input so their
/// entries surface as leftovers.
pub fn group_units(
    registry_rows: Vec<RegistryRow>,
    polygon_rows: Vec<(String, SurveyRow)>,
    point_rows: Vec<(String, SurveyRow)>,
) -> Vec<UnitInput> {
    let mut units: BTreeMap<String, UnitInput> = BTreeMap::new();

    for row in registry_rows {
        let unit = units
            .entry(row.municipality_ref.clone())
            .or_insert_with(|| UnitInput {
                id: row.municipality_ref.clone(),
                ..UnitInput::default()
            });
        if unit.name.is_empty() {
            unit.name = row.municipality_name.clone();
        }
        if unit.region.is_empty() {
            unit.region = row.region.clone();
        }
        unit.registry_rows.push(row);
    }

    for (id, row) in polygon_rows {
        units
            .entry(id.clone())
            .or_insert_with(|| UnitInput {
                id,
                ..UnitInput::default()
            })
            .polygon_rows
            .push(row);
    }
    for (id, row) in point_rows {
        units
            .entry(id.clone())
            .or_insert_with(|| UnitInput {
                id,
                ..UnitInput::default()
            })
            .point_rows
            .push(row);
    }

    units.into_values().collect()
}

// ---------------------------------------------------------------------------
// CSV loading
// ---------------------------------------------------------------------------

struct Columns {
    file: String,
    by_name: BTreeMap<String, usize>,
}

impl Columns {
    fn from_headers(file: &str, headers: &csv::StringRecord) -> Self {
        let by_name = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim().to_lowercase(), i))
            .collect();
        Columns {
            file: file.to_string(),
            by_name,
        }
    }

    fn index(&self, column: &str) -> Result<usize, CompareError> {
        self.by_name
            .get(column)
            .copied()
            .ok_or_else(|| CompareError::MissingColumn {
                file: self.file.clone(),
                column: column.to_string(),
            })
    }

    /// Empty cells become `None`.
    fn text(&self, record: &csv::StringRecord, idx: usize) -> Option<String> {
        match record.get(idx).map(str::trim) {
            None | Some("") => None,
            Some(v) => Some(v.to_string()),
        }
    }
}

fn parse_number<T: std::str::FromStr>(
    file: &str,
    record_id: &str,
    field: &'static str,
    value: &str,
) -> Result<T, CompareError> {
    value.parse().map_err(|_| CompareError::FieldParse {
        file: file.to_string(),
        record: record_id.to_string(),
        field,
        value: value.to_string(),
    })
}

fn parse_flag(value: Option<&String>) -> bool {
    matches!(value.map(String::as_str), Some("1") | Some("true"))
}

/// Load registry rows. Column order is free; names are matched
/// case-insensitively against the export's header line.
pub fn load_registry_csv(file: &str, data: &str) -> Result<Vec<RegistryRow>, CompareError> {
    let mut reader = csv::Reader::from_reader(data.as_bytes());
    let headers = reader.headers().map_err(|e| CompareError::Csv {
        file: file.to_string(),
        message: e.to_string(),
    })?;
    let cols = Columns::from_headers(file, headers);

    let egaid = cols.index("egaid")?;
    let canton = cols.index("canton")?;
    let muni_ref = cols.index("muni_ref")?;
    let muni_name = cols.index("muni_name")?;
    let street = cols.index("street")?;
    let housenumber = cols.index("housenumber")?;
    let postcode = cols.index("postcode")?;
    let postcode_ext = cols.index("postcode_ext")?;
    let city = cols.index("city")?;
    let lang = cols.index("lang")?;
    let street_type = cols.index("street_type")?;
    let category = cols.index("category")?;
    let class = cols.index("class")?;
    let official = cols.index("official")?;
    let lon = cols.index("lon")?;
    let lat = cols.index("lat")?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| CompareError::Csv {
            file: file.to_string(),
            message: e.to_string(),
        })?;
        let id_text = cols.text(&record, egaid).unwrap_or_default();

        rows.push(RegistryRow {
            record_id: parse_number(file, &id_text, "egaid", &id_text)?,
            region: cols.text(&record, canton).unwrap_or_default(),
            municipality_ref: cols.text(&record, muni_ref).unwrap_or_default(),
            municipality_name: cols.text(&record, muni_name).unwrap_or_default(),
            street: cols.text(&record, street),
            house_number: cols.text(&record, housenumber),
            postcode: cols.text(&record, postcode),
            postcode_ext: cols.text(&record, postcode_ext),
            city: cols.text(&record, city),
            language: cols.text(&record, lang),
            street_type: cols.text(&record, street_type),
            category: match cols.text(&record, category) {
                Some(v) => parse_number(file, &id_text, "category", &v)?,
                None => 0,
            },
            class: match cols.text(&record, class) {
                Some(v) => parse_number(file, &id_text, "class", &v)?,
                None => 0,
            },
            official: parse_flag(cols.text(&record, official).as_ref()),
            lon: match cols.text(&record, lon) {
                Some(v) => parse_number(file, &id_text, "lon", &v)?,
                None => 0.0,
            },
            lat: match cols.text(&record, lat) {
                Some(v) => parse_number(file, &id_text, "lat", &v)?,
                None => 0.0,
            },
        });
    }
    Ok(rows)
}

/// Load crowd-sourced rows, tagged with the unit they belong to.
pub fn load_survey_csv(
    file: &str,
    data: &str,
) -> Result<Vec<(String, SurveyRow)>, CompareError> {
    let mut reader = csv::Reader::from_reader(data.as_bytes());
    let headers = reader.headers().map_err(|e| CompareError::Csv {
        file: file.to_string(),
        message: e.to_string(),
    })?;
    let cols = Columns::from_headers(file, headers);

    let osm_id = cols.index("osm_id")?;
    let muni_ref = cols.index("muni_ref")?;
    let housenumber = cols.index("housenumber")?;
    let housename = cols.index("housename")?;
    let street = cols.index("street")?;
    let street_de = cols.index("street_de")?;
    let street_fr = cols.index("street_fr")?;
    let street_it = cols.index("street_it")?;
    let street_rm = cols.index("street_rm")?;
    let place = cols.index("place")?;
    let place_de = cols.index("place_de")?;
    let place_fr = cols.index("place_fr")?;
    let place_it = cols.index("place_it")?;
    let place_rm = cols.index("place_rm")?;
    let postcode = cols.index("postcode")?;
    let city = cols.index("city")?;
    let full = cols.index("full")?;
    let lon = cols.index("lon")?;
    let lat = cols.index("lat")?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| CompareError::Csv {
            file: file.to_string(),
            message: e.to_string(),
        })?;
        let id_text = cols.text(&record, osm_id).unwrap_or_default();
        let unit = cols.text(&record, muni_ref).unwrap_or_default();

        let row = SurveyRow {
            source_id: parse_number(file, &id_text, "osm_id", &id_text)?,
            house_number: cols.text(&record, housenumber),
            house_name: cols.text(&record, housename),
            street: cols.text(&record, street),
            street_names: crate::model::LocalizedNames {
                de: cols.text(&record, street_de),
                rm: cols.text(&record, street_rm),
                fr: cols.text(&record, street_fr),
                it: cols.text(&record, street_it),
            },
            place: cols.text(&record, place),
            place_names: crate::model::LocalizedNames {
                de: cols.text(&record, place_de),
                rm: cols.text(&record, place_rm),
                fr: cols.text(&record, place_fr),
                it: cols.text(&record, place_it),
            },
            postcode: cols.text(&record, postcode),
            city: cols.text(&record, city),
            full: cols.text(&record, full),
            lon: match cols.text(&record, lon) {
                Some(v) => parse_number(file, &id_text, "lon", &v)?,
                None => 0.0,
            },
            lat: match cols.text(&record, lat) {
                Some(v) => parse_number(file, &id_text, "lat", &v)?,
                None => 0.0,
            },
        };
        rows.push((unit, row));
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGISTRY_HEADER: &str = "egaid,canton,muni_ref,muni_name,street,housenumber,postcode,postcode_ext,city,lang,street_type,category,class,official,lon,lat";
    const SURVEY_HEADER: &str = "osm_id,muni_ref,housenumber,housename,street,street_de,street_fr,street_it,street_rm,place,place_de,place_fr,place_it,place_rm,postcode,city,full,lon,lat";

    #[test]
    fn registry_csv_roundtrip() {
        let data = format!(
            "{REGISTRY_HEADER}\n1,ZH,261,Zürich,Hauptstrasse,5,8000,00,Zürich,9901,Street,1020,1110,1,8.54,47.37\n"
        );
        let rows = load_registry_csv("gwr.csv", &data).unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.record_id, 1);
        assert_eq!(row.region, "ZH");
        assert_eq!(row.street.as_deref(), Some("Hauptstrasse"));
        assert_eq!(row.language.as_deref(), Some("9901"));
        assert!(row.official);
        assert!((row.lat - 47.37).abs() < 1e-5);
    }

    #[test]
    fn registry_csv_empty_cells_become_none() {
        let data = format!("{REGISTRY_HEADER}\n2,BE,351,Bern,,,,,,,,,,0,,\n");
        let rows = load_registry_csv("gwr.csv", &data).unwrap();
        let row = &rows[0];
        assert!(row.street.is_none());
        assert!(row.house_number.is_none());
        assert!(!row.official);
        assert_eq!(row.category, 0);
    }

    #[test]
    fn registry_csv_rejects_missing_column() {
        let err = load_registry_csv("gwr.csv", "egaid,canton\n1,ZH\n").unwrap_err();
        assert!(matches!(err, CompareError::MissingColumn { .. }));
    }

    #[test]
    fn registry_csv_rejects_bad_number() {
        let data = format!(
            "{REGISTRY_HEADER}\nxyz,ZH,261,Zürich,Hauptstrasse,5,8000,,Zürich,9901,Street,1020,1110,1,8.54,47.37\n"
        );
        let err = load_registry_csv("gwr.csv", &data).unwrap_err();
        match err {
            CompareError::FieldParse { field, value, .. } => {
                assert_eq!(field, "egaid");
                assert_eq!(value, "xyz");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn survey_csv_tags_rows_with_unit() {
        let data = format!(
            "{SURVEY_HEADER}\n10,261,5,,Hauptstrasse,,,,,,,,,,8001,Zürich,,8.54,47.37\n11,351,2,,Bahnhofstrasse,,,,,,,,,,3000,Bern,,7.44,46.95\n"
        );
        let rows = load_survey_csv("osm.csv", &data).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0, "261");
        assert_eq!(rows[0].1.source_id, 10);
        assert_eq!(rows[1].0, "351");
        assert_eq!(rows[1].1.postcode.as_deref(), Some("3000"));
    }

    #[test]
    fn survey_csv_fills_language_slots() {
        let data = format!(
            "{SURVEY_HEADER}\n10,371,10,,Zentralstrasse,Zentralstrasse,Rue Centrale,,,,,,,,2500,Biel,,7.25,47.14\n"
        );
        let rows = load_survey_csv("osm.csv", &data).unwrap();
        let row = &rows[0].1;
        assert_eq!(row.street_names.de.as_deref(), Some("Zentralstrasse"));
        assert_eq!(row.street_names.fr.as_deref(), Some("Rue Centrale"));
        assert!(row.street_names.it.is_none());
    }

    #[test]
    fn group_units_merges_all_three_streams() {
        let registry = vec![RegistryRow {
            record_id: 1,
            region: "ZH".into(),
            municipality_ref: "261".into(),
            municipality_name: "Zürich".into(),
            street: Some("Hauptstrasse".into()),
            house_number: Some("5".into()),
            postcode: None,
            postcode_ext: None,
            city: None,
            language: None,
            street_type: None,
            category: 0,
            class: 0,
            official: true,
            lon: 0.0,
            lat: 0.0,
        }];
        let polygons = vec![("261".to_string(), SurveyRow::default())];
        let points = vec![
            ("261".to_string(), SurveyRow::default()),
            ("9999".to_string(), SurveyRow::default()),
        ];

        let units = group_units(registry, polygons, points);
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].id, "261");
        assert_eq!(units[0].name, "Zürich");
        assert_eq!(units[0].registry_rows.len(), 1);
        assert_eq!(units[0].polygon_rows.len(), 1);
        assert_eq!(units[0].point_rows.len(), 1);
        // Survey-only unit still gets an input.
        assert_eq!(units[1].id, "9999");
        assert!(units[1].registry_rows.is_empty());
    }

    #[test]
    fn run_aggregates_units_into_regions_and_global() {
        let config = CompareConfig::default();
        let mk_registry = |id: i64, unit: &str, region: &str| RegistryRow {
            record_id: id,
            region: region.into(),
            municipality_ref: unit.into(),
            municipality_name: String::new(),
            street: Some("Hauptstrasse".into()),
            house_number: Some("5".into()),
            postcode: Some("8000".into()),
            postcode_ext: None,
            city: Some("Zürich".into()),
            language: Some("9901".into()),
            street_type: Some("Street".into()),
            category: 1020,
            class: 1110,
            official: true,
            lon: 0.0,
            lat: 0.0,
        };
        let osm = SurveyRow {
            source_id: 10,
            house_number: Some("5".into()),
            street: Some("Hauptstrasse".into()),
            postcode: Some("8000".into()),
            city: Some("Zürich".into()),
            ..SurveyRow::default()
        };

        let units = vec![
            UnitInput {
                id: "261".into(),
                name: "Zürich".into(),
                region: "ZH".into(),
                registry_rows: vec![mk_registry(1, "261", "ZH")],
                point_rows: vec![osm.clone()],
                ..UnitInput::default()
            },
            UnitInput {
                id: "351".into(),
                name: "Bern".into(),
                region: "BE".into(),
                registry_rows: vec![mk_registry(2, "351", "BE")],
                ..UnitInput::default()
            },
        ];

        let result = run(&units, &config);
        assert_eq!(result.units.len(), 2);
        assert_eq!(result.global.registry, 2);
        assert_eq!(result.global.matched, 1);
        assert_eq!(result.global.missing, 1);
        assert_eq!(result.regions["ZH"].matched, 1);
        assert_eq!(result.regions["BE"].missing, 1);
        assert!(!result.meta.run_at.is_empty());
        assert_eq!(result.meta.engine_version, env!("CARGO_PKG_VERSION"));
    }
}
