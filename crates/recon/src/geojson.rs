//! Minimal GeoJSON output types. Only what the reports need: point
//! features with a flat property map, preserving insertion order.

use std::io;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::CompareError;
use crate::model::{Address, GeometrySource, Language, Warning};

#[derive(Debug, Serialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub name: String,
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(name: impl Into<String>) -> Self {
        FeatureCollection {
            kind: "FeatureCollection",
            name: name.into(),
            features: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Pretty-print a collection to any writer.
pub fn write_feature_collection<W: io::Write>(
    writer: W,
    collection: &FeatureCollection,
) -> Result<(), CompareError> {
    serde_json::to_writer_pretty(writer, collection)
        .map_err(|e| CompareError::Io(e.to_string()))
}

#[derive(Debug, Serialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub properties: Map<String, Value>,
    pub geometry: PointGeometry,
}

#[derive(Debug, Serialize)]
pub struct PointGeometry {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub coordinates: [f64; 2],
}

fn feature(properties: Map<String, Value>, lon: f32, lat: f32) -> Feature {
    Feature {
        kind: "Feature",
        properties,
        geometry: PointGeometry {
            kind: "Point",
            coordinates: [lon as f64, lat as f64],
        },
    }
}

fn set(props: &mut Map<String, Value>, key: &str, value: &Option<String>) {
    if let Some(v) = value {
        props.insert(key.to_string(), Value::String(v.clone()));
    }
}

/// Render a registry entry nobody has mapped yet. Properties use the tags a
/// mapper would add, so the feature doubles as an editing template.
pub fn missing_feature(addr: &Address) -> Feature {
    let mut props = Map::new();
    set(&mut props, "addr:housenumber", &addr.house_number);

    let name_tag = if addr.street_based() {
        "addr:street"
    } else {
        "addr:place"
    };
    set(&mut props, name_tag, &addr.street);
    for lang in Language::ALL {
        if let Some(name) = addr.street_names.get(lang) {
            props.insert(
                format!("{}:{}", name_tag, lang.tag()),
                Value::String(name.to_string()),
            );
        }
    }

    set(&mut props, "addr:postcode", &addr.postcode);
    set(&mut props, "addr:city", &addr.city);
    feature(props, addr.lon, addr.lat)
}

/// Render one warning with the flag names the downstream QA viewers expect.
pub fn warning_feature(warning: &Warning, distance_limit: f64) -> Feature {
    let mut props = Map::new();
    props.insert(
        "OSM geometry".to_string(),
        Value::String(
            match warning.geometry_source {
                Some(GeometrySource::Polygon) => "polygon",
                _ => "point",
            }
            .to_string(),
        ),
    );
    props.insert("OSM id".to_string(), Value::from(warning.external_id));

    if warning.postcode {
        props.insert("missing or wrong addr:postcode".to_string(), Value::Bool(true));
        set(&mut props, "OSM postcode", &warning.osm_postcode);
        set(&mut props, "GWR postcode", &warning.gwr_postcode);
    }
    if warning.city {
        props.insert("missing or wrong addr:city".to_string(), Value::Bool(true));
        set(&mut props, "OSM city", &warning.osm_city);
        set(&mut props, "GWR city", &warning.gwr_city);
    }
    if warning.place {
        props.insert(
            "addr:street instead of addr:place".to_string(),
            Value::Bool(true),
        );
    }
    if warning.distance {
        props.insert(
            format!("distance more than {} m", distance_limit),
            Value::Bool(true),
        );
    }
    if warning.no_street {
        props.insert(
            "no addr:street or addr:place".to_string(),
            Value::Bool(true),
        );
    }
    if warning.not_official {
        props.insert("not official".to_string(), Value::Bool(true));
    }
    if warning.non_registry {
        props.insert("not in GWR".to_string(), Value::Bool(true));
    }

    feature(props, warning.lon, warning.lat)
}
