use serde::Serialize;

const EARTH_RADIUS_EQUATOR: f64 = 6_378_137.0;
const EARTH_RADIUS_POLAR: f64 = 6_356_752.0;
/// Arithmetic mean of the two WGS84 reference radii, in meters.
pub const EARTH_RADIUS: f64 = (EARTH_RADIUS_EQUATOR + EARTH_RADIUS_POLAR) / 2.0;

/// Street type tag the registry uses for street-based addressing. Everything
/// else (named areas, hamlets) is place-based.
pub const STREET_GEOMETRY: &str = "Street";

// ---------------------------------------------------------------------------
// Languages
// ---------------------------------------------------------------------------

/// The four national languages street and place names can be recorded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    De,
    Rm,
    Fr,
    It,
}

impl Language {
    /// Fixed probe order for multilingual lookups.
    pub const ALL: [Language; 4] = [Language::De, Language::Rm, Language::Fr, Language::It];

    /// Decode the registry's numeric language code.
    pub fn from_registry_code(code: &str) -> Option<Self> {
        match code {
            "9901" => Some(Self::De),
            "9902" => Some(Self::Rm),
            "9903" => Some(Self::Fr),
            "9904" => Some(Self::It),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Self::De => "de",
            Self::Rm => "rm",
            Self::Fr => "fr",
            Self::It => "it",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Per-language name slots.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LocalizedNames {
    pub de: Option<String>,
    pub rm: Option<String>,
    pub fr: Option<String>,
    pub it: Option<String>,
}

impl LocalizedNames {
    pub fn get(&self, lang: Language) -> Option<&str> {
        match lang {
            Language::De => self.de.as_deref(),
            Language::Rm => self.rm.as_deref(),
            Language::Fr => self.fr.as_deref(),
            Language::It => self.it.as_deref(),
        }
    }

    pub fn set(&mut self, lang: Language, name: String) {
        let slot = match lang {
            Language::De => &mut self.de,
            Language::Rm => &mut self.rm,
            Language::Fr => &mut self.fr,
            Language::It => &mut self.it,
        };
        *slot = Some(name);
    }

    pub fn is_empty(&self) -> bool {
        self.de.is_none() && self.rm.is_none() && self.fr.is_none() && self.it.is_none()
    }
}

// ---------------------------------------------------------------------------
// Addresses
// ---------------------------------------------------------------------------

/// Origin of a crowd-sourced address geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometrySource {
    Polygon,
    Point,
}

impl std::fmt::Display for GeometrySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Polygon => write!(f, "polygon"),
            Self::Point => write!(f, "point"),
        }
    }
}

/// One candidate address, from either dataset.
///
/// Registry entries carry `category`, `class` and `official`; crowd-sourced
/// entries carry `geometry_source` and possibly a `place` name instead of a
/// street. A registry entry that went through the multilingual fold has its
/// street text in `street_names` and `street` cleared.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Address {
    pub geometry_source: Option<GeometrySource>,
    pub external_id: i64,
    pub house_number: Option<String>,
    pub house_name: Option<String>,
    pub street: Option<String>,
    pub street_names: LocalizedNames,
    pub street_lang: Option<Language>,
    pub place: Option<String>,
    pub street_type: Option<String>,
    pub postcode: Option<String>,
    pub city: Option<String>,
    pub full: Option<String>,
    pub category: i32,
    pub class: i32,
    pub official: bool,
    pub lon: f32,
    pub lat: f32,
}

impl Address {
    /// Secondary addresses: service entrances, non-principal numbers and the
    /// "12.a" / "7,1" house number style.
    pub fn is_ancillary(&self) -> bool {
        if matches!(self.category, 1010 | 1080) || matches!(self.class, 1242 | 1252) {
            return true;
        }
        self.house_number
            .as_deref()
            .is_some_and(has_ancillary_number)
    }

    /// True when the registry recorded this entry against a street geometry
    /// rather than a named place.
    pub fn street_based(&self) -> bool {
        self.street_type.as_deref() == Some(STREET_GEOMETRY)
    }
}

/// A dot or comma separator after a dot-free prefix, e.g. "12.a" or "7,1"
/// but not "12a".
fn has_ancillary_number(number: &str) -> bool {
    number
        .char_indices()
        .any(|(i, c)| matches!(c, '.' | ',') && i > 0 && !number[..i].contains('.'))
}

/// Create the key used for matching: lowercased name and number joined by a
/// single space. Absent parts render as empty so the key is always stable.
pub fn normalized_key(name: Option<&str>, number: Option<&str>) -> String {
    format!(
        "{} {}",
        name.unwrap_or("").to_lowercase(),
        number.unwrap_or("").to_lowercase()
    )
}

/// Haversine surface distance in meters between two WGS84 points.
pub fn haversine_distance(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let lat1 = lat1.to_radians();
    let lat2 = lat2.to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + (d_lon / 2.0).sin().powi(2) * lat1.cos() * lat2.cos();
    EARTH_RADIUS * 2.0 * a.sqrt().atan2((1.0 - a).sqrt())
}

pub fn distance_between(a: &Address, b: &Address) -> f64 {
    haversine_distance(a.lon as f64, a.lat as f64, b.lon as f64, b.lat as f64)
}

// ---------------------------------------------------------------------------
// Input rows
// ---------------------------------------------------------------------------

/// One raw registry row, validated and reprojected upstream. The same
/// `record_id` may repeat across rows carrying different-language street
/// names for one physical address.
#[derive(Debug, Clone)]
pub struct RegistryRow {
    pub record_id: i64,
    pub region: String,
    pub municipality_ref: String,
    pub municipality_name: String,
    pub street: Option<String>,
    pub house_number: Option<String>,
    pub postcode: Option<String>,
    pub postcode_ext: Option<String>,
    pub city: Option<String>,
    /// Registry wire code, one of 9901..9904.
    pub language: Option<String>,
    pub street_type: Option<String>,
    pub category: i32,
    pub class: i32,
    pub official: bool,
    pub lon: f32,
    pub lat: f32,
}

/// One raw crowd-sourced row. The house number may still be multi-valued
/// ("5;7;9"); splitting happens when the survey index is built.
#[derive(Debug, Clone, Default)]
pub struct SurveyRow {
    pub source_id: i64,
    pub house_number: Option<String>,
    pub house_name: Option<String>,
    pub street: Option<String>,
    pub street_names: LocalizedNames,
    pub place: Option<String>,
    pub place_names: LocalizedNames,
    pub postcode: Option<String>,
    pub city: Option<String>,
    pub full: Option<String>,
    pub lon: f32,
    pub lat: f32,
}

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

/// Field-level discrepancies found for one crowd-sourced address.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Warning {
    pub geometry_source: Option<GeometrySource>,
    pub external_id: i64,
    pub postcode: bool,
    pub osm_postcode: Option<String>,
    pub gwr_postcode: Option<String>,
    pub city: bool,
    pub osm_city: Option<String>,
    pub gwr_city: Option<String>,
    pub place: bool,
    pub distance: bool,
    pub no_street: bool,
    pub not_official: bool,
    pub non_registry: bool,
    pub lon: f32,
    pub lat: f32,
}

impl Warning {
    /// An empty warning anchored to the crowd-sourced address it is about.
    pub fn for_address(addr: &Address) -> Self {
        Warning {
            geometry_source: addr.geometry_source,
            external_id: addr.external_id,
            lon: addr.lon,
            lat: addr.lat,
            ..Warning::default()
        }
    }

    pub fn has_warning(&self) -> bool {
        self.postcode
            || self.city
            || self.place
            || self.distance
            || self.no_street
            || self.not_official
            || self.non_registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ancillary_by_number_pattern() {
        let mut addr = Address {
            house_number: Some("12.a".into()),
            ..Address::default()
        };
        assert!(addr.is_ancillary());

        addr.house_number = Some("12a".into());
        assert!(!addr.is_ancillary());

        addr.house_number = Some("7,1".into());
        assert!(addr.is_ancillary());

        addr.house_number = Some(".5".into());
        assert!(!addr.is_ancillary());
    }

    #[test]
    fn ancillary_by_category_and_class() {
        let addr = Address {
            category: 1010,
            ..Address::default()
        };
        assert!(addr.is_ancillary());

        let addr = Address {
            class: 1252,
            ..Address::default()
        };
        assert!(addr.is_ancillary());

        let addr = Address {
            category: 1020,
            class: 1230,
            house_number: Some("5".into()),
            ..Address::default()
        };
        assert!(!addr.is_ancillary());
    }

    #[test]
    fn key_is_case_insensitive_and_total() {
        assert_eq!(
            normalized_key(Some("Hauptstrasse"), Some("5")),
            normalized_key(Some("HAUPTSTRASSE"), Some("5"))
        );
        assert_eq!(normalized_key(None, None), " ");
        assert_eq!(normalized_key(Some("Dorf"), None), "dorf ");
        assert_ne!(
            normalized_key(Some("Dorf"), Some("1")),
            normalized_key(Some("Dorf"), Some("2"))
        );
    }

    #[test]
    fn haversine_zero_and_fifty_meters() {
        assert_eq!(haversine_distance(0.0, 0.0, 0.0, 0.0), 0.0);

        // 0.00045 degrees of latitude is close to 50 m on the mean radius.
        let d = haversine_distance(0.0, 0.0, 0.0, 0.00045);
        assert!((d - 50.0).abs() < 0.1, "expected ~50 m, got {d}");
    }

    #[test]
    fn haversine_symmetric() {
        let d1 = haversine_distance(7.44, 46.94, 7.45, 46.95);
        let d2 = haversine_distance(7.45, 46.95, 7.44, 46.94);
        assert!((d1 - d2).abs() < 1e-9);
    }

    #[test]
    fn registry_language_codes() {
        assert_eq!(Language::from_registry_code("9901"), Some(Language::De));
        assert_eq!(Language::from_registry_code("9902"), Some(Language::Rm));
        assert_eq!(Language::from_registry_code("9903"), Some(Language::Fr));
        assert_eq!(Language::from_registry_code("9904"), Some(Language::It));
        assert_eq!(Language::from_registry_code("9905"), None);
    }

    #[test]
    fn warning_flags() {
        let addr = Address {
            external_id: 7,
            lon: 1.0,
            lat: 2.0,
            ..Address::default()
        };
        let mut w = Warning::for_address(&addr);
        assert_eq!(w.external_id, 7);
        assert!(!w.has_warning());
        w.distance = true;
        assert!(w.has_warning());
    }
}
