use serde::Deserialize;

use crate::error::CompareError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CompareConfig {
    pub name: String,
    /// Fraction of non-ancillary registry entries that must carry the
    /// official flag before the flag is trusted for a unit.
    #[serde(default = "default_official_valid_limit")]
    pub official_valid_limit: f32,
    /// Acceptance distance for candidate matching, in meters.
    #[serde(default = "default_matching_distance")]
    pub matching_distance: f64,
    #[serde(default)]
    pub inputs: Option<InputConfig>,
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_official_valid_limit() -> f32 {
    0.8
}

fn default_matching_distance() -> f64 {
    50.0
}

// ---------------------------------------------------------------------------
// Inputs + Output
// ---------------------------------------------------------------------------

/// CSV files the CLI collaborator loads rows from. Paths are resolved
/// relative to the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    pub registry: String,
    /// Addresses derived from building outlines.
    #[serde(default)]
    pub buildings: Option<String>,
    /// Addresses mapped as single points.
    #[serde(default)]
    pub points: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_missing_dir")]
    pub missing_dir: String,
    #[serde(default = "default_warnings_dir")]
    pub warnings_dir: String,
    /// Optional full-result JSON dump.
    #[serde(default)]
    pub json: Option<String>,
}

fn default_missing_dir() -> String {
    "missing".into()
}

fn default_warnings_dir() -> String {
    "warnings".into()
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            missing_dir: default_missing_dir(),
            warnings_dir: default_warnings_dir(),
            json: None,
        }
    }
}

impl Default for CompareConfig {
    fn default() -> Self {
        CompareConfig {
            name: String::new(),
            official_valid_limit: default_official_valid_limit(),
            matching_distance: default_matching_distance(),
            inputs: None,
            output: OutputConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl CompareConfig {
    pub fn from_toml(input: &str) -> Result<Self, CompareError> {
        let config: CompareConfig =
            toml::from_str(input).map_err(|e| CompareError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CompareError> {
        if !(self.official_valid_limit > 0.0 && self.official_valid_limit <= 1.0) {
            return Err(CompareError::ConfigValidation(format!(
                "official_valid_limit must be in (0, 1], got {}",
                self.official_valid_limit
            )));
        }

        if self.matching_distance <= 0.0 {
            return Err(CompareError::ConfigValidation(format!(
                "matching_distance must be positive, got {}",
                self.matching_distance
            )));
        }

        if let Some(ref inputs) = self.inputs {
            if inputs.registry.is_empty() {
                return Err(CompareError::ConfigValidation(
                    "inputs.registry must name a file".into(),
                ));
            }
            if inputs.buildings.is_none() && inputs.points.is_none() {
                return Err(CompareError::ConfigValidation(
                    "at least one of inputs.buildings or inputs.points is required".into(),
                ));
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
