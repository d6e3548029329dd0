//! `swissaddr run` / `swissaddr validate` — config-driven address comparison.

use std::io;
use std::path::{Path, PathBuf};

use swissaddr_recon::config::CompareConfig;
use swissaddr_recon::engine::{group_units, load_registry_csv, load_survey_csv, run, RunResult};
use swissaddr_recon::geojson::{
    missing_feature, warning_feature, write_feature_collection, FeatureCollection,
};

use crate::exit_codes::{EXIT_INVALID_CONFIG, EXIT_RUNTIME, EXIT_USAGE};
use crate::report;
use crate::CliError;

fn compare_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError {
        code,
        message: msg.into(),
        hint: None,
    }
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config_str = std::fs::read_to_string(&config_path)
        .map_err(|e| compare_err(EXIT_RUNTIME, format!("cannot read config: {e}")))?;
    let config = CompareConfig::from_toml(&config_str)
        .map_err(|e| compare_err(EXIT_INVALID_CONFIG, e.to_string()))?;
    eprintln!("config ok: {}", config.name);
    Ok(())
}

pub fn cmd_run(
    config_path: PathBuf,
    json_output: bool,
    output_file: Option<PathBuf>,
    limit: Option<f32>,
    municipality: Option<String>,
) -> Result<(), CliError> {
    let config_str = std::fs::read_to_string(&config_path)
        .map_err(|e| compare_err(EXIT_RUNTIME, format!("cannot read config: {e}")))?;
    let mut config = CompareConfig::from_toml(&config_str)
        .map_err(|e| compare_err(EXIT_INVALID_CONFIG, e.to_string()))?;

    if let Some(limit) = limit {
        config.official_valid_limit = limit;
        config.validate().map_err(|e| {
            compare_err(EXIT_USAGE, e.to_string())
        })?;
    }

    let Some(inputs) = config.inputs.clone() else {
        return Err(compare_err(
            EXIT_INVALID_CONFIG,
            "config has no [inputs] section",
        ));
    };

    // Input paths resolve relative to the config file's directory.
    let base_dir = config_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();

    let registry_rows = {
        let data = read_input(&base_dir, &inputs.registry)?;
        load_registry_csv(&inputs.registry, &data)
            .map_err(|e| compare_err(EXIT_RUNTIME, e.to_string()))?
    };
    let polygon_rows = match &inputs.buildings {
        Some(file) => {
            let data = read_input(&base_dir, file)?;
            load_survey_csv(file, &data).map_err(|e| compare_err(EXIT_RUNTIME, e.to_string()))?
        }
        None => Vec::new(),
    };
    let point_rows = match &inputs.points {
        Some(file) => {
            let data = read_input(&base_dir, file)?;
            load_survey_csv(file, &data).map_err(|e| compare_err(EXIT_RUNTIME, e.to_string()))?
        }
        None => Vec::new(),
    };

    let mut units = group_units(registry_rows, polygon_rows, point_rows);
    if let Some(ref wanted) = municipality {
        units.retain(|u| &u.id == wanted || u.name.eq_ignore_ascii_case(wanted));
        if units.is_empty() {
            return Err(compare_err(
                EXIT_USAGE,
                format!("no municipality matches '{wanted}'"),
            ));
        }
    }

    let result = run(&units, &config);

    write_reports(&base_dir, &config, &result)?;

    let json_str = serde_json::to_string_pretty(&result)
        .map_err(|e| compare_err(EXIT_RUNTIME, format!("JSON serialization error: {e}")))?;

    let json_path = output_file.or_else(|| config.output.json.as_ref().map(PathBuf::from));
    if let Some(ref path) = json_path {
        std::fs::write(path, &json_str)
            .map_err(|e| compare_err(EXIT_RUNTIME, format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }
    if json_output {
        println!("{json_str}");
    }

    report::print_summary(&result);
    Ok(())
}

fn read_input(base_dir: &Path, file: &str) -> Result<String, CliError> {
    let path = base_dir.join(file);
    std::fs::read_to_string(&path)
        .map_err(|e| compare_err(EXIT_RUNTIME, format!("cannot read {}: {e}", path.display())))
}

/// One missing and one warnings GeoJSON file per unit, plus one per region.
/// Empty collections produce no file.
fn write_reports(
    base_dir: &Path,
    config: &CompareConfig,
    result: &RunResult,
) -> Result<(), CliError> {
    let missing_dir = base_dir.join(&config.output.missing_dir);
    let warnings_dir = base_dir.join(&config.output.warnings_dir);

    let mut region_missing: std::collections::BTreeMap<String, FeatureCollection> =
        std::collections::BTreeMap::new();
    let mut region_warnings: std::collections::BTreeMap<String, FeatureCollection> =
        std::collections::BTreeMap::new();

    for unit in &result.units {
        let mut missing = FeatureCollection::new(format!("{} missing", unit.name));
        for addr in &unit.missing {
            missing.features.push(missing_feature(addr));
        }
        if !missing.is_empty() {
            write_collection(&missing_dir, &format!("{}.geojson", unit.id), &missing)?;
            if !unit.region.is_empty() {
                region_missing
                    .entry(unit.region.clone())
                    .or_insert_with(|| {
                        FeatureCollection::new(format!("{} missing", unit.region))
                    })
                    .features
                    .extend(missing.features);
            }
        }

        let mut warnings = FeatureCollection::new(format!("{} warnings", unit.name));
        for warning in &unit.warnings {
            warnings
                .features
                .push(warning_feature(warning, config.matching_distance));
        }
        if !warnings.is_empty() {
            write_collection(&warnings_dir, &format!("{}.geojson", unit.id), &warnings)?;
            if !unit.region.is_empty() {
                region_warnings
                    .entry(unit.region.clone())
                    .or_insert_with(|| {
                        FeatureCollection::new(format!("{} warnings", unit.region))
                    })
                    .features
                    .extend(warnings.features);
            }
        }
    }

    for (region, fc) in &region_missing {
        write_collection(&missing_dir, &format!("{region}.geojson"), fc)?;
    }
    for (region, fc) in &region_warnings {
        write_collection(&warnings_dir, &format!("{region}.geojson"), fc)?;
    }
    Ok(())
}

fn write_collection(
    dir: &Path,
    file: &str,
    collection: &FeatureCollection,
) -> Result<(), CliError> {
    std::fs::create_dir_all(dir)
        .map_err(|e| compare_err(EXIT_RUNTIME, format!("cannot create {}: {e}", dir.display())))?;
    let path = dir.join(file);
    let out = std::fs::File::create(&path)
        .map_err(|e| compare_err(EXIT_RUNTIME, format!("cannot write {}: {e}", path.display())))?;
    write_feature_collection(io::BufWriter::new(out), collection)
        .map_err(|e| compare_err(EXIT_RUNTIME, e.to_string()))
}
