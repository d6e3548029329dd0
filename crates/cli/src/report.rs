//! Human-readable run summary, printed to stderr.

use swissaddr_recon::engine::RunResult;
use swissaddr_recon::Stats;

fn percent(stats: &Stats) -> String {
    match stats.match_percentage() {
        Some(p) => format!("{p}%"),
        None => "-".to_string(),
    }
}

fn row(label: &str, stats: &Stats) {
    eprintln!(
        "{:<24} {:>8} {:>6} {:>8} {:>8} {:>6} {:>8} {:>9}",
        label,
        stats.registry,
        stats.duplicates,
        stats.survey_total(),
        stats.matched,
        percent(stats),
        stats.missing,
        stats.warnings,
    );
}

fn header(title: &str) {
    eprintln!();
    eprintln!("{title}");
    eprintln!(
        "{:<24} {:>8} {:>6} {:>8} {:>8} {:>6} {:>8} {:>9}",
        "", "registry", "dups", "osm", "matched", "pct", "missing", "warnings"
    );
}

pub fn print_summary(result: &RunResult) {
    eprintln!(
        "{} — engine {} ({})",
        result.meta.config_name, result.meta.engine_version, result.meta.run_at
    );

    header("Units");
    for unit in &result.units {
        let label = if unit.name.is_empty() {
            unit.id.clone()
        } else {
            format!("{} {}", unit.id, unit.name)
        };
        row(&label, &unit.stats);
    }

    if result.regions.len() > 1 {
        header("Regions");
        for (region, stats) in &result.regions {
            row(region, stats);
        }
    }

    header("Total");
    row("TOTAL", &result.global);
}
