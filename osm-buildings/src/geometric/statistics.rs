use serde::Serialize;
use std::fmt;

/// Running totals of one extraction pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunCounters {
    /// Every area handed over by the decoder
    pub areas_seen: u64,
    /// Areas tagged `building`
    pub buildings: u64,
    pub with_height: u64,
    pub with_levels: u64,
    pub named: u64,
    /// Heights filled from tagged outline nodes
    pub heights_from_nodes: u64,
    /// Buildings dropped because their WKB could not be decoded
    pub geometry_failures: u64,
    /// Point primitives with a `height` tag
    pub height_nodes: u64,
}

impl RunCounters {
    pub fn report(&self) -> StatisticsReport {
        StatisticsReport {
            buildings: self.buildings,
            with_height: self.with_height,
            with_height_pct: percentage(self.with_height, self.buildings),
            with_levels: self.with_levels,
            with_levels_pct: percentage(self.with_levels, self.buildings),
            named: self.named,
            heights_from_nodes: self.heights_from_nodes,
            geometry_failures: self.geometry_failures,
            areas_seen: self.areas_seen,
        }
    }
}

/// `part / total * 100`, None when there is nothing to divide by
pub fn percentage(part: u64, total: u64) -> Option<f64> {
    (total > 0).then(|| part as f64 / total as f64 * 100.0)
}

/// End-of-run summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsReport {
    pub buildings: u64,
    pub with_height: u64,
    pub with_height_pct: Option<f64>,
    pub with_levels: u64,
    pub with_levels_pct: Option<f64>,
    pub named: u64,
    pub heights_from_nodes: u64,
    pub geometry_failures: u64,
    pub areas_seen: u64,
}

fn fmt_pct(pct: Option<f64>) -> String {
    match pct {
        Some(p) => format!("{:.3}%", p),
        None => "n/a".to_string(),
    }
}

impl fmt::Display for StatisticsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Number of buildings: {}", self.buildings)?;
        writeln!(
            f,
            "Number of bldg heights found: {} {}",
            self.with_height,
            fmt_pct(self.with_height_pct)
        )?;
        writeln!(
            f,
            "Number of bldg levels found: {} {}",
            self.with_levels,
            fmt_pct(self.with_levels_pct)
        )?;
        writeln!(f, "Number of named buildings: {}", self.named)?;
        if self.heights_from_nodes > 0 {
            writeln!(f, "Heights inferred from nodes: {}", self.heights_from_nodes)?;
        }
        if self.geometry_failures > 0 {
            writeln!(f, "Buildings with broken geometry: {}", self.geometry_failures)?;
        }
        write!(f, "Areas seen: {}", self.areas_seen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_percentages() {
        let counters = RunCounters {
            areas_seen: 12,
            buildings: 10,
            with_height: 4,
            with_levels: 6,
            ..Default::default()
        };
        let report = counters.report();
        assert_eq!(report.with_height_pct, Some(40.0));
        assert_eq!(report.with_levels_pct, Some(60.0));

        let text = report.to_string();
        assert!(text.contains("Number of buildings: 10"));
        assert!(text.contains("4 40.000%"));
        assert!(text.contains("6 60.000%"));
    }

    #[test]
    fn test_no_buildings_does_not_divide_by_zero() {
        let report = RunCounters::default().report();
        assert_eq!(report.with_height_pct, None);
        assert_eq!(report.with_levels_pct, None);
        assert!(report.to_string().contains("n/a"));
    }
}
