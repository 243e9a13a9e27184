use crate::collect::global_variables::DEFAULT_STOREY_HEIGHT;
use crate::error::{BuildingsError, BuildingsResult};

/// Energy Use Intensity per region, kWh/m²/year
pub const REGION_EUI: [(&str, f64); 2] = [("mumbai", 54.0), ("new delhi", 57.0)];

/// Look up the EUI of a region (case and surrounding whitespace ignored)
pub fn region_eui(region: &str) -> BuildingsResult<f64> {
    let wanted = region.trim().to_lowercase();
    REGION_EUI
        .iter()
        .find(|(name, _)| *name == wanted)
        .map(|(_, eui)| *eui)
        .ok_or_else(|| BuildingsError::UnknownRegion {
            region: region.to_string(),
            known: REGION_EUI
                .iter()
                .map(|(name, _)| *name)
                .collect::<Vec<_>>()
                .join(", "),
        })
}

/// Estimates yearly energy use of a building from its floor count and footprint
/// The region is resolved once, when the estimator is built.
#[derive(Debug, Clone)]
pub struct EnergyEstimator {
    region: String,
    eui: f64,
    storey_height: f64,
}

impl EnergyEstimator {
    pub fn new(region: &str) -> BuildingsResult<Self> {
        let eui = region_eui(region)?;
        Ok(EnergyEstimator {
            region: region.trim().to_lowercase(),
            eui,
            storey_height: DEFAULT_STOREY_HEIGHT,
        })
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn eui(&self) -> f64 {
        self.eui
    }

    /// Number of floors used for the estimate
    /// Tagged levels win; otherwise floors are derived from a positive height
    /// at one floor per storey height, and a building with neither has one.
    pub fn levels(&self, levels: Option<f64>, height_m: Option<f64>) -> f64 {
        match (levels, height_m) {
            (Some(levels), _) => levels,
            (None, Some(h)) if h > 0.0 => (h / self.storey_height).floor(),
            _ => 1.0,
        }
    }

    /// `EUI * levels * area`, kWh/year
    pub fn estimate(&self, levels: Option<f64>, height_m: Option<f64>, area_m2: f64) -> f64 {
        self.eui * self.levels(levels, height_m) * area_m2
    }
}

/// One-shot estimate; negative `levels` or `height_m` mean "unknown"
pub fn estimate_energy(levels: f64, height_m: f64, area_m2: f64, region: &str) -> BuildingsResult<f64> {
    let estimator = EnergyEstimator::new(region)?;
    let levels = (levels >= 0.0).then_some(levels);
    let height = (height_m >= 0.0).then_some(height_m);
    Ok(estimator.estimate(levels, height, area_m2))
}
