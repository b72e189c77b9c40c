use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetClass {
    Equity,
    Bond,
    Reit,
    Cash,
    Crypto,
    #[serde(other)]
    Other,
}

impl FromStr for AssetClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "equity" | "equities" | "stock" | "stocks" => Ok(AssetClass::Equity),
            "bond" | "bonds" => Ok(AssetClass::Bond),
            "reit" | "reits" | "property" => Ok(AssetClass::Reit),
            "cash" => Ok(AssetClass::Cash),
            "crypto" => Ok(AssetClass::Crypto),
            "" => Err("asset class must not be empty".to_string()),
            _ => Ok(AssetClass::Other),
        }
    }
}

/// One line of a portfolio. `weight_percent` is not required to sum to 100
/// across the allocation; blending normalises by the actual total.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetAllocation {
    pub id: String,
    pub name: String,
    pub weight_percent: f64,
    pub expected_annual_return: f64,
    pub annual_volatility: f64,
    pub asset_class: AssetClass,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaverProfile {
    pub current_age: u32,
    pub retirement_age: u32,
    pub current_savings: f64,
    pub monthly_contribution: f64,
}

impl SaverProfile {
    pub fn years_to_retirement(&self) -> u32 {
        self.retirement_age.saturating_sub(self.current_age)
    }

    pub fn annual_contribution(&self) -> f64 {
        self.monthly_contribution * 12.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationConfig {
    pub num_paths: u32,
    pub years_to_project: u32,
    pub inflation_rate: f64,
    /// Base seed for the per-path generators. `None` draws one from OS entropy.
    pub seed: Option<u64>,
    /// Worker threads for path generation. `None` uses the global rayon pool.
    pub workers: Option<usize>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_paths: 1_000,
            years_to_project: 40,
            inflation_rate: 0.02,
            seed: None,
            workers: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioBlend {
    pub expected_return: f64,
    pub risk: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationPoint {
    pub age_at_step: u32,
    pub nominal_value: f64,
    pub real_value: f64,
    pub cumulative_contributions: f64,
    pub cumulative_returns: f64,
}

/// One simulated trajectory, one point per year including year 0.
pub type SimulationPath = Vec<SimulationPoint>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PercentileBand {
    pub percentile: f64,
    pub points: Vec<SimulationPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepSummary {
    pub age_at_step: u32,
    pub mean_nominal_value: f64,
    pub mean_real_value: f64,
    pub cumulative_contributions: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResult {
    pub bands: Vec<PercentileBand>,
    pub summary: Vec<StepSummary>,
    #[serde(skip)]
    pub paths: Vec<SimulationPath>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StressScenario {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Signed fraction per asset class, e.g. -0.56 for a 56% fall.
    pub impacts: BTreeMap<AssetClass, f64>,
    pub shock_duration_months: u32,
    #[serde(default)]
    pub recovery_duration_months: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StressPoint {
    pub month: u32,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FactorBetas {
    pub market: f64,
    pub size: f64,
    pub value: f64,
    pub momentum: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskReport {
    pub sharpe_ratio: f64,
    pub max_drawdown_fraction: f64,
    pub value_at_risk_fraction: f64,
    pub factor_betas: FactorBetas,
    pub alpha: f64,
    pub r_squared: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskConfig {
    pub risk_free_rate: f64,
    pub var_confidence: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.02,
            var_confidence: 0.95,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn years_to_retirement_clamps_to_zero() {
        let saver = SaverProfile {
            current_age: 70,
            retirement_age: 65,
            current_savings: 0.0,
            monthly_contribution: 100.0,
        };
        assert_eq!(saver.years_to_retirement(), 0);
    }

    #[test]
    fn unknown_asset_class_deserializes_as_other() {
        let class: AssetClass = serde_json::from_str("\"gold\"").expect("valid json");
        assert_eq!(class, AssetClass::Other);
        assert_eq!("Bonds".parse::<AssetClass>(), Ok(AssetClass::Bond));
        assert_eq!("timber".parse::<AssetClass>(), Ok(AssetClass::Other));
    }

    #[test]
    fn scenario_impacts_round_trip_with_class_keys() {
        let json = r#"{
            "id": "custom",
            "name": "Custom",
            "impacts": { "equity": -0.2, "bond": 0.01 },
            "shockDurationMonths": 6
        }"#;
        let scenario: StressScenario = serde_json::from_str(json).expect("valid scenario");
        assert_eq!(scenario.impacts.get(&AssetClass::Equity), Some(&-0.2));
        assert_eq!(scenario.recovery_duration_months, None);
        assert!(scenario.description.is_empty());
    }
}
