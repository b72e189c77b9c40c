use serde::Serialize;

use super::types::{AssetAllocation, AssetClass, StressPoint, StressScenario};

struct HistoricalShock {
    id: &'static str,
    name: &'static str,
    description: &'static str,
    impacts: [(AssetClass, f64); 5],
    shock_months: u32,
    recovery_months: u32,
}

const HISTORICAL_SHOCKS: [HistoricalShock; 3] = [
    HistoricalShock {
        id: "2008-crisis",
        name: "2008 Financial Crisis",
        description: "Global financial crisis triggered by the housing market collapse",
        impacts: [
            (AssetClass::Equity, -0.56),
            (AssetClass::Bond, 0.05),
            (AssetClass::Reit, -0.67),
            (AssetClass::Crypto, -0.30),
            (AssetClass::Cash, 0.02),
        ],
        shock_months: 18,
        recovery_months: 48,
    },
    HistoricalShock {
        id: "covid-crash",
        name: "2020 COVID Crash",
        description: "Market reaction to global pandemic",
        impacts: [
            (AssetClass::Equity, -0.34),
            (AssetClass::Bond, 0.07),
            (AssetClass::Reit, -0.40),
            (AssetClass::Crypto, -0.50),
            (AssetClass::Cash, 0.01),
        ],
        shock_months: 2,
        recovery_months: 6,
    },
    HistoricalShock {
        id: "dot-com",
        name: "2000 Dot-com Bubble",
        description: "Tech stock bubble burst",
        impacts: [
            (AssetClass::Equity, -0.49),
            (AssetClass::Bond, 0.04),
            (AssetClass::Reit, -0.18),
            (AssetClass::Crypto, -0.30),
            (AssetClass::Cash, 0.03),
        ],
        shock_months: 24,
        recovery_months: 60,
    },
];

impl From<&HistoricalShock> for StressScenario {
    fn from(row: &HistoricalShock) -> Self {
        StressScenario {
            id: row.id.to_string(),
            name: row.name.to_string(),
            description: row.description.to_string(),
            impacts: row.impacts.iter().copied().collect(),
            shock_duration_months: row.shock_months,
            recovery_duration_months: Some(row.recovery_months),
        }
    }
}

/// Longest shock or recovery phase a timeline will trace, in months.
pub const MAX_SCENARIO_MONTHS: u32 = 1_200;

pub fn historical_scenarios() -> Vec<StressScenario> {
    HISTORICAL_SHOCKS.iter().map(StressScenario::from).collect()
}

pub fn find_scenario(id: &str) -> Option<StressScenario> {
    HISTORICAL_SHOCKS
        .iter()
        .find(|row| row.id == id)
        .map(StressScenario::from)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetImpact {
    pub asset_id: String,
    pub name: String,
    pub asset_class: AssetClass,
    pub impact_fraction: f64,
    pub value_change: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StressImpact {
    pub scenario_id: String,
    pub total_value: f64,
    pub total_value_change: f64,
    /// Change as a fraction of `total_value`; zero when the total is zero.
    pub total_change_fraction: f64,
    pub assets: Vec<AssetImpact>,
}

fn class_impact(scenario: &StressScenario, class: AssetClass) -> f64 {
    scenario.impacts.get(&class).copied().unwrap_or(0.0)
}

/// Sum over assets of `total_value * weight/100 * impact[class]`. Classes the
/// scenario does not mention contribute nothing.
pub fn impact(allocations: &[AssetAllocation], total_value: f64, scenario: &StressScenario) -> f64 {
    allocations
        .iter()
        .map(|a| total_value * (a.weight_percent / 100.0) * class_impact(scenario, a.asset_class))
        .sum()
}

pub fn impact_breakdown(
    allocations: &[AssetAllocation],
    total_value: f64,
    scenario: &StressScenario,
) -> StressImpact {
    let assets: Vec<AssetImpact> = allocations
        .iter()
        .map(|a| {
            let impact_fraction = class_impact(scenario, a.asset_class);
            AssetImpact {
                asset_id: a.id.clone(),
                name: a.name.clone(),
                asset_class: a.asset_class,
                impact_fraction,
                value_change: total_value * (a.weight_percent / 100.0) * impact_fraction,
            }
        })
        .collect();
    let total_value_change = assets.iter().map(|a| a.value_change).sum();
    let total_change_fraction = if total_value == 0.0 {
        0.0
    } else {
        total_value_change / total_value
    };

    StressImpact {
        scenario_id: scenario.id.clone(),
        total_value,
        total_value_change,
        total_change_fraction,
        assets,
    }
}

/// Month-by-month path through the scenario.
///
/// Month 0 is the unshocked value. The impact is spread evenly over the
/// shock months (a zero duration is treated as one month). If a recovery
/// period is given, the value then climbs evenly from the trough back to the
/// starting value; a scenario that only gains has no trough below the start
/// and stays at its shocked level. Each phase is clamped to
/// [`MAX_SCENARIO_MONTHS`].
pub fn timeline(
    allocations: &[AssetAllocation],
    total_value: f64,
    scenario: &StressScenario,
) -> Vec<StressPoint> {
    let total_impact = impact(allocations, total_value, scenario);
    let shock_months = scenario.shock_duration_months.clamp(1, MAX_SCENARIO_MONTHS);
    let recovery_months = scenario
        .recovery_duration_months
        .unwrap_or(0)
        .min(MAX_SCENARIO_MONTHS);

    let mut points = Vec::with_capacity(shock_months as usize + recovery_months as usize + 1);
    points.push(StressPoint {
        month: 0,
        value: total_value,
    });

    for month in 1..=shock_months {
        points.push(StressPoint {
            month,
            value: total_value + total_impact * month as f64 / shock_months as f64,
        });
    }

    let shocked = total_value + total_impact;
    let trough = shocked.min(total_value);
    let recovery_amount = total_value - trough;
    for step in 1..=recovery_months {
        points.push(StressPoint {
            month: shock_months + step,
            value: shocked + recovery_amount * step as f64 / recovery_months as f64,
        });
    }

    points
}
