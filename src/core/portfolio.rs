use serde::Serialize;

use super::types::{AssetAllocation, AssetClass, PortfolioBlend};

const DEFAULT_EQUITY_RETURN: f64 = 0.08;
const DEFAULT_BOND_RETURN: f64 = 0.04;
const DEFAULT_REIT_RETURN: f64 = 0.06;
const DEFAULT_CASH_RETURN: f64 = 0.02;

const DEFAULT_EQUITY_VOL: f64 = 0.15;
const DEFAULT_BOND_VOL: f64 = 0.05;
const DEFAULT_REIT_VOL: f64 = 0.12;
const DEFAULT_CASH_VOL: f64 = 0.01;

const DEFAULT_WEIGHTS: [(AssetClass, f64, f64, f64); 4] = [
    (AssetClass::Equity, 0.60, DEFAULT_EQUITY_RETURN, DEFAULT_EQUITY_VOL),
    (AssetClass::Bond, 0.30, DEFAULT_BOND_RETURN, DEFAULT_BOND_VOL),
    (AssetClass::Reit, 0.05, DEFAULT_REIT_RETURN, DEFAULT_REIT_VOL),
    (AssetClass::Cash, 0.05, DEFAULT_CASH_RETURN, DEFAULT_CASH_VOL),
];

/// Default `(expected return, volatility)` for the classes the balanced
/// default uses. Other classes have no house view.
pub fn default_assumptions(class: AssetClass) -> Option<(f64, f64)> {
    DEFAULT_WEIGHTS
        .iter()
        .find(|(c, ..)| *c == class)
        .map(|&(_, _, ret, vol)| (ret, vol))
}

/// Blend used when an allocation is empty or its weights sum to zero:
/// 60% equity, 30% bonds, 5% REITs, 5% cash at the default assumptions.
pub const BALANCED_DEFAULT_BLEND: PortfolioBlend = PortfolioBlend {
    expected_return: DEFAULT_EQUITY_RETURN * 0.60
        + DEFAULT_BOND_RETURN * 0.30
        + DEFAULT_REIT_RETURN * 0.05
        + DEFAULT_CASH_RETURN * 0.05,
    risk: DEFAULT_EQUITY_VOL * 0.60
        + DEFAULT_BOND_VOL * 0.30
        + DEFAULT_REIT_VOL * 0.05
        + DEFAULT_CASH_VOL * 0.05,
};

/// The balanced default as an explicit allocation list.
pub fn balanced_default_allocation() -> Vec<AssetAllocation> {
    DEFAULT_WEIGHTS
        .iter()
        .map(|&(class, weight, expected_return, vol)| {
            let label = match class {
                AssetClass::Equity => "Global equity",
                AssetClass::Bond => "Bonds",
                AssetClass::Reit => "REITs",
                _ => "Cash",
            };
            AssetAllocation {
                id: format!("default-{}", label.to_ascii_lowercase().replace(' ', "-")),
                name: label.to_string(),
                weight_percent: weight * 100.0,
                expected_annual_return: expected_return,
                annual_volatility: vol,
                asset_class: class,
            }
        })
        .collect()
}

/// Linear blend of per-asset return and volatility, weighted by allocation.
///
/// Cross-asset correlation is ignored, so `risk` is an upper bound on the
/// volatility a correlation-aware model would report.
pub fn blend(allocations: &[AssetAllocation]) -> PortfolioBlend {
    let total_weight: f64 = allocations.iter().map(|a| a.weight_percent).sum();
    if allocations.is_empty() || total_weight == 0.0 || !total_weight.is_finite() {
        return BALANCED_DEFAULT_BLEND;
    }

    let expected_return = allocations
        .iter()
        .map(|a| a.expected_annual_return * a.weight_percent / total_weight)
        .sum();
    let risk = allocations
        .iter()
        .map(|a| a.annual_volatility * a.weight_percent / total_weight)
        .sum();

    PortfolioBlend {
        expected_return,
        risk,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrontierPoint {
    pub risk: f64,
    pub expected_return: f64,
    pub current: bool,
}

/// Illustrative risk/return curve around the current blend for charting.
/// Point `k` scales risk by `k/10` and return by `sqrt(k/10)`; the current
/// portfolio is appended as the last point. Not an optimisation.
pub fn frontier_sketch(current: PortfolioBlend, points: usize) -> Vec<FrontierPoint> {
    let mut curve = Vec::with_capacity(points + 1);
    for k in 1..=points {
        let scale = k as f64 / 10.0;
        curve.push(FrontierPoint {
            risk: current.risk * scale,
            expected_return: current.expected_return * scale.sqrt(),
            current: false,
        });
    }
    curve.push(FrontierPoint {
        risk: current.risk,
        expected_return: current.expected_return,
        current: true,
    });
    curve
}
