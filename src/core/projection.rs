use tracing::debug;

use super::aggregate::aggregate;
use super::commentary::CommentaryRequest;
use super::engine;
use super::error::Result;
use super::risk::{self, report_for_path};
use super::types::{
    AggregateResult, AssetAllocation, PortfolioBlend, RiskConfig, RiskReport, SaverProfile,
    SimulationConfig,
};

#[derive(Debug, Clone)]
pub struct Projection {
    pub blend: PortfolioBlend,
    pub capped_years: u32,
    pub years_to_retirement: u32,
    pub aggregate: AggregateResult,
    pub risk: RiskReport,
}

/// Blend, simulate, aggregate, then score the median band.
///
/// When `percentiles` has no 0.5 entry the risk report is taken from the
/// per-step mean series instead.
pub fn run_projection(
    allocations: &[AssetAllocation],
    saver: &SaverProfile,
    config: &SimulationConfig,
    percentiles: &[f64],
    risk_config: &RiskConfig,
) -> Result<Projection> {
    let run = engine::run(allocations, saver, config)?;
    let aggregate = aggregate(run.paths, percentiles)?;

    let risk = match aggregate.median() {
        Some(median) => report_for_path(&median.points, risk_config),
        None => {
            let values: Vec<f64> = aggregate
                .summary
                .iter()
                .map(|s| s.mean_nominal_value)
                .collect();
            risk::compute(&risk::returns_from_values(&values), &values, risk_config)
        }
    };

    debug!(
        sharpe = risk.sharpe_ratio,
        max_drawdown = risk.max_drawdown_fraction,
        value_at_risk = risk.value_at_risk_fraction,
        "projection complete"
    );

    Ok(Projection {
        blend: run.blend,
        capped_years: run.capped_years,
        years_to_retirement: run.years_to_retirement,
        aggregate,
        risk,
    })
}

impl Projection {
    fn terminal_value(&self, percentile: f64) -> f64 {
        self.aggregate
            .band(percentile)
            .and_then(|b| b.points.last())
            .map(|p| p.nominal_value)
            .or_else(|| self.aggregate.summary.last().map(|s| s.mean_nominal_value))
            .unwrap_or(0.0)
    }

    pub fn commentary_request(&self) -> CommentaryRequest {
        CommentaryRequest {
            horizon_years: self.capped_years,
            median_terminal_value: self.terminal_value(0.5),
            p95_terminal_value: self.terminal_value(0.95),
            p05_terminal_value: self.terminal_value(0.05),
            risk: self.risk,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::aggregate::DEFAULT_PERCENTILES;

    fn saver() -> SaverProfile {
        SaverProfile {
            current_age: 50,
            retirement_age: 60,
            current_savings: 20_000.0,
            monthly_contribution: 250.0,
        }
    }

    fn config() -> SimulationConfig {
        SimulationConfig {
            num_paths: 200,
            years_to_project: 20,
            inflation_rate: 0.02,
            seed: Some(9),
            workers: Some(2),
        }
    }

    #[test]
    fn empty_allocation_projects_with_balanced_default() {
        let projection = run_projection(
            &[],
            &saver(),
            &config(),
            &DEFAULT_PERCENTILES,
            &RiskConfig::default(),
        )
        .expect("valid projection");
        assert!((projection.blend.expected_return - 0.064).abs() < 1e-12);
        assert_eq!(projection.capped_years, 20);
        assert_eq!(projection.aggregate.bands.len(), 5);
        assert_eq!(projection.aggregate.paths.len(), 200);
        assert!(projection.risk.sharpe_ratio.is_finite());

        let request = projection.commentary_request();
        assert_eq!(request.horizon_years, 20);
        assert!(request.p05_terminal_value <= request.median_terminal_value);
        assert!(request.median_terminal_value <= request.p95_terminal_value);
    }

    #[test]
    fn risk_falls_back_to_mean_series_without_median_band() {
        let projection = run_projection(
            &[],
            &saver(),
            &config(),
            &[0.1, 0.9],
            &RiskConfig::default(),
        )
        .expect("valid projection");
        assert!(projection.aggregate.median().is_none());
        assert!(projection.risk.max_drawdown_fraction >= 0.0);
        assert!(projection.commentary_request().median_terminal_value > 0.0);
    }

    #[test]
    fn invalid_inputs_surface_engine_errors() {
        let mut bad = config();
        bad.num_paths = 0;
        assert!(
            run_projection(&[], &saver(), &bad, &DEFAULT_PERCENTILES, &RiskConfig::default())
                .is_err()
        );
    }
}
