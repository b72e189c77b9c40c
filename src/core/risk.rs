//! Summary risk statistics over a projected value series.
//!
//! The factor model here is a placeholder: each factor series is a fixed
//! linear transform of the portfolio's own returns rather than historical
//! factor data, and `alpha`/`r_squared` are illustrative constants. Swapping
//! in real factor returns and an OLS fit keeps the same signatures.

use super::types::{FactorBetas, RiskConfig, RiskReport, SimulationPoint};

pub const ILLUSTRATIVE_ALPHA: f64 = 0.015;
pub const ILLUSTRATIVE_R_SQUARED: f64 = 0.92;

/// `(scale, offset)` applied to the return series to build each factor.
const MARKET_FACTOR: (f64, f64) = (1.1, 0.001);
const SIZE_FACTOR: (f64, f64) = (0.3, 0.002);
const VALUE_FACTOR: (f64, f64) = (-0.2, 0.001);
const MOMENTUM_FACTOR: (f64, f64) = (0.4, 0.002);

/// Step-over-step growth of a value series. A zero previous value yields a
/// zero return.
pub fn returns_from_values(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .map(|w| if w[0] == 0.0 { 0.0 } else { (w[1] - w[0]) / w[0] })
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by N).
fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    (values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64).sqrt()
}

/// Mean excess return over its population standard deviation. Zero when the
/// series is empty or has no dispersion.
pub fn sharpe_ratio(returns: &[f64], risk_free_rate: f64) -> f64 {
    let excess: Vec<f64> = returns.iter().map(|r| r - risk_free_rate).collect();
    let sd = std_dev(&excess);
    if sd == 0.0 || !sd.is_finite() {
        return 0.0;
    }
    mean(&excess) / sd
}

/// Largest peak-to-trough fall as a fraction of the peak. Non-positive peaks
/// contribute no drawdown.
pub fn max_drawdown(values: &[f64]) -> f64 {
    let Some(&first) = values.first() else {
        return 0.0;
    };
    let mut peak = first;
    let mut worst = 0.0_f64;
    for &value in values {
        if value > peak {
            peak = value;
        }
        if peak > 0.0 {
            worst = worst.max((peak - value) / peak);
        }
    }
    worst
}

/// Historical VaR: the loss at index `floor((1 - confidence) * n)` of the
/// ascending returns, reported as a positive fraction.
pub fn value_at_risk(returns: &[f64], confidence: f64) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let mut sorted = returns.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let idx = (((1.0 - confidence) * sorted.len() as f64).floor().max(0.0) as usize)
        .min(sorted.len() - 1);
    -sorted[idx]
}

/// `cov(returns, factor) / var(factor)`, or zero for a flat factor.
fn beta(returns: &[f64], factor: &[f64]) -> f64 {
    let n = returns.len().min(factor.len());
    if n == 0 {
        return 0.0;
    }
    let mr = mean(&returns[..n]);
    let mf = mean(&factor[..n]);
    let covariance = (0..n)
        .map(|i| (returns[i] - mr) * (factor[i] - mf))
        .sum::<f64>()
        / n as f64;
    let variance = factor[..n].iter().map(|f| (f - mf).powi(2)).sum::<f64>() / n as f64;
    if variance == 0.0 || !variance.is_finite() {
        return 0.0;
    }
    covariance / variance
}

fn synthetic_factor(returns: &[f64], (scale, offset): (f64, f64)) -> Vec<f64> {
    returns.iter().map(|r| r * scale + offset).collect()
}

pub fn factor_betas(returns: &[f64]) -> FactorBetas {
    let exposure = |spec| beta(returns, &synthetic_factor(returns, spec));
    FactorBetas {
        market: exposure(MARKET_FACTOR),
        size: exposure(SIZE_FACTOR),
        value: exposure(VALUE_FACTOR),
        momentum: exposure(MOMENTUM_FACTOR),
    }
}

/// Builds a report from a return series and the value series it came from.
/// Drawdown is measured on `values`; everything else on `returns`.
pub fn compute(returns: &[f64], values: &[f64], config: &RiskConfig) -> RiskReport {
    RiskReport {
        sharpe_ratio: sharpe_ratio(returns, config.risk_free_rate),
        max_drawdown_fraction: max_drawdown(values),
        value_at_risk_fraction: value_at_risk(returns, config.var_confidence),
        factor_betas: factor_betas(returns),
        alpha: ILLUSTRATIVE_ALPHA,
        r_squared: ILLUSTRATIVE_R_SQUARED,
    }
}

pub fn report_for_path(points: &[SimulationPoint], config: &RiskConfig) -> RiskReport {
    let values: Vec<f64> = points.iter().map(|p| p.nominal_value).collect();
    let returns = returns_from_values(&values);
    compute(&returns, &values, config)
}
