use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use tracing::debug;

use super::error::{EngineError, Result};
use super::portfolio::blend;
use super::sampler::{SeededSource, UniformSource, sample_return};
use super::types::{
    AssetAllocation, PortfolioBlend, SaverProfile, SimulationConfig, SimulationPath,
    SimulationPoint,
};

/// Projections never run past this age.
pub const MAX_PROJECTION_AGE: u32 = 85;

/// Simulated value never drops below this fraction of money paid in.
///
/// This is a modelling policy, not a market property: a pension pot is
/// assumed never to be wiped out by a single year's draw.
pub const CONTRIBUTION_FLOOR_FRACTION: f64 = 0.5;

#[derive(Debug, Clone)]
pub struct SimulationRun {
    pub blend: PortfolioBlend,
    pub capped_years: u32,
    pub years_to_retirement: u32,
    pub paths: Vec<SimulationPath>,
}

#[derive(Debug, Clone, Copy)]
struct PathParams {
    blend: PortfolioBlend,
    current_age: u32,
    opening_balance: f64,
    annual_contribution: f64,
    years_to_retirement: u32,
    capped_years: u32,
    inflation_rate: f64,
}

pub fn capped_years(current_age: u32, years_to_project: u32) -> u32 {
    years_to_project.min(MAX_PROJECTION_AGE.saturating_sub(current_age))
}

/// Checks caller inputs and returns the capped horizon in years.
pub fn validate(saver: &SaverProfile, config: &SimulationConfig) -> Result<u32> {
    if config.num_paths == 0 {
        return Err(EngineError::InvalidPathCount);
    }
    if !saver.current_savings.is_finite() {
        return Err(EngineError::NonFinite {
            field: "currentSavings",
        });
    }
    if !saver.monthly_contribution.is_finite() {
        return Err(EngineError::NonFinite {
            field: "monthlyContribution",
        });
    }
    if saver.current_savings < 0.0 {
        return Err(EngineError::NegativeAmount {
            field: "currentSavings",
            value: saver.current_savings,
        });
    }
    if saver.monthly_contribution < 0.0 {
        return Err(EngineError::NegativeAmount {
            field: "monthlyContribution",
            value: saver.monthly_contribution,
        });
    }
    if !config.inflation_rate.is_finite() {
        return Err(EngineError::NonFinite {
            field: "inflationRate",
        });
    }
    if config.inflation_rate <= -1.0 {
        return Err(EngineError::InvalidInflation(config.inflation_rate));
    }

    let years = capped_years(saver.current_age, config.years_to_project);
    if years == 0 {
        return Err(EngineError::EmptyHorizon {
            current_age: saver.current_age,
            years_to_project: config.years_to_project,
        });
    }
    Ok(years)
}

/// Runs the projection with per-path generators seeded from `config.seed`,
/// or from OS entropy when no seed is given.
pub fn run(
    allocations: &[AssetAllocation],
    saver: &SaverProfile,
    config: &SimulationConfig,
) -> Result<SimulationRun> {
    let base_seed = config.seed.unwrap_or_else(rand::random);
    run_with_sources(allocations, saver, config, |path_index| {
        SeededSource::for_path(base_seed, path_index)
    })
}

/// Runs the projection, asking `make_source` for one independent source per
/// path. Paths are generated in parallel and joined before returning.
pub fn run_with_sources<F, S>(
    allocations: &[AssetAllocation],
    saver: &SaverProfile,
    config: &SimulationConfig,
    make_source: F,
) -> Result<SimulationRun>
where
    F: Fn(u32) -> S + Sync,
    S: UniformSource,
{
    let capped_years = validate(saver, config)?;
    let blend = blend(allocations);
    let params = PathParams {
        blend,
        current_age: saver.current_age,
        opening_balance: saver.current_savings,
        annual_contribution: saver.annual_contribution(),
        years_to_retirement: saver.years_to_retirement(),
        capped_years,
        inflation_rate: config.inflation_rate,
    };

    debug!(
        num_paths = config.num_paths,
        capped_years,
        years_to_retirement = params.years_to_retirement,
        expected_return = blend.expected_return,
        risk = blend.risk,
        "starting monte carlo run"
    );

    let generate = || {
        (0..config.num_paths)
            .into_par_iter()
            .map(|path_index| {
                let mut source = make_source(path_index);
                simulate_path(&params, &mut source)
            })
            .collect::<Vec<_>>()
    };

    let paths = match config.workers {
        Some(workers) => ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| EngineError::WorkerPool(e.to_string()))?
            .install(generate),
        None => generate(),
    };

    Ok(SimulationRun {
        blend,
        capped_years,
        years_to_retirement: params.years_to_retirement,
        paths,
    })
}

/// Step 0 is the opening balance. Each later step adds a year of
/// contributions (while still working), then applies that year's return.
///
/// Contributions land in years `1..=min(years_to_retirement, capped_years)`.
/// When retirement falls beyond the capped horizon, the path therefore
/// carries `capped_years` contributions, not `capped_years + 1`.
fn simulate_path<S: UniformSource>(params: &PathParams, source: &mut S) -> SimulationPath {
    let mut path = Vec::with_capacity(params.capped_years as usize + 1);
    let mut current_value = params.opening_balance;
    let mut cumulative_contributions = params.opening_balance;
    let mut cumulative_returns = 0.0;

    path.push(SimulationPoint {
        age_at_step: params.current_age,
        nominal_value: current_value,
        real_value: current_value,
        cumulative_contributions,
        cumulative_returns,
    });

    for year in 1..=params.capped_years {
        if year <= params.years_to_retirement {
            current_value += params.annual_contribution;
            cumulative_contributions += params.annual_contribution;
        }

        let year_return = sample_return(source, params.blend.expected_return, params.blend.risk);
        let investment_return = current_value * year_return;
        current_value += investment_return;
        cumulative_returns += investment_return;

        current_value = current_value.max(cumulative_contributions * CONTRIBUTION_FLOOR_FRACTION);

        let real_value = current_value / (1.0 + params.inflation_rate).powi(year as i32);
        path.push(SimulationPoint {
            age_at_step: params.current_age + year,
            nominal_value: current_value,
            real_value,
            cumulative_contributions,
            cumulative_returns,
        });
    }

    path
}
