use super::error::{EngineError, Result};
use super::types::{AggregateResult, PercentileBand, SimulationPath, SimulationPoint, StepSummary};

pub const DEFAULT_PERCENTILES: [f64; 5] = [0.05, 0.25, 0.5, 0.75, 0.95];

/// Reduces a path ensemble to per-step percentile bands.
///
/// Every step is sorted independently, so a band is a per-step statistic and
/// generally not a path any single simulation followed. The index for
/// percentile `p` is `floor(n * p)`, clamped to the last element.
pub fn aggregate(paths: Vec<SimulationPath>, percentiles: &[f64]) -> Result<AggregateResult> {
    for &p in percentiles {
        if !(0.0..=1.0).contains(&p) {
            return Err(EngineError::InvalidPercentile(p));
        }
    }
    let Some(first) = paths.first() else {
        return Err(EngineError::EmptyEnsemble);
    };

    let steps = paths.iter().map(Vec::len).min().unwrap_or(0);
    let n = paths.len();
    let template: Vec<SimulationPoint> = first[..steps].to_vec();

    let mut bands: Vec<PercentileBand> = percentiles
        .iter()
        .map(|&percentile| PercentileBand {
            percentile,
            points: Vec::with_capacity(steps),
        })
        .collect();
    let mut summary = Vec::with_capacity(steps);

    let mut nominal = Vec::with_capacity(n);
    let mut real = Vec::with_capacity(n);
    for (step, reference) in template.iter().enumerate() {
        nominal.clear();
        real.clear();
        nominal.extend(paths.iter().map(|path| path[step].nominal_value));
        real.extend(paths.iter().map(|path| path[step].real_value));
        nominal.sort_by(|a, b| a.total_cmp(b));
        real.sort_by(|a, b| a.total_cmp(b));

        let contributions = reference.cumulative_contributions;
        for band in &mut bands {
            let idx = percentile_index(n, band.percentile);
            band.points.push(SimulationPoint {
                age_at_step: reference.age_at_step,
                nominal_value: nominal[idx],
                real_value: real[idx],
                cumulative_contributions: contributions,
                cumulative_returns: nominal[idx] - contributions,
            });
        }

        summary.push(StepSummary {
            age_at_step: reference.age_at_step,
            mean_nominal_value: nominal.iter().sum::<f64>() / n as f64,
            mean_real_value: real.iter().sum::<f64>() / n as f64,
            cumulative_contributions: contributions,
        });
    }

    Ok(AggregateResult {
        bands,
        summary,
        paths,
    })
}

fn percentile_index(n: usize, p: f64) -> usize {
    ((n as f64 * p).floor() as usize).min(n - 1)
}

impl AggregateResult {
    pub fn band(&self, percentile: f64) -> Option<&PercentileBand> {
        self.bands
            .iter()
            .find(|b| (b.percentile - percentile).abs() < 1e-9)
    }

    pub fn median(&self) -> Option<&PercentileBand> {
        self.band(0.5)
    }
}
