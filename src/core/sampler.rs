use std::f64::consts::PI;

use rand::SeedableRng;
use rand::distributions::{Distribution, Open01};
use rand::rngs::StdRng;

/// Source of uniform draws on the open interval (0, 1).
///
/// The engine never reaches for a process-global generator; every path is
/// handed its own source, so tests can substitute a scripted one.
pub trait UniformSource {
    fn next_open01(&mut self) -> f64;
}

/// Seeded `StdRng`, one per path.
pub struct SeededSource {
    inner: StdRng,
}

impl SeededSource {
    pub fn new(seed: u64) -> Self {
        Self {
            inner: StdRng::seed_from_u64(seed),
        }
    }

    pub fn for_path(base_seed: u64, path_index: u32) -> Self {
        Self::new(derive_path_seed(base_seed, path_index))
    }
}

impl UniformSource for SeededSource {
    fn next_open01(&mut self) -> f64 {
        Open01.sample(&mut self.inner)
    }
}

/// Replays a fixed list of uniforms, wrapping around at the end.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    values: Vec<f64>,
    cursor: usize,
}

impl ScriptedSource {
    /// Values are clamped into (0, 1) so the log in Box-Muller stays finite.
    pub fn new(values: Vec<f64>) -> Self {
        let values = if values.is_empty() {
            vec![0.5]
        } else {
            values
                .into_iter()
                .map(|v| v.clamp(f64::MIN_POSITIVE, 1.0 - f64::EPSILON))
                .collect()
        };
        Self { values, cursor: 0 }
    }
}

impl UniformSource for ScriptedSource {
    fn next_open01(&mut self) -> f64 {
        let v = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        v
    }
}

pub fn derive_path_seed(base_seed: u64, path_index: u32) -> u64 {
    splitmix64(base_seed ^ ((path_index as u64) << 17) ^ path_index as u64)
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Box-Muller: one standard normal from two independent uniforms.
pub fn standard_normal<S: UniformSource + ?Sized>(source: &mut S) -> f64 {
    let u1 = source.next_open01().max(1e-300);
    let u2 = source.next_open01();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

/// Annual return from a log-normal model:
/// `exp(mean - vol^2 / 2 + vol * z) - 1`, always greater than -1.
pub fn lognormal_return(mean: f64, volatility: f64, z: f64) -> f64 {
    (mean - volatility * volatility / 2.0 + volatility * z).exp() - 1.0
}

pub fn sample_return<S: UniformSource + ?Sized>(
    source: &mut S,
    mean_annual_return: f64,
    annual_volatility: f64,
) -> f64 {
    let z = standard_normal(source);
    lognormal_return(mean_annual_return, annual_volatility, z)
}
