pub mod aggregate;
pub mod commentary;
pub mod engine;
mod error;
pub mod portfolio;
pub mod projection;
pub mod risk;
pub mod sampler;
pub mod stress;
mod types;

pub use aggregate::{DEFAULT_PERCENTILES, aggregate};
pub use commentary::{
    COMMENTARY_FALLBACK, CommentaryError, CommentaryProvider, CommentaryRequest,
    UnavailableCommentary, commentary_or_fallback,
};
pub use engine::{SimulationRun, run, run_with_sources};
pub use error::{EngineError, Result};
pub use portfolio::{BALANCED_DEFAULT_BLEND, blend};
pub use projection::{Projection, run_projection};
pub use stress::{StressImpact, find_scenario, historical_scenarios, impact, timeline};
pub use types::{
    AggregateResult, AssetAllocation, AssetClass, FactorBetas, PercentileBand, PortfolioBlend,
    RiskConfig, RiskReport, SaverProfile, SimulationConfig, SimulationPath, SimulationPoint,
    StepSummary, StressPoint, StressScenario,
};
