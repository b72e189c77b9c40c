use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::{Json, Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::core::portfolio::{
    FrontierPoint, balanced_default_allocation, default_assumptions, frontier_sketch,
};
use crate::core::stress::{MAX_SCENARIO_MONTHS, impact_breakdown};
use crate::core::{
    AssetAllocation, AssetClass, CommentaryProvider, DEFAULT_PERCENTILES, PortfolioBlend,
    Projection, RiskConfig, RiskReport, SaverProfile, SimulationConfig, SimulationPoint,
    StressImpact, StressPoint, StressScenario, UnavailableCommentary, commentary_or_fallback,
    find_scenario, historical_scenarios, run_projection, timeline,
};

const DEFAULT_CURRENT_AGE: u32 = 30;
const DEFAULT_RETIREMENT_AGE: u32 = 65;
const DEFAULT_SAVINGS: f64 = 100_000.0;
const DEFAULT_MONTHLY_CONTRIBUTION: f64 = 1_000.0;
const DEFAULT_TOTAL_VALUE: f64 = 1_000_000.0;
const DEFAULT_CUSTOM_SHOCK_MONTHS: u32 = 12;
const MAX_PATHS: u32 = 100_000;
const FRONTIER_POINTS: usize = 20;
const COMMENTARY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Parser, Debug)]
#[command(
    name = "saffron",
    about = "Monte Carlo pension projection, risk metrics and portfolio stress testing"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        env = "SAFFRON_LOG_LEVEL",
        default_value = "info",
        help = "Log filter used when RUST_LOG is unset"
    )]
    pub log_level: String,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the JSON API
    Serve {
        #[arg(long, env = "SAFFRON_PORT", default_value_t = 8080)]
        port: u16,
        #[arg(long, help = "Worker threads per simulation; defaults to all cores")]
        workers: Option<usize>,
    },
    /// Run one projection and print it as JSON
    Simulate(SimulateArgs),
    /// Apply a stress scenario and print the impact as JSON
    Stress(StressArgs),
    /// List the built-in historical scenarios
    Scenarios,
}

#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    #[arg(long, default_value_t = DEFAULT_CURRENT_AGE)]
    current_age: u32,
    #[arg(long, default_value_t = DEFAULT_RETIREMENT_AGE)]
    retirement_age: u32,
    #[arg(long, default_value_t = DEFAULT_SAVINGS)]
    current_savings: f64,
    #[arg(long, default_value_t = DEFAULT_MONTHLY_CONTRIBUTION)]
    monthly_contribution: f64,
    #[arg(
        long = "asset",
        value_parser = parse_asset_spec,
        help = "class:weight[:return:volatility], percentages, e.g. equity:60:8:15; repeatable. Defaults to a 60/30/5/5 balanced mix"
    )]
    assets: Vec<AssetAllocation>,
    #[arg(long, default_value_t = 1_000, help = "Number of simulated paths, at most 100000")]
    num_paths: u32,
    #[arg(
        long,
        help = "Years to project; defaults to max(40, retirement age - current age + 20)"
    )]
    years_to_project: Option<u32>,
    #[arg(long, default_value_t = 2.0, help = "Annual inflation in percent")]
    inflation_rate: f64,
    #[arg(long, default_value_t = 2.0, help = "Risk-free rate in percent")]
    risk_free_rate: f64,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    workers: Option<usize>,
    #[arg(long, default_value_t = false, help = "Include every simulated path")]
    include_paths: bool,
}

#[derive(Args, Debug, Clone)]
pub struct StressArgs {
    #[arg(long, help = "Historical scenario id; omit to build a custom scenario")]
    scenario: Option<String>,
    #[arg(long, default_value_t = DEFAULT_TOTAL_VALUE)]
    total_value: f64,
    #[arg(long = "asset", value_parser = parse_asset_spec)]
    assets: Vec<AssetAllocation>,
    #[arg(
        long = "impact",
        value_parser = parse_impact_spec,
        help = "class:percent for a custom scenario, e.g. equity:-20; repeatable"
    )]
    impacts: Vec<(AssetClass, f64)>,
    #[arg(long, default_value_t = DEFAULT_CUSTOM_SHOCK_MONTHS)]
    shock_months: u32,
    #[arg(long)]
    recovery_months: Option<u32>,
}

fn parse_asset_spec(spec: &str) -> Result<AssetAllocation, String> {
    let parts: Vec<&str> = spec.split(':').collect();
    if parts.len() != 2 && parts.len() != 4 {
        return Err(format!(
            "asset '{spec}' must be class:weight or class:weight:return:volatility"
        ));
    }
    let class: AssetClass = parts[0].parse()?;
    let number = |s: &str, what: &str| {
        s.trim()
            .parse::<f64>()
            .map_err(|_| format!("asset '{spec}' has an invalid {what}"))
    };
    let weight_percent = number(parts[1], "weight")?;
    let (expected_annual_return, annual_volatility) = if parts.len() == 4 {
        (
            number(parts[2], "return")? / 100.0,
            number(parts[3], "volatility")? / 100.0,
        )
    } else {
        default_assumptions(class).ok_or_else(|| {
            format!("asset '{spec}' needs explicit return and volatility for this class")
        })?
    };

    let label = parts[0].trim().to_ascii_lowercase();
    Ok(AssetAllocation {
        id: label.clone(),
        name: label,
        weight_percent,
        expected_annual_return,
        annual_volatility,
        asset_class: class,
    })
}

fn parse_impact_spec(spec: &str) -> Result<(AssetClass, f64), String> {
    let (class, pct) = spec
        .split_once(':')
        .ok_or_else(|| format!("impact '{spec}' must be class:percent"))?;
    let pct = pct
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("impact '{spec}' has an invalid percent"))?;
    Ok((class.parse()?, pct / 100.0))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    current_age: Option<u32>,
    retirement_age: Option<u32>,
    current_savings: Option<f64>,
    monthly_contribution: Option<f64>,
    allocations: Option<Vec<AssetAllocation>>,
    num_paths: Option<u32>,
    years_to_project: Option<u32>,
    inflation_rate: Option<f64>,
    seed: Option<u64>,
    percentiles: Option<Vec<f64>>,
    risk_free_rate: Option<f64>,
    var_confidence: Option<f64>,
    include_paths: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct StressPayload {
    allocations: Vec<AssetAllocation>,
    total_value: Option<f64>,
    scenario_id: Option<String>,
    scenario: Option<StressScenario>,
}

#[derive(Debug, Clone)]
struct SimulateRequest {
    allocations: Vec<AssetAllocation>,
    saver: SaverProfile,
    config: SimulationConfig,
    percentiles: Vec<f64>,
    risk: RiskConfig,
    include_paths: bool,
}

#[derive(Debug, Clone)]
struct StressRequest {
    allocations: Vec<AssetAllocation>,
    total_value: f64,
    scenario: StressScenario,
}

/// A point rounded to whole currency units for display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct DisplayPoint {
    age: u32,
    nominal_value: f64,
    real_value: f64,
    contributions: f64,
    returns: f64,
}

impl From<&SimulationPoint> for DisplayPoint {
    fn from(p: &SimulationPoint) -> Self {
        Self {
            age: p.age_at_step,
            nominal_value: p.nominal_value.round(),
            real_value: p.real_value.round(),
            contributions: p.cumulative_contributions.round(),
            returns: p.cumulative_returns.round(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct DisplayBand {
    percentile: f64,
    points: Vec<DisplayPoint>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulateResponse {
    blend: PortfolioBlend,
    capped_years: u32,
    years_to_retirement: u32,
    bands: Vec<DisplayBand>,
    risk_report: RiskReport,
    frontier: Vec<FrontierPoint>,
    commentary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    paths: Option<Vec<Vec<DisplayPoint>>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StressResponse {
    scenario: StressScenario,
    impact: StressImpact,
    timeline: Vec<StressPoint>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub struct AppState<P> {
    pub commentary: P,
    pub commentary_timeout: Duration,
    pub workers: Option<usize>,
}

fn check_num_paths(num_paths: u32) -> Result<u32, String> {
    if num_paths > MAX_PATHS {
        return Err(format!("numPaths must be <= {MAX_PATHS}, got {num_paths}"));
    }
    Ok(num_paths)
}

fn check_scenario_months(scenario: &StressScenario) -> Result<(), String> {
    if scenario.shock_duration_months > MAX_SCENARIO_MONTHS {
        return Err(format!(
            "shockDurationMonths must be <= {MAX_SCENARIO_MONTHS}, got {}",
            scenario.shock_duration_months
        ));
    }
    match scenario.recovery_duration_months {
        Some(months) if months > MAX_SCENARIO_MONTHS => Err(format!(
            "recoveryDurationMonths must be <= {MAX_SCENARIO_MONTHS}, got {months}"
        )),
        _ => Ok(()),
    }
}

fn default_years_to_project(current_age: u32, retirement_age: u32) -> u32 {
    40u32.max(retirement_age.saturating_sub(current_age) + 20)
}

fn simulate_request_from_payload(
    payload: SimulatePayload,
    workers: Option<usize>,
) -> Result<SimulateRequest, String> {
    let current_age = payload.current_age.unwrap_or(DEFAULT_CURRENT_AGE);
    let retirement_age = payload.retirement_age.unwrap_or(DEFAULT_RETIREMENT_AGE);
    let defaults = SimulationConfig::default();
    let risk_defaults = RiskConfig::default();

    let num_paths = check_num_paths(payload.num_paths.unwrap_or(defaults.num_paths))?;
    let var_confidence = payload.var_confidence.unwrap_or(risk_defaults.var_confidence);
    if !(0.0..1.0).contains(&var_confidence) {
        return Err("varConfidence must be in [0, 1)".to_string());
    }

    Ok(SimulateRequest {
        allocations: payload.allocations.unwrap_or_default(),
        saver: SaverProfile {
            current_age,
            retirement_age,
            current_savings: payload.current_savings.unwrap_or(DEFAULT_SAVINGS),
            monthly_contribution: payload
                .monthly_contribution
                .unwrap_or(DEFAULT_MONTHLY_CONTRIBUTION),
        },
        config: SimulationConfig {
            num_paths,
            years_to_project: payload
                .years_to_project
                .unwrap_or_else(|| default_years_to_project(current_age, retirement_age)),
            inflation_rate: payload.inflation_rate.unwrap_or(defaults.inflation_rate),
            seed: payload.seed,
            workers,
        },
        percentiles: payload
            .percentiles
            .unwrap_or_else(|| DEFAULT_PERCENTILES.to_vec()),
        risk: RiskConfig {
            risk_free_rate: payload.risk_free_rate.unwrap_or(risk_defaults.risk_free_rate),
            var_confidence,
        },
        include_paths: payload.include_paths.unwrap_or(false),
    })
}

fn simulate_request_from_args(args: SimulateArgs) -> Result<SimulateRequest, String> {
    let num_paths = check_num_paths(args.num_paths)?;
    let allocations = if args.assets.is_empty() {
        balanced_default_allocation()
    } else {
        args.assets
    };
    Ok(SimulateRequest {
        allocations,
        saver: SaverProfile {
            current_age: args.current_age,
            retirement_age: args.retirement_age,
            current_savings: args.current_savings,
            monthly_contribution: args.monthly_contribution,
        },
        config: SimulationConfig {
            num_paths,
            years_to_project: args.years_to_project.unwrap_or_else(|| {
                default_years_to_project(args.current_age, args.retirement_age)
            }),
            inflation_rate: args.inflation_rate / 100.0,
            seed: args.seed,
            workers: args.workers,
        },
        percentiles: DEFAULT_PERCENTILES.to_vec(),
        risk: RiskConfig {
            risk_free_rate: args.risk_free_rate / 100.0,
            ..RiskConfig::default()
        },
        include_paths: args.include_paths,
    })
}

fn stress_request_from_payload(payload: StressPayload) -> Result<StressRequest, String> {
    let total_value = payload.total_value.unwrap_or(DEFAULT_TOTAL_VALUE);
    if !total_value.is_finite() || total_value < 0.0 {
        return Err("totalValue must be a finite number >= 0".to_string());
    }
    let scenario = match (payload.scenario, payload.scenario_id) {
        (Some(scenario), _) => scenario,
        (None, Some(id)) => {
            find_scenario(&id).ok_or_else(|| format!("unknown scenario '{id}'"))?
        }
        (None, None) => return Err("either scenario or scenarioId is required".to_string()),
    };
    check_scenario_months(&scenario)?;
    Ok(StressRequest {
        allocations: payload.allocations,
        total_value,
        scenario,
    })
}

fn stress_request_from_args(args: StressArgs) -> Result<StressRequest, String> {
    let scenario = match args.scenario {
        Some(id) => find_scenario(&id).ok_or_else(|| format!("unknown scenario '{id}'"))?,
        None => StressScenario {
            id: "custom".to_string(),
            name: "Custom scenario".to_string(),
            description: String::new(),
            impacts: args.impacts.into_iter().collect(),
            shock_duration_months: args.shock_months,
            recovery_duration_months: args.recovery_months,
        },
    };
    stress_request_from_payload(StressPayload {
        allocations: args.assets,
        total_value: Some(args.total_value),
        scenario_id: None,
        scenario: Some(scenario),
    })
}

fn build_simulate_response(
    projection: &Projection,
    include_paths: bool,
    commentary: String,
) -> SimulateResponse {
    SimulateResponse {
        blend: projection.blend,
        capped_years: projection.capped_years,
        years_to_retirement: projection.years_to_retirement,
        bands: projection
            .aggregate
            .bands
            .iter()
            .map(|band| DisplayBand {
                percentile: band.percentile,
                points: band.points.iter().map(DisplayPoint::from).collect(),
            })
            .collect(),
        risk_report: projection.risk,
        frontier: frontier_sketch(projection.blend, FRONTIER_POINTS),
        commentary,
        paths: include_paths.then(|| {
            projection
                .aggregate
                .paths
                .iter()
                .map(|path| path.iter().map(DisplayPoint::from).collect())
                .collect()
        }),
    }
}

fn build_stress_response(request: StressRequest) -> StressResponse {
    let mut impact = impact_breakdown(&request.allocations, request.total_value, &request.scenario);
    impact.total_value_change = impact.total_value_change.round();
    for asset in &mut impact.assets {
        asset.value_change = asset.value_change.round();
    }
    let timeline = timeline(&request.allocations, request.total_value, &request.scenario)
        .into_iter()
        .map(|p| StressPoint {
            month: p.month,
            value: p.value.round(),
        })
        .collect();
    StressResponse {
        scenario: request.scenario,
        impact,
        timeline,
    }
}

async fn simulate<P: CommentaryProvider>(
    request: SimulateRequest,
    provider: &P,
    commentary_timeout: Duration,
) -> Result<SimulateResponse, String> {
    let include_paths = request.include_paths;
    let projection = tokio::task::spawn_blocking(move || {
        run_projection(
            &request.allocations,
            &request.saver,
            &request.config,
            &request.percentiles,
            &request.risk,
        )
    })
    .await
    .map_err(|e| format!("simulation task failed: {e}"))?
    .map_err(|e| e.to_string())?;

    let commentary = commentary_or_fallback(
        provider,
        &projection.commentary_request(),
        commentary_timeout,
    )
    .await;
    Ok(build_simulate_response(&projection, include_paths, commentary))
}

pub fn router<P: CommentaryProvider + 'static>(state: AppState<P>) -> Router {
    Router::new()
        .route("/api/simulate", post(simulate_handler::<P>))
        .route("/api/scenarios", get(scenarios_handler))
        .route("/api/scenarios/:id", get(scenario_handler))
        .route("/api/stress", post(stress_handler))
        .fallback(not_found_handler)
        .with_state(Arc::new(state))
}

pub async fn run_http_server(port: u16, workers: Option<usize>) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = router(AppState {
        commentary: UnavailableCommentary,
        commentary_timeout: COMMENTARY_TIMEOUT,
        workers,
    });

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "saffron HTTP API listening");

    axum::serve(listener, app).await
}

/// Runs one CLI command to completion. Errors come back as display strings.
pub async fn run_cli(command: Command) -> Result<(), String> {
    match command {
        Command::Serve { port, workers } => run_http_server(port, workers)
            .await
            .map_err(|e| format!("server error: {e}")),
        Command::Simulate(args) => {
            let request = simulate_request_from_args(args)?;
            let response = simulate(request, &UnavailableCommentary, COMMENTARY_TIMEOUT).await?;
            print_json(&response)
        }
        Command::Stress(args) => {
            let request = stress_request_from_args(args)?;
            print_json(&build_stress_response(request))
        }
        Command::Scenarios => print_json(&historical_scenarios()),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(())
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn simulate_handler<P: CommentaryProvider + 'static>(
    State(state): State<Arc<AppState<P>>>,
    Json(payload): Json<SimulatePayload>,
) -> Response {
    let request = match simulate_request_from_payload(payload, state.workers) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };
    info!(
        num_paths = request.config.num_paths,
        years = request.config.years_to_project,
        assets = request.allocations.len(),
        "simulate request"
    );

    match simulate(request, &state.commentary, state.commentary_timeout).await {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(msg) => {
            warn!(error = %msg, "simulate request rejected");
            error_response(StatusCode::BAD_REQUEST, &msg)
        }
    }
}

async fn scenarios_handler() -> Response {
    json_response(StatusCode::OK, historical_scenarios())
}

async fn scenario_handler(Path(id): Path<String>) -> Response {
    match find_scenario(&id) {
        Some(scenario) => json_response(StatusCode::OK, scenario),
        None => error_response(StatusCode::NOT_FOUND, &format!("unknown scenario '{id}'")),
    }
}

async fn stress_handler(Json(payload): Json<StressPayload>) -> Response {
    match stress_request_from_payload(payload) {
        Ok(request) => {
            info!(
                scenario = %request.scenario.id,
                assets = request.allocations.len(),
                "stress request"
            );
            json_response(StatusCode::OK, build_stress_response(request))
        }
        Err(msg) => error_response(StatusCode::BAD_REQUEST, &msg),
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn simulate_from_json(json: &str) -> Result<SimulateRequest, String> {
        let payload = serde_json::from_str::<SimulatePayload>(json)
            .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
        simulate_request_from_payload(payload, None)
    }

    fn stress_from_json(json: &str) -> Result<StressRequest, String> {
        let payload = serde_json::from_str::<StressPayload>(json)
            .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
        stress_request_from_payload(payload)
    }

    #[test]
    fn empty_payload_uses_saver_defaults() {
        let request = simulate_from_json("{}").expect("valid request");
        assert_eq!(request.saver.current_age, 30);
        assert_eq!(request.saver.retirement_age, 65);
        assert_approx(request.saver.current_savings, 100_000.0);
        assert_approx(request.saver.monthly_contribution, 1_000.0);
        assert_eq!(request.config.num_paths, 1_000);
        assert_eq!(request.config.years_to_project, 55);
        assert!(request.allocations.is_empty());
        assert_eq!(request.percentiles, DEFAULT_PERCENTILES.to_vec());
    }

    #[test]
    fn default_horizon_is_at_least_forty_years() {
        assert_eq!(default_years_to_project(60, 65), 40);
        assert_eq!(default_years_to_project(25, 67), 62);
        assert_eq!(default_years_to_project(70, 65), 40);
    }

    #[test]
    fn payload_overrides_defaults() {
        let request = simulate_from_json(
            r#"{
                "currentAge": 45,
                "retirementAge": 60,
                "currentSavings": 0,
                "numPaths": 10,
                "yearsToProject": 12,
                "inflationRate": 0.03,
                "seed": 5,
                "allocations": [{
                    "id": "a", "name": "World", "weightPercent": 70,
                    "expectedAnnualReturn": 0.07, "annualVolatility": 0.16,
                    "assetClass": "equity"
                }]
            }"#,
        )
        .expect("valid request");
        assert_eq!(request.saver.current_age, 45);
        assert_approx(request.saver.current_savings, 0.0);
        assert_eq!(request.config.years_to_project, 12);
        assert_eq!(request.config.seed, Some(5));
        assert_eq!(request.allocations[0].asset_class, AssetClass::Equity);
    }

    #[test]
    fn rejects_bad_var_confidence_and_malformed_json() {
        assert!(simulate_from_json(r#"{"varConfidence": 1.0}"#).is_err());
        let err = simulate_from_json(r#"{"numPaths": -3}"#).expect_err("negative paths");
        assert!(err.contains("Invalid API JSON payload"));
    }

    #[test]
    fn path_count_is_bounded() {
        let err = simulate_from_json(r#"{"numPaths": 4000000000}"#).expect_err("too many paths");
        assert!(err.contains("numPaths must be <= 100000"));
        let request = simulate_from_json(r#"{"numPaths": 100000}"#).expect("at the limit");
        assert_eq!(request.config.num_paths, MAX_PATHS);

        let cli = Cli::try_parse_from(["saffron", "simulate", "--num-paths", "100001"])
            .expect("parses");
        let Command::Simulate(args) = cli.command else {
            panic!("expected simulate command");
        };
        assert!(simulate_request_from_args(args).is_err());
    }

    #[test]
    fn cli_without_assets_uses_balanced_mix() {
        let cli = Cli::try_parse_from(["saffron", "simulate"]).expect("valid cli");
        let Command::Simulate(args) = cli.command else {
            panic!("expected simulate command");
        };
        let request = simulate_request_from_args(args).expect("valid request");
        assert_eq!(request.allocations.len(), 4);
        let total: f64 = request.allocations.iter().map(|a| a.weight_percent).sum();
        assert_approx(total, 100.0);
    }

    #[tokio::test]
    async fn engine_errors_are_reported() {
        let request = simulate_from_json(r#"{"numPaths": 0}"#).expect("parses");
        let err = simulate(request, &UnavailableCommentary, Duration::from_millis(50))
            .await
            .expect_err("zero paths");
        assert!(err.contains("numPaths"));

        let request = simulate_from_json(r#"{"monthlyContribution": -1}"#).expect("parses");
        let err = simulate(request, &UnavailableCommentary, Duration::from_millis(50))
            .await
            .expect_err("negative contribution");
        assert!(err.contains("monthlyContribution"));
    }

    #[tokio::test]
    async fn simulate_response_serializes_rounded_bands() {
        let request = simulate_from_json(
            r#"{"numPaths": 25, "yearsToProject": 5, "seed": 3, "currentSavings": 12345.67, "includePaths": true}"#,
        )
        .expect("valid request");
        let response = simulate(request, &UnavailableCommentary, Duration::from_millis(50))
            .await
            .expect("runs");
        assert_eq!(response.bands.len(), 5);
        assert_eq!(response.bands[2].points.len(), 6);
        assert_approx(response.bands[2].points[0].nominal_value, 12_346.0);
        assert_eq!(response.frontier.len(), FRONTIER_POINTS + 1);
        assert_eq!(response.commentary, crate::core::COMMENTARY_FALLBACK);
        assert_eq!(response.paths.as_ref().map(Vec::len), Some(25));

        let json = serde_json::to_string(&response).expect("response should serialize");
        assert!(json.contains("\"riskReport\""));
        assert!(json.contains("\"sharpeRatio\""));
        assert!(json.contains("\"factorBetas\""));
        assert!(json.contains("\"nominalValue\""));
        assert!(json.contains("\"cappedYears\":5"));
    }

    #[test]
    fn stress_payload_resolves_historical_scenario() {
        let request = stress_from_json(
            r#"{
                "scenarioId": "2008-crisis",
                "allocations": [{
                    "id": "eq", "name": "Equity", "weightPercent": 100,
                    "expectedAnnualReturn": 0.08, "annualVolatility": 0.15,
                    "assetClass": "equity"
                }]
            }"#,
        )
        .expect("valid request");
        assert_approx(request.total_value, 1_000_000.0);
        let response = build_stress_response(request);
        assert_eq!(response.impact.total_value_change, -560_000.0);
        assert_eq!(response.timeline.len(), 18 + 48 + 1);
        assert_eq!(response.timeline[0].value, 1_000_000.0);
        assert_eq!(response.timeline[18].value, 440_000.0);
        assert_eq!(response.timeline[66].value, 1_000_000.0);
    }

    #[test]
    fn oversized_scenario_durations_are_rejected() {
        let err = stress_from_json(
            r#"{"scenario": {"id": "x", "name": "X", "impacts": {"equity": -0.2},
                "shockDurationMonths": 4294967295, "recoveryDurationMonths": 1}}"#,
        )
        .expect_err("shock too long");
        assert!(err.contains("shockDurationMonths"));

        let err = stress_from_json(
            r#"{"scenario": {"id": "x", "name": "X", "impacts": {},
                "shockDurationMonths": 6, "recoveryDurationMonths": 2000000000}}"#,
        )
        .expect_err("recovery too long");
        assert!(err.contains("recoveryDurationMonths"));

        assert!(
            stress_from_json(
                r#"{"scenario": {"id": "x", "name": "X", "impacts": {},
                    "shockDurationMonths": 1200, "recoveryDurationMonths": 1200}}"#,
            )
            .is_ok()
        );
    }

    #[test]
    fn stress_payload_requires_a_scenario() {
        assert!(stress_from_json("{}").is_err());
        let err = stress_from_json(r#"{"scenarioId": "nope"}"#).expect_err("unknown id");
        assert!(err.contains("unknown scenario"));
        assert!(stress_from_json(r#"{"scenarioId": "dot-com", "totalValue": -1}"#).is_err());
    }

    #[test]
    fn custom_scenario_with_unknown_class_is_zero_impact() {
        let request = stress_from_json(
            r#"{
                "totalValue": 1000,
                "scenario": {
                    "id": "mine", "name": "Mine",
                    "impacts": { "gold": -0.9 },
                    "shockDurationMonths": 3
                },
                "allocations": [{
                    "id": "eq", "name": "Equity", "weightPercent": 100,
                    "expectedAnnualReturn": 0.08, "annualVolatility": 0.15,
                    "assetClass": "equity"
                }]
            }"#,
        )
        .expect("valid request");
        let response = build_stress_response(request);
        assert_eq!(response.impact.total_value_change, 0.0);
        assert!(response.timeline.iter().all(|p| p.value == 1_000.0));
    }

    #[test]
    fn asset_specs_parse_with_and_without_assumptions() {
        let explicit = parse_asset_spec("equity:60:8:15").expect("valid spec");
        assert_eq!(explicit.asset_class, AssetClass::Equity);
        assert_approx(explicit.weight_percent, 60.0);
        assert_approx(explicit.expected_annual_return, 0.08);
        assert_approx(explicit.annual_volatility, 0.15);

        let defaulted = parse_asset_spec("bond:40").expect("valid spec");
        assert_approx(defaulted.expected_annual_return, 0.04);

        assert!(parse_asset_spec("crypto:5").is_err());
        assert!(parse_asset_spec("equity").is_err());
        assert!(parse_asset_spec("equity:abc").is_err());
        assert_eq!(
            parse_impact_spec("reit:-67"),
            Ok((AssetClass::Reit, -0.67))
        );
    }

    #[test]
    fn cli_parses_subcommands() {
        let cli = Cli::try_parse_from([
            "saffron",
            "simulate",
            "--current-age",
            "40",
            "--asset",
            "equity:80:7:14",
            "--asset",
            "bond:20",
            "--seed",
            "11",
        ])
        .expect("valid cli");
        let Command::Simulate(args) = cli.command else {
            panic!("expected simulate command");
        };
        let request = simulate_request_from_args(args).expect("valid request");
        assert_eq!(request.saver.current_age, 40);
        assert_eq!(request.allocations.len(), 2);
        assert_eq!(request.config.years_to_project, 45);
        assert_approx(request.config.inflation_rate, 0.02);

        let cli = Cli::try_parse_from([
            "saffron",
            "stress",
            "--impact",
            "equity:-20",
            "--asset",
            "equity:100",
            "--total-value",
            "500",
        ])
        .expect("valid cli");
        let Command::Stress(args) = cli.command else {
            panic!("expected stress command");
        };
        let request = stress_request_from_args(args).expect("valid stress");
        assert_eq!(request.scenario.shock_duration_months, 12);
        let response = build_stress_response(request);
        assert_eq!(response.impact.total_value_change, -100.0);
    }
}
