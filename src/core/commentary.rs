use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use super::types::RiskReport;

pub const COMMENTARY_FALLBACK: &str = "Unable to generate commentary at this time.";

/// Metrics handed to an external narrative service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentaryRequest {
    pub horizon_years: u32,
    pub median_terminal_value: f64,
    pub p95_terminal_value: f64,
    pub p05_terminal_value: f64,
    pub risk: RiskReport,
}

impl CommentaryRequest {
    pub fn prompt(&self) -> String {
        let betas = self.risk.factor_betas;
        format!(
            "Analyze these simulation results for a {}-year investment horizon:\n\
             - Median Portfolio Value: {:.0}\n\
             - 95th Percentile: {:.0}\n\
             - 5th Percentile: {:.0}\n\
             - Sharpe Ratio: {:.2}\n\
             - Max Drawdown: {:.1}%\n\
             - Value at Risk (95%): {:.1}%\n\
             - Market Beta: {:.2}\n\
             - Size Factor: {:.2}\n\
             - Value Factor: {:.2}\n\
             - Momentum Factor: {:.2}\n\
             - Alpha: {:.2}%\n\
             - R-squared: {:.1}%",
            self.horizon_years,
            self.median_terminal_value,
            self.p95_terminal_value,
            self.p05_terminal_value,
            self.risk.sharpe_ratio,
            self.risk.max_drawdown_fraction * 100.0,
            self.risk.value_at_risk_fraction * 100.0,
            betas.market,
            betas.size,
            betas.value,
            betas.momentum,
            self.risk.alpha * 100.0,
            self.risk.r_squared * 100.0,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommentaryError {
    #[error("commentary service is not configured")]
    Unavailable,
    #[error("commentary service failed: {0}")]
    Failed(String),
}

/// External text generation, consumed as a black box.
pub trait CommentaryProvider: Send + Sync {
    fn generate(
        &self,
        request: &CommentaryRequest,
    ) -> impl Future<Output = Result<String, CommentaryError>> + Send;
}

/// Provider used when no narrative service is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableCommentary;

impl CommentaryProvider for UnavailableCommentary {
    async fn generate(&self, _request: &CommentaryRequest) -> Result<String, CommentaryError> {
        Err(CommentaryError::Unavailable)
    }
}

/// Asks `provider` for commentary, giving up after `timeout`. Errors, empty
/// replies and timeouts all yield [`COMMENTARY_FALLBACK`]; dropping the
/// pending request cancels it.
pub async fn commentary_or_fallback<P: CommentaryProvider>(
    provider: &P,
    request: &CommentaryRequest,
    timeout: Duration,
) -> String {
    match tokio::time::timeout(timeout, provider.generate(request)).await {
        Ok(Ok(text)) if !text.trim().is_empty() => text,
        Ok(Ok(_)) => {
            warn!("commentary service returned an empty reply");
            COMMENTARY_FALLBACK.to_string()
        }
        Ok(Err(e)) => {
            warn!(error = %e, "commentary unavailable, using fallback");
            COMMENTARY_FALLBACK.to_string()
        }
        Err(_) => {
            warn!(timeout_ms = timeout.as_millis() as u64, "commentary timed out");
            COMMENTARY_FALLBACK.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::FactorBetas;

    fn sample_request() -> CommentaryRequest {
        CommentaryRequest {
            horizon_years: 30,
            median_terminal_value: 750_000.4,
            p95_terminal_value: 1_900_000.0,
            p05_terminal_value: 310_000.0,
            risk: RiskReport {
                sharpe_ratio: 1.234,
                max_drawdown_fraction: 0.125,
                value_at_risk_fraction: 0.031,
                factor_betas: FactorBetas {
                    market: 0.91,
                    size: 3.33,
                    value: -5.0,
                    momentum: 2.5,
                },
                alpha: 0.015,
                r_squared: 0.92,
            },
        }
    }

    struct Echo;

    impl CommentaryProvider for Echo {
        async fn generate(&self, request: &CommentaryRequest) -> Result<String, CommentaryError> {
            Ok(format!("horizon {}", request.horizon_years))
        }
    }

    struct Slow;

    impl CommentaryProvider for Slow {
        async fn generate(&self, _request: &CommentaryRequest) -> Result<String, CommentaryError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("too late".to_string())
        }
    }

    struct Blank;

    impl CommentaryProvider for Blank {
        async fn generate(&self, _request: &CommentaryRequest) -> Result<String, CommentaryError> {
            Ok("   ".to_string())
        }
    }

    #[test]
    fn prompt_formats_metrics_for_display() {
        let prompt = sample_request().prompt();
        assert!(prompt.contains("30-year"));
        assert!(prompt.contains("Median Portfolio Value: 750000"));
        assert!(prompt.contains("Sharpe Ratio: 1.23"));
        assert!(prompt.contains("Max Drawdown: 12.5%"));
        assert!(prompt.contains("R-squared: 92.0%"));
    }

    #[tokio::test]
    async fn successful_reply_is_returned() {
        let text = commentary_or_fallback(&Echo, &sample_request(), Duration::from_secs(1)).await;
        assert_eq!(text, "horizon 30");
    }

    #[tokio::test]
    async fn failures_and_timeouts_fall_back() {
        let request = sample_request();
        let unavailable =
            commentary_or_fallback(&UnavailableCommentary, &request, Duration::from_secs(1)).await;
        assert_eq!(unavailable, COMMENTARY_FALLBACK);

        let slow = commentary_or_fallback(&Slow, &request, Duration::from_millis(20)).await;
        assert_eq!(slow, COMMENTARY_FALLBACK);

        let blank = commentary_or_fallback(&Blank, &request, Duration::from_secs(1)).await;
        assert_eq!(blank, COMMENTARY_FALLBACK);
    }
}
