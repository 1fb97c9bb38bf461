use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;

use crate::error::AnalysisError;
use crate::pipeline;
use crate::report::Report;

use super::types::*;
use super::AppState;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

fn api_error(status: StatusCode, msg: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            error: msg.into(),
        }),
    )
}

fn analysis_error(err: AnalysisError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &err {
        AnalysisError::MalformedInput { .. } | AnalysisError::Csv(_) => StatusCode::BAD_REQUEST,
        AnalysisError::ResourceExceeded { .. } => StatusCode::PAYLOAD_TOO_LARGE,
    };
    tracing::warn!(error = %err, status = status.as_u16(), "Analysis rejected");
    api_error(status, err.to_string())
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        engine: format!("mulewatch {}", env!("CARGO_PKG_VERSION")),
    })
}

// ============================================================
// Analysis
// ============================================================

/// Analyze a CSV ledger posted as the request body.
pub async fn analyze(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AnalyzeParams>,
    body: String,
) -> ApiResult<Report> {
    let row_limit = params.partial.unwrap_or(false).then_some(state.row_limit);
    tracing::info!(bytes = body.len(), ?row_limit, "Analysis requested");

    // CPU-bound; keep it off the async workers.
    let result = tokio::task::spawn_blocking(move || {
        pipeline::analyze_csv(body.as_bytes(), row_limit, &state.analysis)
    })
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "Analysis task failed");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "analysis task failed")
    })?;

    result.map(Json).map_err(analysis_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;

    const TRIANGLE: &str = "\
sender_id,receiver_id,amount,timestamp
A,B,500,2024-03-01T10:00:00Z
B,C,490,2024-03-01T12:00:00Z
C,A,480,2024-03-01T14:00:00Z
";

    fn state(analysis: AnalysisConfig, row_limit: usize) -> State<Arc<AppState>> {
        State(Arc::new(AppState {
            analysis,
            row_limit,
        }))
    }

    fn params(partial: Option<bool>) -> Query<AnalyzeParams> {
        Query(AnalyzeParams { partial })
    }

    #[tokio::test]
    async fn test_health() {
        let Json(resp) = health().await;
        assert_eq!(resp.status, "ok");
        assert!(resp.engine.starts_with("mulewatch"));
    }

    #[tokio::test]
    async fn test_analyze_full_body() {
        let Json(report) = analyze(
            state(AnalysisConfig::default(), 15_000),
            params(None),
            TRIANGLE.to_string(),
        )
        .await
        .unwrap();
        assert_eq!(report.summary.total_transactions, 3);
        assert_eq!(report.fraud_rings.len(), 1);
        assert!(!report.summary.is_partial);
    }

    #[tokio::test]
    async fn test_analyze_partial_glimpse() {
        let Json(report) = analyze(
            state(AnalysisConfig::default(), 2),
            params(Some(true)),
            TRIANGLE.to_string(),
        )
        .await
        .unwrap();
        assert_eq!(report.summary.total_transactions, 2);
        assert!(report.summary.is_partial);
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let body = "sender_id,receiver_id,amount,timestamp\nA,B,lots,2024-03-01\n";
        let (status, Json(err)) = analyze(
            state(AnalysisConfig::default(), 15_000),
            params(None),
            body.to_string(),
        )
        .await
        .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(err.error.contains("row 1"));
    }

    #[tokio::test]
    async fn test_oversized_ledger_is_payload_too_large() {
        let mut analysis = AnalysisConfig::default();
        analysis.max_transactions = 2;
        let (status, _) = analyze(state(analysis, 15_000), params(None), TRIANGLE.to_string())
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }
}
