use axum::{extract::State, response::Json};

use crate::dto::resume_dto::{AnalyzeResumeRequest, AnalyzeResumeResponse};
use crate::utils::validation::validate;
use crate::AppState;

/// Standalone resume analysis, outside any interview session. Here an LLM
/// failure is the caller's problem, so the strict extraction variant is
/// used.
#[axum::debug_handler]
pub async fn analyze_resume(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeResumeRequest>,
) -> crate::error::Result<Json<AnalyzeResumeResponse>> {
    validate(&req)?;

    let digest = state
        .resume_service
        .extract_digest_strict(&req.resume_text, &req.role, &req.experience_level)
        .await?;

    let analysis_id = state
        .report_service
        .save_resume_analysis(&req.candidate_external_id, &req.role, &digest)
        .await?;

    Ok(Json(AnalyzeResumeResponse {
        analysis_id,
        digest,
    }))
}
