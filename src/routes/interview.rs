use axum::{
    extract::{Path, State},
    response::Json,
};
use uuid::Uuid;

use crate::config::get_config;
use crate::dto::interview_dto::{
    EndInterviewResponse, SessionStatusResponse, StartInterviewRequest, StartInterviewResponse,
    SubmitAnswerRequest, SubmitAnswerResponse,
};
use crate::models::report::InterviewReportRecord;
use crate::services::session_service::StartParams;
use crate::utils::validation::validate;
use crate::AppState;

#[axum::debug_handler]
pub async fn start_interview(
    State(state): State<AppState>,
    Json(req): Json<StartInterviewRequest>,
) -> crate::error::Result<Json<StartInterviewResponse>> {
    validate(&req)?;

    let time_budget_minutes = req
        .time_budget_minutes
        .unwrap_or_else(|| get_config().default_time_budget_minutes);

    let started = state
        .session_service
        .start(StartParams {
            candidate_external_id: req.candidate_external_id,
            role: req.role,
            experience_level: req.experience_level,
            resume_text: req.resume_text,
            job_description: req.job_description,
            time_budget_minutes,
        })
        .await?;

    Ok(Json(started.into()))
}

#[axum::debug_handler]
pub async fn submit_answer(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<SubmitAnswerRequest>,
) -> crate::error::Result<Json<SubmitAnswerResponse>> {
    validate(&req)?;

    let outcome = state
        .session_service
        .submit_answer(session_id, &req.answer)
        .await?;

    Ok(Json(outcome.into()))
}

#[axum::debug_handler]
pub async fn end_interview(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> crate::error::Result<Json<EndInterviewResponse>> {
    let outcome = state.session_service.finish(session_id).await?;
    Ok(Json(outcome.into()))
}

#[axum::debug_handler]
pub async fn get_status(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> crate::error::Result<Json<SessionStatusResponse>> {
    let status = state.session_service.status(session_id)?;
    Ok(Json(status.into()))
}

#[axum::debug_handler]
pub async fn get_report(
    State(state): State<AppState>,
    Path(report_id): Path<Uuid>,
) -> crate::error::Result<Json<InterviewReportRecord>> {
    let record = state.report_service.get_report(report_id).await?;
    Ok(Json(record))
}
