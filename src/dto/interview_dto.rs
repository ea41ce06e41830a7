use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::digest::ResumeDigest;
use crate::models::report::FinalReport;
use crate::models::session::{QuestionSource, SessionStage};
use crate::services::session_service::{
    AnswerOutcome, CompletionOutcome, CompletionStatus, NextTurn, SessionStatus, StartedSession,
};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct StartInterviewRequest {
    #[validate(length(min = 1, message = "candidate_external_id is required"))]
    pub candidate_external_id: String,
    #[validate(length(min = 1, message = "resume_text is required"))]
    pub resume_text: String,
    #[validate(length(min = 1, message = "role is required"))]
    pub role: String,
    #[validate(length(min = 1, message = "experience_level is required"))]
    pub experience_level: String,
    pub job_description: Option<String>,
    pub time_budget_minutes: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StartInterviewResponse {
    pub session_id: Uuid,
    pub question: String,
    pub source: QuestionSource,
    pub time_budget_minutes: i64,
    /// Echoed for client-side display of what the interview will draw on.
    pub resume_highlights: ResumeDigest,
}

impl From<StartedSession> for StartInterviewResponse {
    fn from(s: StartedSession) -> Self {
        Self {
            session_id: s.session_id,
            question: s.question,
            source: s.source,
            time_budget_minutes: s.time_budget_minutes,
            resume_highlights: s.digest,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubmitAnswerRequest {
    #[validate(length(min = 1, message = "answer is required"))]
    pub answer: String,
}

/// Either the next question (status `in_progress`) or, when the time budget
/// ran out underneath the submission, the completion payload (status
/// `completed`).
#[derive(Debug, Clone, Serialize)]
pub struct SubmitAnswerResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<QuestionSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    pub answered_count: Option<usize>,
    pub average_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_minutes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<FinalReport>,
}

impl From<AnswerOutcome> for SubmitAnswerResponse {
    fn from(outcome: AnswerOutcome) -> Self {
        match outcome {
            AnswerOutcome::Next(next) => Self::from(next),
            AnswerOutcome::Completed(done) => Self {
                status: completion_status_label(done.status).to_string(),
                question: None,
                source: None,
                score: None,
                feedback: None,
                answered_count: None,
                average_score: None,
                remaining_minutes: None,
                report_id: done.report_id,
                report: done.report,
            },
        }
    }
}

impl From<NextTurn> for SubmitAnswerResponse {
    fn from(next: NextTurn) -> Self {
        Self {
            status: "in_progress".to_string(),
            question: Some(next.question),
            source: Some(next.source),
            score: next.score,
            feedback: next.feedback,
            answered_count: Some(next.answered_count),
            average_score: Some(next.average_score),
            remaining_minutes: Some(next.remaining_minutes),
            report_id: None,
            report: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EndInterviewResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<FinalReport>,
}

impl From<CompletionOutcome> for EndInterviewResponse {
    fn from(done: CompletionOutcome) -> Self {
        Self {
            status: completion_status_label(done.status).to_string(),
            report_id: done.report_id,
            report: done.report,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionStatusResponse {
    pub stage: SessionStage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_question: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_source: Option<QuestionSource>,
    pub answered_count: usize,
    pub average_score: f64,
    pub remaining_minutes: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_id: Option<Uuid>,
}

impl From<SessionStatus> for SessionStatusResponse {
    fn from(status: SessionStatus) -> Self {
        Self {
            stage: status.stage,
            pending_question: status.pending_question,
            pending_source: status.pending_source,
            answered_count: status.answered_count,
            average_score: status.average_score,
            remaining_minutes: status.remaining_minutes,
            report_id: status.report_id,
        }
    }
}

fn completion_status_label(status: CompletionStatus) -> &'static str {
    match status {
        CompletionStatus::Completing => "completing",
        CompletionStatus::Completed => "completed",
    }
}
