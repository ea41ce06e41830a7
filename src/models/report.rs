use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// End-of-session report: one holistic evaluation plus one analysis entry per
/// answered question. The two halves come from independent model calls and
/// are surfaced unreconciled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalReport {
    pub overall_evaluation: OverallEvaluation,
    pub question_analyses: Vec<QuestionAnalysis>,
    pub metadata: ReportMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallEvaluation {
    pub score: u8,
    pub summary: String,
    pub technical_competency: CompetencyBreakdown,
    pub soft_skills: CompetencyBreakdown,
    pub cultural_fit: String,
    pub recommendation: Recommendation,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetencyBreakdown {
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub verdict: String,
    pub rationale: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionAnalysis {
    pub question: String,
    pub answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technical_score: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub communication_score: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub problem_solving_score: Option<u8>,
    pub score: u8,
    #[serde(default)]
    pub key_strengths: Vec<String>,
    #[serde(default)]
    pub improvement_priorities: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    pub role: String,
    pub experience_level: String,
    pub analyzed_at: DateTime<Utc>,
    pub total_questions: usize,
}

impl OverallEvaluation {
    /// Stand-in used when the holistic model call fails or returns garbage.
    /// The completion screen always has something to render.
    pub fn unavailable() -> Self {
        Self {
            score: 0,
            summary: "Summary unavailable".to_string(),
            technical_competency: CompetencyBreakdown::default(),
            soft_skills: CompetencyBreakdown::default(),
            cultural_fit: String::new(),
            recommendation: Recommendation {
                verdict: "Unavailable".to_string(),
                rationale: "The evaluation service could not be reached.".to_string(),
            },
        }
    }
}

/// Persisted interview report row.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct InterviewReportRecord {
    pub id: Uuid,
    pub candidate_external_id: String,
    pub role: String,
    pub experience_level: String,
    pub report: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Persisted standalone resume-analysis row.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ResumeAnalysisRecord {
    pub id: Uuid,
    pub candidate_external_id: String,
    pub role: String,
    pub digest: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
