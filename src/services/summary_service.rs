use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;

use crate::models::report::{
    CompetencyBreakdown, FinalReport, OverallEvaluation, QuestionAnalysis, Recommendation,
    ReportMetadata,
};
use crate::models::session::ConversationTurn;
use crate::services::llm_service::{clamped_score, string_list, CompletionBackend};

/// End-of-session analysis: one batch call covering every turn plus one
/// holistic call, merged without reconciliation. Either half may fail on its
/// own; the other still lands in the report.
#[derive(Clone)]
pub struct SummaryService {
    backend: Arc<dyn CompletionBackend>,
}

impl SummaryService {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self { backend }
    }

    /// Never errors: the worst case is a placeholder evaluation and an empty
    /// analysis list, so the completion screen always has a report to show.
    pub async fn summarize(
        &self,
        role: &str,
        experience_level: &str,
        resume_text: &str,
        job_description: Option<&str>,
        history: &[ConversationTurn],
        analyzed_at: DateTime<Utc>,
    ) -> FinalReport {
        let batch_prompt = batch_analysis_prompt(role, experience_level, history);
        let holistic_prompt = holistic_summary_prompt(
            role,
            experience_level,
            resume_text,
            job_description,
            history,
        );

        // Independent calls, no ordering between them.
        let (batch, holistic) = tokio::join!(
            self.backend.complete_json(&batch_prompt, 0.3),
            self.backend.complete_json(&holistic_prompt, 0.5),
        );

        let question_analyses = match batch {
            Ok(value) => coerce_analyses(&value, history),
            Err(e) => {
                tracing::warn!(error = ?e, "batch question analysis failed, omitting analyses");
                Vec::new()
            }
        };

        let overall_evaluation = match holistic {
            Ok(value) => coerce_overall(&value).unwrap_or_else(|| {
                tracing::warn!("holistic summary reply unusable, substituting placeholder");
                OverallEvaluation::unavailable()
            }),
            Err(e) => {
                tracing::warn!(error = ?e, "holistic summary failed, substituting placeholder");
                OverallEvaluation::unavailable()
            }
        };

        FinalReport {
            overall_evaluation,
            question_analyses,
            metadata: ReportMetadata {
                role: role.to_string(),
                experience_level: experience_level.to_string(),
                analyzed_at,
                total_questions: history.len(),
            },
        }
    }
}

fn format_transcript(history: &[ConversationTurn]) -> String {
    history
        .iter()
        .enumerate()
        .map(|(i, turn)| {
            format!(
                "QUESTION {n}: {q}\nANSWER {n}: {a}",
                n = i + 1,
                q = turn.question,
                a = turn.answer
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn batch_analysis_prompt(role: &str, level: &str, history: &[ConversationTurn]) -> String {
    format!(
        r#"You are an expert {role} interviewer conducting a comprehensive evaluation of multiple interview responses at the {level} level.

### Interview Questions and Candidate Responses:
{transcript}

### Analysis Requirements:
Provide detailed feedback for each question-response pair in this structured JSON format:

{{
  "analyses": [
    {{
      "question": "exact question text",
      "answer": "exact answer text",
      "technicalAnalysis": {{ "score": number (1-5) }},
      "communicationEvaluation": {{ "score": number (1-5) }},
      "problemSolvingAssessment": {{ "score": number (1-5) }},
      "overallEvaluation": {{
        "score": number (1-10),
        "keyStrengths": ["notable positive aspects"],
        "improvementPriorities": ["top areas for development"],
        "confidenceScore": number (1-5)
      }}
    }}
  ]
}}

Return one entry per question, in order. Maintain consistent scoring standards across all questions, reference specific parts of responses, and account for {level} expectations."#,
        transcript = format_transcript(history),
    )
}

fn holistic_summary_prompt(
    role: &str,
    level: &str,
    resume_text: &str,
    job_description: Option<&str>,
    history: &[ConversationTurn],
) -> String {
    let job_requirements = job_description
        .map(|jd| format!("**Job Requirements:**\n{}\n\n", jd))
        .unwrap_or_default();
    format!(
        r#"You are an expert AI interviewer analyzing a candidate's performance for a {role} position at the {level} level.

**Candidate Background:**
{resume_text}

{job_requirements}**Interview Transcript:**
{transcript}

Provide a comprehensive overall evaluation in JSON format:
{{
  "overallEvaluation": {{
    "score": number (1-10, 10 being exceptional),
    "summary": "concise yet insightful summary of the candidate's performance",
    "technicalCompetency": {{
      "strengths": ["specific technical skills demonstrated"],
      "weaknesses": ["technical gaps or areas needing improvement"]
    }},
    "softSkills": {{
      "strengths": ["communication, problem-solving, etc."],
      "weaknesses": ["areas needing development"]
    }},
    "culturalFit": "assessment of how well they align with typical team environments",
    "recommendation": {{
      "verdict": "Strong Hire / Hire / Borderline / No Hire",
      "rationale": "detailed justification for the recommendation"
    }}
  }}
}}

Be specific and evidence-based, consider the candidate's experience level, and keep a professional, constructive tone."#,
        transcript = format_transcript(history),
    )
}

/// Maps the model's analyses array onto the recorded history. Question and
/// answer text always come from the history, never from the model; a short
/// or ragged reply yields default-scored entries so the one-per-turn shape
/// holds. An unusable reply yields an empty list.
fn coerce_analyses(value: &JsonValue, history: &[ConversationTurn]) -> Vec<QuestionAnalysis> {
    let Some(entries) = value.get("analyses").and_then(|v| v.as_array()) else {
        tracing::warn!("batch analysis reply missing 'analyses' array");
        return Vec::new();
    };
    if entries.is_empty() {
        return Vec::new();
    }

    history
        .iter()
        .enumerate()
        .map(|(i, turn)| {
            let entry = entries.get(i).cloned().unwrap_or(JsonValue::Null);
            let overall = entry.get("overallEvaluation").cloned().unwrap_or(JsonValue::Null);
            QuestionAnalysis {
                question: turn.question.clone(),
                answer: turn.answer.clone(),
                technical_score: nested_score(&entry, "technicalAnalysis"),
                communication_score: nested_score(&entry, "communicationEvaluation"),
                problem_solving_score: nested_score(&entry, "problemSolvingAssessment"),
                score: clamped_score(&overall, "score", 1, 10)
                    .or_else(|| clamped_score(&entry, "score", 1, 10))
                    .unwrap_or(0),
                key_strengths: string_list(&overall, "keyStrengths"),
                improvement_priorities: string_list(&overall, "improvementPriorities"),
                confidence_score: clamped_score(&overall, "confidenceScore", 1, 5),
            }
        })
        .collect()
}

fn nested_score(entry: &JsonValue, key: &str) -> Option<u8> {
    entry.get(key).and_then(|v| clamped_score(v, "score", 1, 5))
}

/// `None` when the reply has no usable holistic evaluation; the caller
/// substitutes the placeholder.
fn coerce_overall(value: &JsonValue) -> Option<OverallEvaluation> {
    let root = value.get("overallEvaluation").unwrap_or(value);
    let score = clamped_score(root, "score", 1, 10)?;

    let competency = |key: &str| {
        root.get(key)
            .map(|v| CompetencyBreakdown {
                strengths: string_list(v, "strengths"),
                weaknesses: string_list(v, "weaknesses"),
            })
            .unwrap_or_default()
    };

    let recommendation = root.get("recommendation").cloned().unwrap_or(JsonValue::Null);

    Some(OverallEvaluation {
        score,
        summary: root
            .get("summary")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        technical_competency: competency("technicalCompetency"),
        soft_skills: competency("softSkills"),
        cultural_fit: root
            .get("culturalFit")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        recommendation: Recommendation {
            verdict: recommendation
                .get("verdict")
                .and_then(|v| v.as_str())
                .unwrap_or("Unavailable")
                .to_string(),
            rationale: recommendation
                .get("rationale")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
        },
    })
}
