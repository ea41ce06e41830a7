use std::collections::HashSet;
use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::Value as JsonValue;

use crate::models::digest::{DigestCategory, ResumeDigest};
use crate::models::session::{ConversationTurn, QuestionSource};
use crate::services::llm_service::{clamped_score, CompletionBackend};

/// Every session opens with the same question, regardless of what the digest
/// extraction produced.
pub const OPENING_QUESTION: &str =
    "Tell me about yourself and why you're interested in this role?";

/// Emitted when question generation fails outright; the interview keeps
/// moving instead of stalling on a model hiccup.
pub const FALLBACK_QUESTION: &str = "Could you tell me more about your technical experience?";

/// Knobs for the resume-vs-conversation mixing policy. Defaults match the
/// production behavior; tests pin the probability to force branches.
#[derive(Debug, Clone)]
pub struct QuestionPolicy {
    /// Chance of jumping back to the resume even while a conversational
    /// thread is still shallow.
    pub resume_switch_probability: f64,
    /// Consecutive conversational turns after which the next question is
    /// pulled from the resume again.
    pub max_thread_depth: usize,
    /// Consecutive resume-sourced questions after which the next one must be
    /// conversational, so the interview does not become a resume recitation.
    pub max_consecutive_resume: usize,
    /// Skip (category, item) pairs that were already asked about; once the
    /// digest is exhausted, only conversational questions remain.
    pub avoid_repeat_resume_items: bool,
}

impl Default for QuestionPolicy {
    fn default() -> Self {
        Self {
            resume_switch_probability: 0.3,
            max_thread_depth: 2,
            max_consecutive_resume: 2,
            avoid_repeat_resume_items: true,
        }
    }
}

/// Outcome of the (purely in-memory) sourcing decision. The actual question
/// text is generated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestionPlan {
    Resume {
        category: DigestCategory,
        item_index: usize,
        item: String,
    },
    Conversation,
}

impl QuestionPlan {
    pub fn source(&self) -> QuestionSource {
        match self {
            QuestionPlan::Resume { .. } => QuestionSource::Resume,
            QuestionPlan::Conversation => QuestionSource::Conversation,
        }
    }
}

/// Decides where the next question comes from. Pure: all randomness comes in
/// through `rng`, so tests can pin every branch.
///
/// `pending_source` is the source of the question currently being answered;
/// together with the recorded history it forms the trailing run the
/// thread-depth and resume-cap rules are evaluated against.
pub fn plan_next_question(
    digest: &ResumeDigest,
    history: &[ConversationTurn],
    pending_source: QuestionSource,
    asked: &HashSet<(DigestCategory, usize)>,
    policy: &QuestionPolicy,
    rng: &mut impl Rng,
) -> QuestionPlan {
    let mut trailing: Vec<QuestionSource> = history.iter().map(|t| t.source).collect();
    trailing.push(pending_source);

    let consecutive_resume = trailing
        .iter()
        .rev()
        .take_while(|s| **s == QuestionSource::Resume)
        .count();
    let thread_len = trailing
        .iter()
        .rev()
        .take_while(|s| **s == QuestionSource::Conversation)
        .count();

    if consecutive_resume >= policy.max_consecutive_resume {
        return QuestionPlan::Conversation;
    }

    let should_ask_from_resume = thread_len >= policy.max_thread_depth
        || rng.gen::<f64>() < policy.resume_switch_probability;
    if !should_ask_from_resume {
        return QuestionPlan::Conversation;
    }

    // Candidate pool: per category, the item indices still eligible.
    let selectable: Vec<(DigestCategory, Vec<usize>)> = digest
        .non_empty_categories()
        .into_iter()
        .filter_map(|category| {
            let indices: Vec<usize> = (0..digest.items(category).len())
                .filter(|i| {
                    !policy.avoid_repeat_resume_items || !asked.contains(&(category, *i))
                })
                .collect();
            if indices.is_empty() {
                None
            } else {
                Some((category, indices))
            }
        })
        .collect();

    let Some((category, indices)) = selectable.choose(rng) else {
        // Digest empty or exhausted: fall back to the conversational path.
        return QuestionPlan::Conversation;
    };
    let item_index = *indices.choose(rng).expect("non-empty index list");

    QuestionPlan::Resume {
        category: *category,
        item_index,
        item: digest.items(*category)[item_index].clone(),
    }
}

#[derive(Debug, Clone)]
pub struct GeneratedQuestion {
    pub question: String,
    pub source: QuestionSource,
}

#[derive(Debug, Clone)]
pub struct TurnEvaluation {
    pub score: u8,
    pub feedback: String,
}

/// Generates question text for a plan and scores conversational answers.
#[derive(Clone)]
pub struct InterviewService {
    backend: Arc<dyn CompletionBackend>,
}

impl InterviewService {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self { backend }
    }

    /// One model call per emitted question. A failed or unparseable reply
    /// degrades to a fixed conversational fallback question.
    pub async fn generate_question(
        &self,
        plan: &QuestionPlan,
        previous_question: &str,
        previous_answer: &str,
        role: &str,
        experience_level: &str,
    ) -> GeneratedQuestion {
        let prompt = match plan {
            QuestionPlan::Resume { category, item, .. } => {
                resume_question_prompt(category.label(), item, role, experience_level)
            }
            QuestionPlan::Conversation => follow_up_prompt(
                previous_question,
                previous_answer,
                role,
                experience_level,
            ),
        };

        match self.backend.complete_json(&prompt, 0.7).await {
            Ok(value) => match coerce_question(&value) {
                Some(question) => GeneratedQuestion {
                    question,
                    source: plan.source(),
                },
                None => {
                    tracing::warn!("question generation returned no usable question, using fallback");
                    fallback_question()
                }
            },
            Err(e) => {
                tracing::warn!(error = ?e, "question generation failed, using fallback");
                fallback_question()
            }
        }
    }

    /// Scores one conversational answer. `None` on any failure: the turn
    /// proceeds unscored rather than blocking the flow.
    pub async fn evaluate_answer(
        &self,
        question: &str,
        answer: &str,
        role: &str,
        experience_level: &str,
    ) -> Option<TurnEvaluation> {
        let prompt = evaluation_prompt(question, answer, role, experience_level);

        match self.backend.complete_json(&prompt, 0.5).await {
            Ok(value) => {
                let score = clamped_score(&value, "score", 1, 10)?;
                let feedback = value
                    .get("feedback")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                Some(TurnEvaluation { score, feedback })
            }
            Err(e) => {
                tracing::warn!(error = ?e, "per-turn evaluation failed, leaving turn unscored");
                None
            }
        }
    }
}

fn fallback_question() -> GeneratedQuestion {
    GeneratedQuestion {
        question: FALLBACK_QUESTION.to_string(),
        source: QuestionSource::Conversation,
    }
}

fn coerce_question(value: &JsonValue) -> Option<String> {
    let question = value
        .get("followUpQuestion")
        .or_else(|| value.get("question"))
        .and_then(|v| v.as_str())
        .map(str::trim)?;
    if question.is_empty() {
        return None;
    }
    Some(question.to_string())
}

fn resume_question_prompt(category: &str, item: &str, role: &str, level: &str) -> String {
    format!(
        r#"You're interviewing a {level} candidate for {role}.
Their resume mentions this {category}: "{item}"

Ask ONE clear, technical question about this {category} item that would assess:
1. Their depth of knowledge
2. How they applied this in practice
3. Relevance to {role}

Return JSON with just the question:
{{
  "followUpQuestion": "your question here",
  "source": "resume"
}}"#
    )
}

fn follow_up_prompt(previous_question: &str, previous_answer: &str, role: &str, level: &str) -> String {
    let previous_question = if previous_question.is_empty() {
        "Not asked yet"
    } else {
        previous_question
    };
    let previous_answer = if previous_answer.is_empty() {
        "No response yet"
    } else {
        previous_answer
    };
    format!(
        r#"You're interviewing a {level} candidate for {role}.
Previous question: {previous_question}
Candidate response: {previous_answer}

Do ONE of these:
1. Ask a follow-up that probes deeper into their answer OR
2. Challenge their perspective slightly OR
3. Ask them to elaborate on a specific part

Keep it technical and relevant to {role}.
Return JSON with question and context:
{{
  "followUpQuestion": "your question here",
  "source": "conversation"
}}"#
    )
}

fn evaluation_prompt(question: &str, answer: &str, role: &str, level: &str) -> String {
    format!(
        r#"Evaluate this response for a {level} {role} candidate:
Q: {question}
A: {answer}

Provide brief feedback and 1-10 score. Return JSON:
{{
  "score": number,
  "feedback": "string"
}}"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    fn digest_with(skills: &[&str]) -> ResumeDigest {
        ResumeDigest {
            skills: skills.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    fn turn(source: QuestionSource) -> ConversationTurn {
        ConversationTurn {
            question: "q".into(),
            answer: "a".into(),
            source,
            score: None,
            feedback: None,
        }
    }

    fn policy(p: f64) -> QuestionPolicy {
        QuestionPolicy {
            resume_switch_probability: p,
            ..Default::default()
        }
    }

    #[test]
    fn shallow_thread_stays_conversational_without_random_switch() {
        let mut rng = StdRng::seed_from_u64(1);
        let plan = plan_next_question(
            &digest_with(&["Go concurrency"]),
            &[],
            QuestionSource::Conversation,
            &HashSet::new(),
            &policy(0.0),
            &mut rng,
        );
        assert_eq!(plan, QuestionPlan::Conversation);
    }

    #[test]
    fn deep_thread_returns_to_resume() {
        let mut rng = StdRng::seed_from_u64(1);
        let plan = plan_next_question(
            &digest_with(&["Go concurrency"]),
            &[turn(QuestionSource::Conversation)],
            QuestionSource::Conversation,
            &HashSet::new(),
            &policy(0.0),
            &mut rng,
        );
        assert_eq!(
            plan,
            QuestionPlan::Resume {
                category: DigestCategory::Skills,
                item_index: 0,
                item: "Go concurrency".into(),
            }
        );
    }

    #[test]
    fn random_switch_pulls_from_resume() {
        let mut rng = StdRng::seed_from_u64(1);
        let plan = plan_next_question(
            &digest_with(&["Go concurrency"]),
            &[],
            QuestionSource::Conversation,
            &HashSet::new(),
            &policy(1.0),
            &mut rng,
        );
        assert!(matches!(plan, QuestionPlan::Resume { .. }));
    }

    #[test]
    fn two_consecutive_resume_questions_force_conversation() {
        let mut rng = StdRng::seed_from_u64(1);
        let plan = plan_next_question(
            &digest_with(&["a", "b", "c"]),
            &[turn(QuestionSource::Resume)],
            QuestionSource::Resume,
            &HashSet::new(),
            &policy(1.0),
            &mut rng,
        );
        assert_eq!(plan, QuestionPlan::Conversation);
    }

    #[test]
    fn one_resume_question_does_not_trip_the_cap() {
        let mut rng = StdRng::seed_from_u64(1);
        let plan = plan_next_question(
            &digest_with(&["a", "b"]),
            &[turn(QuestionSource::Conversation)],
            QuestionSource::Resume,
            &HashSet::new(),
            &policy(1.0),
            &mut rng,
        );
        assert!(matches!(plan, QuestionPlan::Resume { .. }));
    }

    #[test]
    fn empty_digest_always_conversational() {
        let mut rng = StdRng::seed_from_u64(1);
        let plan = plan_next_question(
            &ResumeDigest::default(),
            &[turn(QuestionSource::Conversation)],
            QuestionSource::Conversation,
            &HashSet::new(),
            &policy(1.0),
            &mut rng,
        );
        assert_eq!(plan, QuestionPlan::Conversation);
    }

    #[test]
    fn exhausted_digest_falls_back_to_conversation() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut asked = HashSet::new();
        asked.insert((DigestCategory::Skills, 0));
        let plan = plan_next_question(
            &digest_with(&["only skill"]),
            &[turn(QuestionSource::Conversation)],
            QuestionSource::Conversation,
            &asked,
            &policy(1.0),
            &mut rng,
        );
        assert_eq!(plan, QuestionPlan::Conversation);
    }

    #[test]
    fn asked_items_are_not_repeated() {
        let mut asked = HashSet::new();
        asked.insert((DigestCategory::Skills, 0));
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let plan = plan_next_question(
                &digest_with(&["first", "second"]),
                &[turn(QuestionSource::Conversation)],
                QuestionSource::Conversation,
                &asked,
                &policy(1.0),
                &mut rng,
            );
            assert_eq!(
                plan,
                QuestionPlan::Resume {
                    category: DigestCategory::Skills,
                    item_index: 1,
                    item: "second".into(),
                }
            );
        }
    }

    #[test]
    fn repetition_allowed_when_avoidance_disabled() {
        let mut asked = HashSet::new();
        asked.insert((DigestCategory::Skills, 0));
        let mut rng = StdRng::seed_from_u64(1);
        let plan = plan_next_question(
            &digest_with(&["only skill"]),
            &[turn(QuestionSource::Conversation)],
            QuestionSource::Conversation,
            &asked,
            &QuestionPolicy {
                resume_switch_probability: 1.0,
                avoid_repeat_resume_items: false,
                ..Default::default()
            },
            &mut rng,
        );
        assert_eq!(
            plan,
            QuestionPlan::Resume {
                category: DigestCategory::Skills,
                item_index: 0,
                item: "only skill".into(),
            }
        );
    }

    #[test]
    fn coerce_question_handles_aliases_and_blanks() {
        assert_eq!(
            coerce_question(&json!({"followUpQuestion": " What about X? "})),
            Some("What about X?".to_string())
        );
        assert_eq!(
            coerce_question(&json!({"question": "Alias key?"})),
            Some("Alias key?".to_string())
        );
        assert_eq!(coerce_question(&json!({"followUpQuestion": "   "})), None);
        assert_eq!(coerce_question(&json!({"unrelated": true})), None);
    }
}
