use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::models::digest::{DigestCategory, ResumeDigest};
use crate::models::report::FinalReport;

/// Where the currently pending question came from. Conversational questions
/// trigger automatic scoring of the previous answer; resume-mined questions
/// leave scoring to the end-of-session analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionSource {
    Resume,
    Conversation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStage {
    Setup,
    Active,
    Completed,
}

/// One question/answer exchange. Appended when an answer is accepted and
/// never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub question: String,
    pub answer: String,
    pub source: QuestionSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

/// Live state of one mock interview. Exists only in memory; the final report
/// is the only artifact that outlives the session.
#[derive(Debug, Clone)]
pub struct InterviewSession {
    pub id: Uuid,
    pub candidate_external_id: String,
    pub role: String,
    pub experience_level: String,
    pub resume_text: String,
    pub job_description: Option<String>,

    pub stage: SessionStage,
    pub digest: ResumeDigest,
    pub history: Vec<ConversationTurn>,
    pub pending_question: String,
    pub pending_source: QuestionSource,

    pub time_budget_minutes: i64,
    pub started_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,

    pub aggregate_score: u32,
    pub answered_count: usize,

    /// (category, item index) pairs already used for resume-sourced
    /// questions, so a long session does not circle back to the same item.
    pub asked_resume_items: HashSet<(DigestCategory, usize)>,

    /// A question-generation round trip is outstanding. At most one per
    /// session; further submissions are rejected until it settles.
    pub in_flight: bool,
    /// Bumped on termination. A generation that resolves under a stale epoch
    /// is discarded instead of being applied.
    pub epoch: u64,

    pub report_id: Option<Uuid>,
    pub report: Option<FinalReport>,
}

impl InterviewSession {
    pub fn new(
        id: Uuid,
        candidate_external_id: String,
        role: String,
        experience_level: String,
        resume_text: String,
        job_description: Option<String>,
        time_budget_minutes: i64,
    ) -> Self {
        Self {
            id,
            candidate_external_id,
            role,
            experience_level,
            resume_text,
            job_description,
            stage: SessionStage::Setup,
            digest: ResumeDigest::default(),
            history: Vec::new(),
            pending_question: String::new(),
            pending_source: QuestionSource::Conversation,
            time_budget_minutes,
            started_at: DateTime::<Utc>::MIN_UTC,
            deadline: DateTime::<Utc>::MIN_UTC,
            aggregate_score: 0,
            answered_count: 0,
            asked_resume_items: HashSet::new(),
            in_flight: false,
            epoch: 0,
            report_id: None,
            report: None,
        }
    }

    /// Setup -> Active. Attaches the digest and the opening question and
    /// starts the countdown.
    pub fn activate(&mut self, digest: ResumeDigest, opener: String, now: DateTime<Utc>) {
        self.digest = digest;
        self.pending_question = opener;
        self.pending_source = QuestionSource::Conversation;
        self.started_at = now;
        self.deadline = now + chrono::Duration::minutes(self.time_budget_minutes);
        self.stage = SessionStage::Active;
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.deadline
    }

    /// Whole minutes left, rounded up so a freshly started session shows the
    /// full budget. Never negative.
    pub fn remaining_minutes(&self, now: DateTime<Utc>) -> i64 {
        let secs = (self.deadline - now).num_seconds().max(0);
        (secs + 59) / 60
    }

    pub fn average_score(&self) -> f64 {
        if self.answered_count == 0 {
            return 0.0;
        }
        self.aggregate_score as f64 / self.answered_count as f64
    }

    /// Records an accepted answer as an immutable turn and moves the session
    /// on to the next pending question.
    pub fn append_turn(
        &mut self,
        turn: ConversationTurn,
        next_question: String,
        next_source: QuestionSource,
    ) {
        if let Some(score) = turn.score {
            self.aggregate_score += score as u32;
        }
        self.history.push(turn);
        self.answered_count += 1;
        self.pending_question = next_question;
        self.pending_source = next_source;
    }
}
