use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::digest::ResumeDigest;
use crate::models::report::FinalReport;
use crate::models::session::{
    ConversationTurn, InterviewSession, QuestionSource, SessionStage,
};
use crate::services::interview_service::{
    plan_next_question, InterviewService, QuestionPlan, QuestionPolicy, OPENING_QUESTION,
};
use crate::services::report_service::ReportSink;
use crate::services::resume_service::ResumeService;
use crate::services::summary_service::SummaryService;
use crate::utils::clock::Clock;

pub struct StartParams {
    pub candidate_external_id: String,
    pub role: String,
    pub experience_level: String,
    pub resume_text: String,
    pub job_description: Option<String>,
    pub time_budget_minutes: i64,
}

#[derive(Debug, Clone)]
pub struct StartedSession {
    pub session_id: Uuid,
    pub question: String,
    pub source: QuestionSource,
    pub time_budget_minutes: i64,
    pub digest: ResumeDigest,
}

#[derive(Debug, Clone)]
pub struct NextTurn {
    pub question: String,
    pub source: QuestionSource,
    pub score: Option<u8>,
    pub feedback: Option<String>,
    pub answered_count: usize,
    pub average_score: f64,
    pub remaining_minutes: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionStatus {
    /// Termination has been triggered; the report is still being generated
    /// by whichever caller got there first.
    Completing,
    Completed,
}

#[derive(Debug, Clone)]
pub struct CompletionOutcome {
    pub status: CompletionStatus,
    pub report_id: Option<Uuid>,
    pub report: Option<FinalReport>,
}

#[derive(Debug, Clone)]
pub enum AnswerOutcome {
    Next(NextTurn),
    Completed(CompletionOutcome),
}

#[derive(Debug, Clone)]
pub struct SessionStatus {
    pub stage: SessionStage,
    pub pending_question: Option<String>,
    pub pending_source: Option<QuestionSource>,
    pub answered_count: usize,
    pub average_score: f64,
    pub remaining_minutes: i64,
    pub report_id: Option<Uuid>,
}

/// Owns every live interview. Sessions exist only in this map; each one is
/// single-writer (all mutation happens under the store lock, which is never
/// held across an await), and only the final report outlives the session.
#[derive(Clone)]
pub struct SessionService {
    sessions: Arc<Mutex<HashMap<Uuid, InterviewSession>>>,
    resume_service: ResumeService,
    interview_service: InterviewService,
    summary_service: SummaryService,
    reports: Arc<dyn ReportSink>,
    clock: Arc<dyn Clock>,
    policy: QuestionPolicy,
    max_active_sessions: usize,
}

impl SessionService {
    pub fn new(
        resume_service: ResumeService,
        interview_service: InterviewService,
        summary_service: SummaryService,
        reports: Arc<dyn ReportSink>,
        clock: Arc<dyn Clock>,
        policy: QuestionPolicy,
        max_active_sessions: usize,
    ) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            resume_service,
            interview_service,
            summary_service,
            reports,
            clock,
            policy,
            max_active_sessions,
        }
    }

    /// Starts a new interview: best-effort digest extraction, then an Active
    /// session whose first question is always the fixed opener. Any previous
    /// session of the same candidate is discarded.
    pub async fn start(&self, params: StartParams) -> Result<StartedSession> {
        if params.resume_text.trim().is_empty()
            || params.role.trim().is_empty()
            || params.experience_level.trim().is_empty()
        {
            return Err(Error::BadRequest(
                "resume_text, role and experience_level are required".to_string(),
            ));
        }
        if params.time_budget_minutes <= 0 {
            return Err(Error::BadRequest(
                "time_budget_minutes must be positive".to_string(),
            ));
        }

        {
            let sessions = self.sessions.lock().expect("session store mutex poisoned");
            let active = sessions
                .values()
                .filter(|s| {
                    s.stage == SessionStage::Active
                        && s.candidate_external_id != params.candidate_external_id
                })
                .count();
            if active >= self.max_active_sessions {
                return Err(Error::Conflict(
                    "Too many interviews in progress, try again later".to_string(),
                ));
            }
        }

        let digest = self
            .resume_service
            .extract_digest(
                &params.resume_text,
                &params.role,
                &params.experience_level,
            )
            .await;

        let id = Uuid::new_v4();
        let mut session = InterviewSession::new(
            id,
            params.candidate_external_id.clone(),
            params.role,
            params.experience_level,
            params.resume_text,
            params.job_description,
            params.time_budget_minutes,
        );
        let now = self.clock.now();
        session.activate(digest.clone(), OPENING_QUESTION.to_string(), now);

        {
            let mut sessions = self.sessions.lock().expect("session store mutex poisoned");
            sessions.retain(|_, s| s.candidate_external_id != params.candidate_external_id);
            sessions.insert(id, session);
        }

        tracing::info!(session_id = %id, "interview session started");
        Ok(StartedSession {
            session_id: id,
            question: OPENING_QUESTION.to_string(),
            source: QuestionSource::Conversation,
            time_budget_minutes: params.time_budget_minutes,
            digest,
        })
    }

    /// Accepts an answer to the pending question and emits the next one.
    /// Blank answers are rejected before any state change or model call. A
    /// generation that resolves after the session terminated is discarded.
    pub async fn submit_answer(&self, id: Uuid, answer: &str) -> Result<AnswerOutcome> {
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(Error::BadRequest("Answer must not be empty".to_string()));
        }

        // Decide the sourcing plan under the lock; all model calls happen
        // after it is released.
        let (plan, prev_question, prev_source, epoch, role, level, expired) = {
            let mut sessions = self.sessions.lock().expect("session store mutex poisoned");
            let session = sessions
                .get_mut(&id)
                .ok_or_else(|| Error::NotFound("Interview session not found".to_string()))?;

            match session.stage {
                SessionStage::Active => {}
                SessionStage::Completed => {
                    return Ok(AnswerOutcome::Completed(CompletionOutcome {
                        status: completion_status(session),
                        report_id: session.report_id,
                        report: session.report.clone(),
                    }));
                }
                SessionStage::Setup => {
                    return Err(Error::Conflict(
                        "Interview has not been started".to_string(),
                    ));
                }
            }
            if session.in_flight {
                return Err(Error::Conflict(
                    "The previous answer is still being processed".to_string(),
                ));
            }

            let expired = session.is_expired(self.clock.now());
            if expired {
                (
                    QuestionPlan::Conversation,
                    String::new(),
                    QuestionSource::Conversation,
                    0,
                    String::new(),
                    String::new(),
                    true,
                )
            } else {
                let mut rng = rand::thread_rng();
                let plan = plan_next_question(
                    &session.digest,
                    &session.history,
                    session.pending_source,
                    &session.asked_resume_items,
                    &self.policy,
                    &mut rng,
                );
                session.in_flight = true;
                (
                    plan,
                    session.pending_question.clone(),
                    session.pending_source,
                    session.epoch,
                    session.role.clone(),
                    session.experience_level.clone(),
                    false,
                )
            }
        };

        // Safety net for a missed timer tick: an expired session routes into
        // the one termination path instead of producing another question.
        if expired {
            return Ok(AnswerOutcome::Completed(self.finish(id).await?));
        }

        let (generated, evaluation) = match plan {
            QuestionPlan::Conversation => {
                // Conversational follow-ups score the answer they follow.
                let (generated, evaluation) = tokio::join!(
                    self.interview_service.generate_question(
                        &plan,
                        &prev_question,
                        answer,
                        &role,
                        &level,
                    ),
                    self.interview_service
                        .evaluate_answer(&prev_question, answer, &role, &level),
                );
                (generated, evaluation)
            }
            QuestionPlan::Resume { .. } => {
                let generated = self
                    .interview_service
                    .generate_question(&plan, &prev_question, answer, &role, &level)
                    .await;
                (generated, None)
            }
        };

        let mut sessions = self.sessions.lock().expect("session store mutex poisoned");
        let Some(session) = sessions.get_mut(&id) else {
            // Session was discarded while the call was in flight.
            return Err(Error::NotFound("Interview session not found".to_string()));
        };
        session.in_flight = false;

        if session.stage != SessionStage::Active || session.epoch != epoch {
            // Terminated while the generation was in flight; the result is
            // stale and must not be applied.
            tracing::debug!(session_id = %id, "discarding stale question generation");
            return Ok(AnswerOutcome::Completed(CompletionOutcome {
                status: completion_status(session),
                report_id: session.report_id,
                report: session.report.clone(),
            }));
        }

        if let (
            QuestionPlan::Resume {
                category,
                item_index,
                ..
            },
            QuestionSource::Resume,
        ) = (&plan, generated.source)
        {
            session.asked_resume_items.insert((*category, *item_index));
        }

        let turn = ConversationTurn {
            question: prev_question,
            answer: answer.to_string(),
            source: prev_source,
            score: evaluation.as_ref().map(|e| e.score),
            feedback: evaluation.map(|e| e.feedback),
        };
        session.append_turn(turn, generated.question.clone(), generated.source);

        Ok(AnswerOutcome::Next(NextTurn {
            question: generated.question,
            source: generated.source,
            score: session.history.last().and_then(|t| t.score),
            feedback: session.history.last().and_then(|t| t.feedback.clone()),
            answered_count: session.answered_count,
            average_score: session.average_score(),
            remaining_minutes: session.remaining_minutes(self.clock.now()),
        }))
    }

    /// The single termination path, shared by explicit end, timer expiry and
    /// the submit-time deadline check. Idempotent: the Active -> Completed
    /// flip happens exactly once, and only the caller that flipped it runs
    /// report generation.
    pub async fn finish(&self, id: Uuid) -> Result<CompletionOutcome> {
        let snapshot = {
            let mut sessions = self.sessions.lock().expect("session store mutex poisoned");
            let session = sessions
                .get_mut(&id)
                .ok_or_else(|| Error::NotFound("Interview session not found".to_string()))?;

            match session.stage {
                SessionStage::Completed => {
                    return Ok(CompletionOutcome {
                        status: completion_status(session),
                        report_id: session.report_id,
                        report: session.report.clone(),
                    });
                }
                SessionStage::Setup | SessionStage::Active => {
                    session.stage = SessionStage::Completed;
                    // Invalidate any in-flight generation so its result is
                    // dropped when it resolves.
                    session.epoch += 1;
                    (
                        session.candidate_external_id.clone(),
                        session.role.clone(),
                        session.experience_level.clone(),
                        session.resume_text.clone(),
                        session.job_description.clone(),
                        session.history.clone(),
                    )
                }
            }
        };
        let (candidate_external_id, role, level, resume_text, job_description, history) = snapshot;

        tracing::info!(session_id = %id, questions = history.len(), "interview terminated, generating report");
        let report = self
            .summary_service
            .summarize(
                &role,
                &level,
                &resume_text,
                job_description.as_deref(),
                &history,
                self.clock.now(),
            )
            .await;

        let report_id = match self
            .reports
            .save_report(&candidate_external_id, &role, &level, &report)
            .await
        {
            Ok(record_id) => Some(record_id),
            Err(e) => {
                // Degraded but not fatal: the caller still gets the report.
                tracing::error!(session_id = %id, error = ?e, "failed to persist final report");
                None
            }
        };

        let mut sessions = self.sessions.lock().expect("session store mutex poisoned");
        if let Some(session) = sessions.get_mut(&id) {
            session.report = Some(report.clone());
            session.report_id = report_id;
        }

        Ok(CompletionOutcome {
            status: CompletionStatus::Completed,
            report_id,
            report: Some(report),
        })
    }

    /// One pass of the background worker: routes every Active session whose
    /// deadline has passed through the termination path. Returns how many
    /// sessions were expired.
    pub async fn expire_overdue(&self) -> usize {
        let due: Vec<Uuid> = {
            let sessions = self.sessions.lock().expect("session store mutex poisoned");
            let now = self.clock.now();
            sessions
                .values()
                .filter(|s| s.stage == SessionStage::Active && s.is_expired(now))
                .map(|s| s.id)
                .collect()
        };

        for id in &due {
            if let Err(e) = self.finish(*id).await {
                tracing::error!(session_id = %id, error = ?e, "failed to expire session");
            }
        }
        // TODO: evict Completed sessions after a retention window so the map
        // does not accumulate finished interviews between restarts.
        due.len()
    }

    pub fn status(&self, id: Uuid) -> Result<SessionStatus> {
        let sessions = self.sessions.lock().expect("session store mutex poisoned");
        let session = sessions
            .get(&id)
            .ok_or_else(|| Error::NotFound("Interview session not found".to_string()))?;
        let active = session.stage == SessionStage::Active;
        Ok(SessionStatus {
            stage: session.stage,
            pending_question: active.then(|| session.pending_question.clone()),
            pending_source: active.then_some(session.pending_source),
            answered_count: session.answered_count,
            average_score: session.average_score(),
            remaining_minutes: session.remaining_minutes(self.clock.now()),
            report_id: session.report_id,
        })
    }
}

fn completion_status(session: &InterviewSession) -> CompletionStatus {
    if session.report.is_some() {
        CompletionStatus::Completed
    } else {
        CompletionStatus::Completing
    }
}
