pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use reqwest::Client;
use sqlx::PgPool;

use crate::services::interview_service::{InterviewService, QuestionPolicy};
use crate::services::llm_service::{CompletionBackend, OpenAiBackend};
use crate::services::report_service::ReportService;
use crate::services::resume_service::ResumeService;
use crate::services::session_service::SessionService;
use crate::services::summary_service::SummaryService;
use crate::utils::clock::SystemClock;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub session_service: SessionService,
    pub resume_service: ResumeService,
    pub report_service: ReportService,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        let config = crate::config::get_config();
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .unwrap();

        let backend: Arc<dyn CompletionBackend> = Arc::new(OpenAiBackend::new(
            config.openai_api_key.clone(),
            config.openai_base_url.clone(),
            config.openai_model.clone(),
            http_client,
        ));

        let resume_service = ResumeService::new(backend.clone());
        let interview_service = InterviewService::new(backend.clone());
        let summary_service = SummaryService::new(backend);
        let report_service = ReportService::new(pool.clone());

        let policy = QuestionPolicy {
            resume_switch_probability: config.resume_switch_probability,
            max_thread_depth: config.max_thread_depth,
            max_consecutive_resume: config.max_consecutive_resume,
            avoid_repeat_resume_items: config.avoid_repeat_resume_items,
        };

        let session_service = SessionService::new(
            resume_service.clone(),
            interview_service,
            summary_service,
            Arc::new(report_service.clone()),
            Arc::new(SystemClock),
            policy,
            config.max_active_sessions,
        );

        Self {
            pool,
            session_service,
            resume_service,
            report_service,
        }
    }
}
