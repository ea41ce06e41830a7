use async_trait::async_trait;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::digest::ResumeDigest;
use crate::models::report::{FinalReport, InterviewReportRecord, ResumeAnalysisRecord};

/// Write-side boundary the session controller hands finished reports to.
/// Kept as a trait so the interview flow can run against an in-memory sink.
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn save_report(
        &self,
        candidate_external_id: &str,
        role: &str,
        experience_level: &str,
        report: &FinalReport,
    ) -> Result<Uuid>;
}

#[derive(Debug, Clone, Serialize)]
pub struct RecentActivity {
    pub resume: Vec<ResumeAnalysisRecord>,
    pub interview: Vec<InterviewReportRecord>,
}

/// Postgres-backed persistence for final artifacts: interview reports and
/// standalone resume analyses. Live session state never reaches the
/// database.
#[derive(Clone)]
pub struct ReportService {
    pool: PgPool,
}

impl ReportService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_report(&self, id: Uuid) -> Result<InterviewReportRecord> {
        let record = sqlx::query_as::<_, InterviewReportRecord>(
            r#"SELECT id, candidate_external_id, role, experience_level, report, created_at
               FROM interview_reports WHERE id = $1"#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(record)
    }

    pub async fn save_resume_analysis(
        &self,
        candidate_external_id: &str,
        role: &str,
        digest: &ResumeDigest,
    ) -> Result<Uuid> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"INSERT INTO resume_analyses (id, candidate_external_id, role, digest)
               VALUES ($1, $2, $3, $4)"#,
        )
        .bind(id)
        .bind(candidate_external_id)
        .bind(role)
        .bind(serde_json::to_value(digest)?)
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    /// The ten newest artifacts of each kind for a candidate.
    pub async fn recent_activity(&self, candidate_external_id: &str) -> Result<RecentActivity> {
        let resume = sqlx::query_as::<_, ResumeAnalysisRecord>(
            r#"SELECT id, candidate_external_id, role, digest, created_at
               FROM resume_analyses WHERE candidate_external_id = $1
               ORDER BY created_at DESC LIMIT 10"#,
        )
        .bind(candidate_external_id)
        .fetch_all(&self.pool)
        .await?;

        let interview = sqlx::query_as::<_, InterviewReportRecord>(
            r#"SELECT id, candidate_external_id, role, experience_level, report, created_at
               FROM interview_reports WHERE candidate_external_id = $1
               ORDER BY created_at DESC LIMIT 10"#,
        )
        .bind(candidate_external_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(RecentActivity { resume, interview })
    }
}

#[async_trait]
impl ReportSink for ReportService {
    async fn save_report(
        &self,
        candidate_external_id: &str,
        role: &str,
        experience_level: &str,
        report: &FinalReport,
    ) -> Result<Uuid> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"INSERT INTO interview_reports (id, candidate_external_id, role, experience_level, report)
               VALUES ($1, $2, $3, $4, $5)"#,
        )
        .bind(id)
        .bind(candidate_external_id)
        .bind(role)
        .bind(experience_level)
        .bind(serde_json::to_value(report)?)
        .execute(&self.pool)
        .await?;
        Ok(id)
    }
}
