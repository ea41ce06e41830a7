use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::digest::ResumeDigest;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AnalyzeResumeRequest {
    #[validate(length(min = 1, message = "candidate_external_id is required"))]
    pub candidate_external_id: String,
    #[validate(length(min = 1, message = "resume_text is required"))]
    pub resume_text: String,
    #[validate(length(min = 1, message = "role is required"))]
    pub role: String,
    #[validate(length(min = 1, message = "experience_level is required"))]
    pub experience_level: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeResumeResponse {
    pub analysis_id: Uuid,
    pub digest: ResumeDigest,
}
