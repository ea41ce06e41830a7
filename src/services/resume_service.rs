use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::error::Result;
use crate::models::digest::ResumeDigest;
use crate::services::llm_service::{string_list, CompletionBackend};

/// Reduces free-text resume content into the structured talking points the
/// question selector draws from. Extraction is best-effort: any transport or
/// parse failure yields an all-empty digest so question flow is never
/// blocked on it.
#[derive(Clone)]
pub struct ResumeService {
    backend: Arc<dyn CompletionBackend>,
}

impl ResumeService {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self { backend }
    }

    pub async fn extract_digest(
        &self,
        resume_text: &str,
        role: &str,
        experience_level: &str,
    ) -> ResumeDigest {
        let prompt = extraction_prompt(resume_text, role, experience_level);

        match self.backend.complete_json(&prompt, 0.3).await {
            Ok(value) => coerce_digest(&value),
            Err(e) => {
                tracing::warn!(error = ?e, "resume digest extraction failed, using empty digest");
                ResumeDigest::default()
            }
        }
    }

    /// Same extraction, but the failure is surfaced. Used by the standalone
    /// resume-analysis endpoint where there is no interview to keep alive.
    pub async fn extract_digest_strict(
        &self,
        resume_text: &str,
        role: &str,
        experience_level: &str,
    ) -> Result<ResumeDigest> {
        let prompt = extraction_prompt(resume_text, role, experience_level);
        let value = self.backend.complete_json(&prompt, 0.3).await?;
        Ok(coerce_digest(&value))
    }
}

fn extraction_prompt(resume_text: &str, role: &str, experience_level: &str) -> String {
    format!(
        r#"Analyze this resume for a {role} position at {experience_level} level:
{resume_text}

Extract:
1. 2-3 most relevant technical skills
2. 1-2 notable projects
3. Work experience highlights
4. Any certifications or education relevant to {role}

Return as JSON:
{{
  "skills": ["skill1", "skill2"],
  "projects": ["project1"],
  "experience": ["experience1"],
  "certifications": ["cert1"]
}}"#
    )
}

/// Field-by-field coercion: a malformed or missing field becomes an empty
/// list rather than failing the whole digest. The experience field is
/// accepted under either name the model tends to use.
fn coerce_digest(value: &JsonValue) -> ResumeDigest {
    let mut experience = string_list(value, "experience");
    if experience.is_empty() {
        experience = string_list(value, "experienceHighlights");
    }
    ResumeDigest {
        skills: string_list(value, "skills"),
        projects: string_list(value, "projects"),
        experience_highlights: experience,
        certifications: string_list(value, "certifications"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn coerces_well_formed_reply() {
        let value = json!({
            "skills": ["Go concurrency", "gRPC"],
            "projects": ["payments pipeline"],
            "experience": ["5 years backend"],
            "certifications": []
        });
        let digest = coerce_digest(&value);
        assert_eq!(digest.skills, vec!["Go concurrency", "gRPC"]);
        assert_eq!(digest.projects, vec!["payments pipeline"]);
        assert_eq!(digest.experience_highlights, vec!["5 years backend"]);
        assert!(digest.certifications.is_empty());
    }

    #[test]
    fn malformed_fields_become_empty_not_errors() {
        let value = json!({
            "skills": "not an array",
            "projects": [1, 2, 3],
            "certifications": {"nested": true}
        });
        let digest = coerce_digest(&value);
        assert!(digest.is_empty());
    }

    #[test]
    fn accepts_camel_case_experience_key() {
        let value = json!({"experienceHighlights": ["led a team of four"]});
        let digest = coerce_digest(&value);
        assert_eq!(digest.experience_highlights, vec!["led a team of four"]);
    }

    #[test]
    fn prompt_mentions_role_and_level() {
        let prompt = extraction_prompt("resume body", "Backend Developer", "Mid-level");
        assert!(prompt.contains("Backend Developer position at Mid-level level"));
        assert!(prompt.contains("resume body"));
    }
}
