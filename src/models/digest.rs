use serde::{Deserialize, Serialize};

/// Condensed resume talking points used to source interview questions.
/// Every field defaults to an empty list; a digest is never partially
/// absent, only empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeDigest {
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub projects: Vec<String>,
    #[serde(default)]
    pub experience_highlights: Vec<String>,
    #[serde(default)]
    pub certifications: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DigestCategory {
    Skills,
    Projects,
    Experience,
    Certifications,
}

impl DigestCategory {
    /// Label interpolated into the question prompt ("this skill", etc.).
    pub fn label(&self) -> &'static str {
        match self {
            DigestCategory::Skills => "skill",
            DigestCategory::Projects => "project",
            DigestCategory::Experience => "experience highlight",
            DigestCategory::Certifications => "certification",
        }
    }
}

impl ResumeDigest {
    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
            && self.projects.is_empty()
            && self.experience_highlights.is_empty()
            && self.certifications.is_empty()
    }

    pub fn items(&self, category: DigestCategory) -> &[String] {
        match category {
            DigestCategory::Skills => &self.skills,
            DigestCategory::Projects => &self.projects,
            DigestCategory::Experience => &self.experience_highlights,
            DigestCategory::Certifications => &self.certifications,
        }
    }

    /// Categories that still have at least one item, in declaration order.
    pub fn non_empty_categories(&self) -> Vec<DigestCategory> {
        [
            DigestCategory::Skills,
            DigestCategory::Projects,
            DigestCategory::Experience,
            DigestCategory::Certifications,
        ]
        .into_iter()
        .filter(|c| !self.items(*c).is_empty())
        .collect()
    }

    pub fn total_items(&self) -> usize {
        self.skills.len()
            + self.projects.len()
            + self.experience_highlights.len()
            + self.certifications.len()
    }
}
