//! Where the user is in the editor.
//!
//! The session owns this state. The query string is derived from it for
//! shareable links and is parsed only once, when an editor is opened.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EditorStep {
    #[default]
    GeneralInfo,
    PersonalInfo,
    WorkExperience,
    Education,
    Skills,
    Summary,
}

impl EditorStep {
    pub const ALL: [EditorStep; 6] = [
        EditorStep::GeneralInfo,
        EditorStep::PersonalInfo,
        EditorStep::WorkExperience,
        EditorStep::Education,
        EditorStep::Skills,
        EditorStep::Summary,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            EditorStep::GeneralInfo => "general-info",
            EditorStep::PersonalInfo => "personal-info",
            EditorStep::WorkExperience => "work-experience",
            EditorStep::Education => "education",
            EditorStep::Skills => "skills",
            EditorStep::Summary => "summary",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|step| step.key() == key)
    }

    pub fn title(&self) -> &'static str {
        match self {
            EditorStep::GeneralInfo => "General info",
            EditorStep::PersonalInfo => "Personal info",
            EditorStep::WorkExperience => "Work experience",
            EditorStep::Education => "Education",
            EditorStep::Skills => "Skills",
            EditorStep::Summary => "Summary",
        }
    }

    fn index(&self) -> usize {
        Self::ALL.iter().position(|s| s == self).unwrap_or(0)
    }

    pub fn next(&self) -> Option<Self> {
        Self::ALL.get(self.index() + 1).copied()
    }

    pub fn previous(&self) -> Option<Self> {
        self.index().checked_sub(1).map(|i| Self::ALL[i])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorLocation {
    pub step: EditorStep,
    pub resume_id: Option<Uuid>,
}

impl EditorLocation {
    /// Parses `step=...&resumeId=...`. Unknown steps fall back to the first
    /// one and malformed ids are dropped.
    pub fn from_query(query: &str) -> Self {
        let mut location = EditorLocation::default();
        for pair in query.trim_start_matches('?').split('&') {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            match key {
                "step" => location.step = EditorStep::from_key(value).unwrap_or_default(),
                "resumeId" => location.resume_id = Uuid::parse_str(value).ok(),
                _ => {}
            }
        }
        location
    }

    pub fn to_query(&self) -> String {
        match self.resume_id {
            Some(id) => format!("step={}&resumeId={}", self.step.key(), id),
            None => format!("step={}", self.step.key()),
        }
    }
}
