//! Work-experience drafting from a free-text description.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::errors::AppError;
use crate::generation::prompts::{WORK_EXPERIENCE_PROMPT_TEMPLATE, WORK_EXPERIENCE_SYSTEM};
use crate::llm_client::LlmClient;
use crate::models::document::WorkExperience;

pub const MIN_DESCRIPTION_CHARS: usize = 20;

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateWorkExperienceInput {
    pub description: String,
}

impl GenerateWorkExperienceInput {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.description.trim().chars().count() < MIN_DESCRIPTION_CHARS {
            return Err(AppError::Validation(format!(
                "description must be at least {MIN_DESCRIPTION_CHARS} characters"
            )));
        }
        Ok(())
    }
}

/// Case-insensitive `label` prefix match; returns the rest of the line.
fn strip_label<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    let head = line.get(..label.len())?;
    head.eq_ignore_ascii_case(label)
        .then(|| line[label.len()..].trim())
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.get(..10)?, "%Y-%m-%d").ok()
}

/// Reads the labelled answer format requested by `WORK_EXPERIENCE_SYSTEM`.
///
/// Labels may appear in any order and case. Everything after `Description:`
/// belongs to the description. Missing labels leave their field empty.
pub fn parse_work_experience(text: &str) -> WorkExperience {
    let mut experience = WorkExperience::default();
    let mut lines = text.lines();

    while let Some(line) = lines.next() {
        let line = line.trim();
        if let Some(rest) = strip_label(line, "description:") {
            let mut description = rest.to_string();
            for next in lines.by_ref() {
                description.push('\n');
                description.push_str(next);
            }
            experience.description = non_empty(description.trim());
            break;
        } else if let Some(rest) = strip_label(line, "job title:") {
            experience.position = non_empty(rest);
        } else if let Some(rest) = strip_label(line, "company:") {
            experience.company = non_empty(rest);
        } else if let Some(rest) = strip_label(line, "start date:") {
            experience.start_date = parse_date(rest);
        } else if let Some(rest) = strip_label(line, "end date:") {
            experience.end_date = parse_date(rest);
        }
    }
    experience
}

/// Drafts a single work experience entry from the user's description.
pub async fn generate_work_experience(
    input: &GenerateWorkExperienceInput,
    llm: &LlmClient,
) -> Result<WorkExperience, AppError> {
    input.validate()?;
    let prompt = WORK_EXPERIENCE_PROMPT_TEMPLATE.replace("{description}", input.description.trim());
    let text = llm
        .call_text(&prompt, WORK_EXPERIENCE_SYSTEM)
        .await
        .map_err(|e| AppError::Llm(format!("Work experience generation failed: {e}")))?;
    Ok(parse_work_experience(&text))
}
