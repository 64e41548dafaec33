//! Summary drafting from the rest of the resume.

use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::generation::prompts::{SUMMARY_PROMPT_TEMPLATE, SUMMARY_SYSTEM};
use crate::llm_client::LlmClient;
use crate::models::document::{Education, WorkExperience};

const MISSING: &str = "N/A";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateSummaryInput {
    pub job_title: Option<String>,
    #[serde(default)]
    pub work_experiences: Vec<WorkExperience>,
    #[serde(default)]
    pub educations: Vec<Education>,
    #[serde(default)]
    pub skills: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateSummaryResponse {
    pub summary: String,
}

fn or_missing(value: Option<&str>) -> &str {
    value.filter(|v| !v.trim().is_empty()).unwrap_or(MISSING)
}

fn date_or_missing(date: Option<chrono::NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| MISSING.to_string())
}

pub fn build_summary_prompt(input: &GenerateSummaryInput) -> String {
    let work_experiences = input
        .work_experiences
        .iter()
        .map(|exp| {
            format!(
                "Position: {}, Company: {}, Start Date: {}, End Date: {}, Description: {}",
                or_missing(exp.position.as_deref()),
                or_missing(exp.company.as_deref()),
                date_or_missing(exp.start_date),
                date_or_missing(exp.end_date),
                or_missing(exp.description.as_deref()),
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    let educations = input
        .educations
        .iter()
        .map(|edu| {
            format!(
                "Degree: {}, School: {}, Start Date: {}, End Date: {}",
                or_missing(edu.degree.as_deref()),
                or_missing(edu.school.as_deref()),
                date_or_missing(edu.start_date),
                date_or_missing(edu.end_date),
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    SUMMARY_PROMPT_TEMPLATE
        .replace("{job_title}", or_missing(input.job_title.as_deref()))
        .replace("{work_experiences}", &work_experiences)
        .replace("{educations}", &educations)
        .replace("{skills}", &input.skills.join(", "))
}

/// Drafts a professional summary for the resume described by `input`.
pub async fn generate_summary(
    input: &GenerateSummaryInput,
    llm: &LlmClient,
) -> Result<String, AppError> {
    let prompt = build_summary_prompt(input);
    llm.call_text(&prompt, SUMMARY_SYSTEM)
        .await
        .map_err(|e| AppError::Llm(format!("Summary generation failed: {e}")))
}
