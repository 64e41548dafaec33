use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::document::{BorderStyle, Education, Photo, ResumeValues, WorkExperience};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResumeRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: Option<String>,
    pub description: Option<String>,
    pub photo_url: Option<String>,
    pub color_hex: String,
    pub border_style: String,
    pub summary: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub job_title: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub skills: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WorkExperienceRow {
    pub id: Uuid,
    pub resume_id: Uuid,
    pub sort_order: i32,
    pub position: Option<String>,
    pub company: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EducationRow {
    pub id: Uuid,
    pub resume_id: Uuid,
    pub sort_order: i32,
    pub degree: Option<String>,
    pub school: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// A resume row joined with its child sections.
#[derive(Debug, Clone, Serialize)]
pub struct ResumeRecord {
    pub resume: ResumeRow,
    pub work_experiences: Vec<WorkExperienceRow>,
    pub educations: Vec<EducationRow>,
}

impl ResumeRecord {
    /// Hydrates editor state from a persisted record.
    pub fn into_values(self) -> ResumeValues {
        let ResumeRecord {
            resume,
            work_experiences,
            educations,
        } = self;
        ResumeValues {
            id: Some(resume.id),
            title: resume.title,
            description: resume.description,
            photo: resume.photo_url.map(Photo::Remote).unwrap_or_default(),
            first_name: resume.first_name,
            last_name: resume.last_name,
            job_title: resume.job_title,
            city: resume.city,
            country: resume.country,
            phone: resume.phone,
            email: resume.email,
            work_experiences: work_experiences
                .into_iter()
                .map(|w| WorkExperience {
                    position: w.position,
                    company: w.company,
                    start_date: w.start_date,
                    end_date: w.end_date,
                    description: w.description,
                })
                .collect(),
            educations: educations
                .into_iter()
                .map(|e| Education {
                    degree: e.degree,
                    school: e.school,
                    start_date: e.start_date,
                    end_date: e.end_date,
                })
                .collect(),
            skills: resume.skills,
            summary: resume.summary,
            color_hex: Some(resume.color_hex),
            border_style: BorderStyle::parse(&resume.border_style),
        }
    }
}
