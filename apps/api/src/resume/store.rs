//! PostgreSQL-backed resume persistence; the server side of the autosave gateway.
//!
//! A save replaces the whole document: scalar fields are overwritten and the
//! work experience / education lists are rewritten inside one transaction.
//! The photo is the exception: it only changes when the payload carries one.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{info, warn};
use uuid::Uuid;

use crate::autosave::gateway::{GatewayError, PersistenceGateway, SavePayload, SaveReceipt};
use crate::errors::AppError;
use crate::models::document::{Photo, PhotoBlob, ResumeValues};
use crate::models::resume::{EducationRow, ResumeRecord, ResumeRow, WorkExperienceRow};
use crate::resume::form::MAX_PHOTO_BYTES;
use crate::resume::photos::{photo_key, PhotoStore};

/// Resumes a free account may hold.
pub const MAX_FREE_RESUMES: i64 = 3;

const DEFAULT_COLOR_HEX: &str = "#000000";
const DEFAULT_BORDER_STYLE: &str = "squircle";

/// What a save does to the stored photo URL.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PhotoChange {
    Keep,
    Set(String),
    Clear,
}

#[derive(Clone)]
pub struct ResumeStore {
    db: PgPool,
    photos: Arc<dyn PhotoStore>,
    /// `None` disables the per-user quota.
    quota: Option<i64>,
}

impl ResumeStore {
    pub fn new(db: PgPool, photos: Arc<dyn PhotoStore>, quota: Option<i64>) -> Self {
        Self { db, photos, quota }
    }

    /// A gateway that saves on behalf of `user_id`.
    pub fn gateway(&self, user_id: Uuid) -> StoreGateway {
        StoreGateway {
            store: self.clone(),
            user_id,
        }
    }

    /// Creates or updates a resume owned by `user_id`.
    pub async fn save(&self, user_id: Uuid, payload: SavePayload) -> Result<SaveReceipt, AppError> {
        let SavePayload { values, photo, id } = payload;
        validate_values(&values)?;
        if let Some(Photo::Pending(blob)) = &photo {
            validate_photo(blob)?;
        }

        let existing = match id {
            Some(id) => Some(
                self.find_row(id, user_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("Resume {id} not found")))?,
            ),
            None => {
                let count = self.count(user_id).await?;
                if !quota_allows(count, self.quota) {
                    return Err(AppError::Forbidden(format!(
                        "Resume limit reached ({count} of {})",
                        self.quota.unwrap_or_default()
                    )));
                }
                None
            }
        };
        let previous_url = existing.as_ref().and_then(|row| row.photo_url.clone());

        let change = match photo {
            Some(Photo::Pending(blob)) => {
                let url = self.photos.put(&photo_key(&blob), &blob).await?;
                PhotoChange::Set(url)
            }
            Some(Photo::Removed) => PhotoChange::Clear,
            Some(Photo::Remote(_)) | Some(Photo::Unset) | None => PhotoChange::Keep,
        };

        let resume_id = match self
            .persist(user_id, existing.as_ref(), &values, &change)
            .await
        {
            Ok(id) => id,
            Err(e) => {
                // The row never pointed at the new upload.
                if let PhotoChange::Set(url) = &change {
                    self.discard_photo(Some(url)).await;
                }
                return Err(e);
            }
        };

        if existing.is_some() {
            info!("Updated resume {resume_id} for user {user_id}");
        } else {
            info!("Created resume {resume_id} for user {user_id}");
        }

        let photo_url = match change {
            PhotoChange::Keep => previous_url,
            PhotoChange::Set(url) => {
                self.discard_photo(previous_url.as_deref()).await;
                Some(url)
            }
            PhotoChange::Clear => {
                self.discard_photo(previous_url.as_deref()).await;
                None
            }
        };

        Ok(SaveReceipt {
            id: resume_id,
            photo_url,
        })
    }

    async fn persist(
        &self,
        user_id: Uuid,
        existing: Option<&ResumeRow>,
        values: &ResumeValues,
        change: &PhotoChange,
    ) -> Result<Uuid, AppError> {
        let mut tx = self.db.begin().await?;
        let resume_id = match existing {
            Some(row) => {
                update_resume(&mut tx, row.id, values, change).await?;
                row.id
            }
            None => insert_resume(&mut tx, user_id, values, change).await?,
        };
        replace_sections(&mut tx, resume_id, values).await?;
        tx.commit().await?;
        Ok(resume_id)
    }

    /// Best effort: the row no longer references the photo either way.
    async fn discard_photo(&self, url: Option<&str>) {
        if let Some(url) = url {
            if let Err(e) = self.photos.delete(url).await {
                warn!("Failed to delete replaced photo {url}: {e}");
            }
        }
    }

    async fn find_row(&self, id: Uuid, user_id: Uuid) -> Result<Option<ResumeRow>, AppError> {
        Ok(
            sqlx::query_as::<_, ResumeRow>("SELECT * FROM resumes WHERE id = $1 AND user_id = $2")
                .bind(id)
                .bind(user_id)
                .fetch_optional(&self.db)
                .await?,
        )
    }

    pub async fn count(&self, user_id: Uuid) -> Result<i64, AppError> {
        Ok(
            sqlx::query_scalar("SELECT COUNT(*) FROM resumes WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.db)
                .await?,
        )
    }

    pub fn can_create(&self, count: i64) -> bool {
        quota_allows(count, self.quota)
    }

    /// Loads a resume with its sections.
    pub async fn get(&self, id: Uuid, user_id: Uuid) -> Result<ResumeRecord, AppError> {
        let resume = self
            .find_row(id, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Resume {id} not found")))?;
        let mut records = self.attach_sections(vec![resume]).await?;
        records
            .pop()
            .ok_or_else(|| AppError::NotFound(format!("Resume {id} not found")))
    }

    /// All resumes of a user, most recently updated first.
    pub async fn list(&self, user_id: Uuid) -> Result<Vec<ResumeRecord>, AppError> {
        let rows = sqlx::query_as::<_, ResumeRow>(
            "SELECT * FROM resumes WHERE user_id = $1 ORDER BY updated_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        self.attach_sections(rows).await
    }

    /// Deletes a resume, its sections (cascade) and its stored photo.
    pub async fn delete(&self, id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        let row = self
            .find_row(id, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Resume {id} not found")))?;

        sqlx::query("DELETE FROM resumes WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        info!("Deleted resume {id} for user {user_id}");

        self.discard_photo(row.photo_url.as_deref()).await;
        Ok(())
    }

    async fn attach_sections(&self, rows: Vec<ResumeRow>) -> Result<Vec<ResumeRecord>, AppError> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();

        let work_experiences = sqlx::query_as::<_, WorkExperienceRow>(
            "SELECT * FROM work_experiences WHERE resume_id = ANY($1) ORDER BY resume_id, sort_order",
        )
        .bind(&ids)
        .fetch_all(&self.db)
        .await?;
        let educations = sqlx::query_as::<_, EducationRow>(
            "SELECT * FROM educations WHERE resume_id = ANY($1) ORDER BY resume_id, sort_order",
        )
        .bind(&ids)
        .fetch_all(&self.db)
        .await?;

        let mut work_by_resume: HashMap<Uuid, Vec<WorkExperienceRow>> = HashMap::new();
        for row in work_experiences {
            work_by_resume.entry(row.resume_id).or_default().push(row);
        }
        let mut education_by_resume: HashMap<Uuid, Vec<EducationRow>> = HashMap::new();
        for row in educations {
            education_by_resume.entry(row.resume_id).or_default().push(row);
        }

        Ok(rows
            .into_iter()
            .map(|resume| ResumeRecord {
                work_experiences: work_by_resume.remove(&resume.id).unwrap_or_default(),
                educations: education_by_resume.remove(&resume.id).unwrap_or_default(),
                resume,
            })
            .collect())
    }
}

async fn insert_resume(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    values: &ResumeValues,
    change: &PhotoChange,
) -> Result<Uuid, AppError> {
    let id = Uuid::new_v4();
    let photo_url = match change {
        PhotoChange::Set(url) => Some(url.as_str()),
        PhotoChange::Keep | PhotoChange::Clear => None,
    };
    sqlx::query(
        r#"
        INSERT INTO resumes
            (id, user_id, title, description, photo_url, color_hex, border_style, summary,
             first_name, last_name, job_title, city, country, phone, email, skills)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(&values.title)
    .bind(&values.description)
    .bind(photo_url)
    .bind(color_hex(values))
    .bind(border_style(values))
    .bind(&values.summary)
    .bind(&values.first_name)
    .bind(&values.last_name)
    .bind(&values.job_title)
    .bind(&values.city)
    .bind(&values.country)
    .bind(&values.phone)
    .bind(&values.email)
    .bind(&values.skills)
    .execute(&mut **tx)
    .await?;
    Ok(id)
}

async fn update_resume(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    values: &ResumeValues,
    change: &PhotoChange,
) -> Result<(), AppError> {
    let (touch_photo, photo_url) = match change {
        PhotoChange::Keep => (false, None),
        PhotoChange::Set(url) => (true, Some(url.as_str())),
        PhotoChange::Clear => (true, None),
    };
    sqlx::query(
        r#"
        UPDATE resumes SET
            title = $2,
            description = $3,
            photo_url = CASE WHEN $4 THEN $5 ELSE photo_url END,
            color_hex = $6,
            border_style = $7,
            summary = $8,
            first_name = $9,
            last_name = $10,
            job_title = $11,
            city = $12,
            country = $13,
            phone = $14,
            email = $15,
            skills = $16,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(&values.title)
    .bind(&values.description)
    .bind(touch_photo)
    .bind(photo_url)
    .bind(color_hex(values))
    .bind(border_style(values))
    .bind(&values.summary)
    .bind(&values.first_name)
    .bind(&values.last_name)
    .bind(&values.job_title)
    .bind(&values.city)
    .bind(&values.country)
    .bind(&values.phone)
    .bind(&values.email)
    .bind(&values.skills)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Rewrites both child lists; their order is the editor's order.
async fn replace_sections(
    tx: &mut Transaction<'_, Postgres>,
    resume_id: Uuid,
    values: &ResumeValues,
) -> Result<(), AppError> {
    sqlx::query("DELETE FROM work_experiences WHERE resume_id = $1")
        .bind(resume_id)
        .execute(&mut **tx)
        .await?;
    for (order, exp) in values.work_experiences.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO work_experiences
                (id, resume_id, sort_order, position, company, start_date, end_date, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(resume_id)
        .bind(order as i32)
        .bind(&exp.position)
        .bind(&exp.company)
        .bind(exp.start_date)
        .bind(exp.end_date)
        .bind(&exp.description)
        .execute(&mut **tx)
        .await?;
    }

    sqlx::query("DELETE FROM educations WHERE resume_id = $1")
        .bind(resume_id)
        .execute(&mut **tx)
        .await?;
    for (order, edu) in values.educations.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO educations
                (id, resume_id, sort_order, degree, school, start_date, end_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(resume_id)
        .bind(order as i32)
        .bind(&edu.degree)
        .bind(&edu.school)
        .bind(edu.start_date)
        .bind(edu.end_date)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

fn color_hex(values: &ResumeValues) -> &str {
    values.color_hex.as_deref().unwrap_or(DEFAULT_COLOR_HEX)
}

fn border_style(values: &ResumeValues) -> &'static str {
    values
        .border_style
        .map(|style| style.as_str())
        .unwrap_or(DEFAULT_BORDER_STYLE)
}

fn quota_allows(count: i64, quota: Option<i64>) -> bool {
    quota.map_or(true, |max| count < max)
}

fn validate_values(values: &ResumeValues) -> Result<(), AppError> {
    if let Some(hex) = values.color_hex.as_deref() {
        let digits = hex.strip_prefix('#').unwrap_or("");
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(AppError::Validation(format!(
                "colorHex must look like #RRGGBB, got '{hex}'"
            )));
        }
    }
    for exp in &values.work_experiences {
        if let (Some(start), Some(end)) = (exp.start_date, exp.end_date) {
            if end < start {
                return Err(AppError::Validation(
                    "work experience ends before it starts".to_string(),
                ));
            }
        }
    }
    Ok(())
}

fn validate_photo(blob: &PhotoBlob) -> Result<(), AppError> {
    if blob.bytes.len() > MAX_PHOTO_BYTES {
        return Err(AppError::Validation(format!(
            "photo must be at most {} MB",
            MAX_PHOTO_BYTES / (1024 * 1024)
        )));
    }
    match blob.media_type() {
        Some(ct) if ct.starts_with("image/") => Ok(()),
        _ => Err(AppError::Validation("photo must be an image".to_string())),
    }
}

/// [`ResumeStore`] bound to one user, usable wherever the autosave core
/// expects a gateway.
#[derive(Clone)]
pub struct StoreGateway {
    store: ResumeStore,
    user_id: Uuid,
}

#[async_trait]
impl PersistenceGateway for StoreGateway {
    async fn save(&self, payload: SavePayload) -> Result<SaveReceipt, GatewayError> {
        let id = payload.id;
        self.store
            .save(self.user_id, payload)
            .await
            .map_err(|e| gateway_error(e, id))
    }
}

fn gateway_error(error: AppError, id: Option<Uuid>) -> GatewayError {
    let status = error.status().as_u16();
    match error {
        AppError::NotFound(message) => match id {
            Some(id) => GatewayError::NotFound(id),
            None => GatewayError::Rejected { status, message },
        },
        AppError::Validation(message) | AppError::Forbidden(message) => {
            GatewayError::Rejected { status, message }
        }
        AppError::Storage(message) => GatewayError::Storage(message),
        other => GatewayError::Internal(other.to_string()),
    }
}
