use anyhow::{Context, Result};

use crate::resume::store::MAX_FREE_RESUMES;

/// Application configuration loaded from environment variables.
/// Startup fails if a required variable is missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    /// Base URL photos are served from; stored photo URLs start with it.
    pub s3_public_url: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,
    /// Resumes a user may own. `None` means unlimited.
    pub resume_quota: Option<i64>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            s3_public_url: require_env("S3_PUBLIC_URL")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            resume_quota: parse_quota(std::env::var("RESUME_QUOTA").ok().as_deref())?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Unset falls back to the free-tier limit; `0` disables the quota.
fn parse_quota(raw: Option<&str>) -> Result<Option<i64>> {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return Ok(Some(MAX_FREE_RESUMES));
    };
    let quota = raw
        .parse::<u32>()
        .context("RESUME_QUOTA must be a non-negative integer")?;
    Ok((quota > 0).then_some(i64::from(quota)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_defaults_to_free_tier() {
        assert_eq!(parse_quota(None).unwrap(), Some(MAX_FREE_RESUMES));
        assert_eq!(parse_quota(Some("  ")).unwrap(), Some(MAX_FREE_RESUMES));
    }

    #[test]
    fn test_quota_zero_is_unlimited() {
        assert_eq!(parse_quota(Some("0")).unwrap(), None);
        assert_eq!(parse_quota(Some("10")).unwrap(), Some(10));
    }

    #[test]
    fn test_quota_rejects_garbage() {
        assert!(parse_quota(Some("-1")).is_err());
        assert!(parse_quota(Some("lots")).is_err());
    }
}
