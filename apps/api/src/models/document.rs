//! The resume-in-progress as the editor holds it.
//!
//! `ResumeValues` is plain owned data: cloning it produces an independent copy,
//! and photo payloads live in immutable `Bytes`, so a snapshot never aliases
//! mutable state with the live document.

use bytes::Bytes;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BorderStyle {
    Square,
    Circle,
    Squircle,
}

impl BorderStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            BorderStyle::Square => "square",
            BorderStyle::Circle => "circle",
            BorderStyle::Squircle => "squircle",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "square" => Some(BorderStyle::Square),
            "circle" => Some(BorderStyle::Circle),
            "squircle" => Some(BorderStyle::Squircle),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkExperience {
    pub position: Option<String>,
    pub company: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Education {
    pub degree: Option<String>,
    pub school: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// A locally selected photo that has not been uploaded yet.
///
/// Only the metadata is serialized. The payload travels out of band
/// (multipart upload, object store put) and never enters a fingerprint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoBlob {
    pub name: String,
    pub size: u64,
    /// Milliseconds since the Unix epoch, as reported by the file picker.
    pub last_modified: i64,
    pub content_type: Option<String>,
    #[serde(skip)]
    pub bytes: Bytes,
}

impl PhotoBlob {
    pub fn new(name: impl Into<String>, last_modified: i64, bytes: Bytes) -> Self {
        Self {
            name: name.into(),
            size: bytes.len() as u64,
            last_modified,
            content_type: None,
            bytes,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Cheap identity used instead of comparing payload bytes.
    pub fn proxy(&self) -> (&str, u64, i64) {
        (&self.name, self.size, self.last_modified)
    }

    /// Declared content type, or one guessed from the extension.
    pub fn media_type(&self) -> Option<&str> {
        if let Some(content_type) = self.content_type.as_deref() {
            return Some(content_type);
        }
        match self.extension().as_str() {
            ".png" => Some("image/png"),
            ".jpg" | ".jpeg" => Some("image/jpeg"),
            ".gif" => Some("image/gif"),
            ".webp" => Some("image/webp"),
            _ => None,
        }
    }

    /// File extension including the leading dot, lowercased. Empty when the name has none.
    pub fn extension(&self) -> String {
        match self.name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {
                format!(".{}", ext.to_ascii_lowercase())
            }
            _ => String::new(),
        }
    }
}

/// The photo field of a resume.
///
/// Wire form: `Unset` is omitted, `Removed` is `null`, `Remote` is the URL
/// string and `Pending` is the blob metadata object.
#[derive(Debug, Clone, Default)]
pub enum Photo {
    #[default]
    Unset,
    Remote(String),
    Pending(PhotoBlob),
    Removed,
}

impl Photo {
    pub fn is_unset(&self) -> bool {
        matches!(self, Photo::Unset)
    }
}

impl Serialize for Photo {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Photo::Unset | Photo::Removed => serializer.serialize_none(),
            Photo::Remote(url) => serializer.serialize_str(url),
            Photo::Pending(blob) => blob.serialize(serializer),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PhotoRepr {
    Remote(String),
    Pending(PhotoBlob),
}

impl<'de> Deserialize<'de> for Photo {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // A missing field never reaches here (`#[serde(default)]` yields Unset),
        // so an explicit null means the user cleared the photo.
        Ok(match Option::<PhotoRepr>::deserialize(deserializer)? {
            None => Photo::Removed,
            Some(PhotoRepr::Remote(url)) => Photo::Remote(url),
            Some(PhotoRepr::Pending(blob)) => Photo::Pending(blob),
        })
    }
}

/// Full editor state for one resume.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeValues {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,

    pub title: Option<String>,
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Photo::is_unset")]
    pub photo: Photo,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub job_title: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,

    #[serde(default)]
    pub work_experiences: Vec<WorkExperience>,
    #[serde(default)]
    pub educations: Vec<Education>,
    #[serde(default)]
    pub skills: Vec<String>,
    pub summary: Option<String>,

    pub color_hex: Option<String>,
    pub border_style: Option<BorderStyle>,
}
