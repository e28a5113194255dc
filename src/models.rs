//! Request and response types for the Learnova JSON API.
//!
//! Optional request fields carry the documented defaults at the type level,
//! so every handler sees a fully-populated request after deserialization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{default_content_type, default_education_level};

/// Body of `POST /api/generate-content`.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentRequest {
    /// The topic to generate content about. Required, must be non-empty.
    #[serde(default)]
    pub topic: String,
    #[serde(default = "default_education_level")]
    pub education_level: String,
    /// Caller-supplied material the generation should lean on.
    #[serde(default)]
    pub reference_material: String,
    /// Generation mode, e.g. `"explanation"`, `"quiz"`, `"summary"`.
    #[serde(default = "default_content_type")]
    pub content_type: String,
}

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    /// The question to answer. Required, must be non-empty.
    #[serde(default)]
    pub question: String,
    #[serde(default = "default_education_level")]
    pub education_level: String,
    /// Optional conversation context carried by the caller.
    #[serde(default)]
    pub context: String,
}

/// Metadata attached to a syllabus material at ingestion time.
/// Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyllabusMetadata {
    pub education_level: String,
    pub subject: String,
    /// ISO-8601 ingestion timestamp.
    pub upload_date: DateTime<Utc>,
}

impl SyllabusMetadata {
    pub fn now(education_level: String, subject: String) -> Self {
        Self {
            education_level,
            subject,
            upload_date: Utc::now(),
        }
    }
}

/// A stored syllabus material as returned by `GET /api/syllabus/list`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyllabusMaterial {
    pub filename: String,
    pub education_level: String,
    pub subject: String,
    pub upload_date: DateTime<Utc>,
    /// Length of the extracted text, in characters.
    pub chars: usize,
}
