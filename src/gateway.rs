//! The AI gateway seam: content generation, chat, and syllabus ingestion.
//!
//! Handlers depend on [`AiGateway`] as a trait object, so the HTTP layer can
//! be exercised in tests with a scripted gateway and the real backend can be
//! swapped by configuration. [`create_gateway`] selects the implementation:
//!
//! | `ai.provider` | Implementation |
//! |---------------|----------------|
//! | `"openai"` | [`OpenAiGateway`] — chat completions + embedding retrieval |
//! | `"disabled"` | [`DisabledGateway`] — ingestion/listing only, generation errors |

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::embedding::{embed_query, embed_texts};
use crate::models::{ChatRequest, ContentRequest, SyllabusMaterial, SyllabusMetadata};
use crate::syllabus::SyllabusStore;

/// Embedding inputs are capped to stay inside the model's token window.
const MAX_EMBED_CHARS: usize = 8_000;
/// Cap on each syllabus excerpt threaded into a prompt.
const MAX_EXCERPT_CHARS: usize = 1_500;

#[async_trait]
pub trait AiGateway: Send + Sync {
    /// Generates educational content about a topic.
    async fn generate_content(&self, request: &ContentRequest) -> Result<String>;

    /// Answers a student question, optionally grounded in caller context.
    async fn chat(&self, request: &ChatRequest) -> Result<String>;

    /// Ingests a syllabus material into the retrieval store. Returns `false`
    /// when the material is rejected (nothing usable to store), `Err` on
    /// infrastructure failure.
    async fn add_syllabus_materials(
        &self,
        filename: &str,
        text: &str,
        metadata: &SyllabusMetadata,
    ) -> Result<bool>;

    /// Lists all ingested syllabus materials.
    async fn list_uploaded_syllabus(&self) -> Result<Vec<SyllabusMaterial>>;
}

/// Selects the gateway implementation from configuration.
pub fn create_gateway(config: &Config, pool: SqlitePool) -> Result<Arc<dyn AiGateway>> {
    let store = SyllabusStore::new(pool);
    match config.ai.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiGateway::new(config, store)?)),
        "disabled" => Ok(Arc::new(DisabledGateway { store })),
        other => bail!("Unknown AI provider: {}", other),
    }
}

// ============ OpenAI chat completions wire types ============

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

// ============ OpenAI Gateway ============

/// Gateway backed by the OpenAI API.
///
/// Generation and chat are single-shot calls bounded by the configured
/// timeout; syllabus retrieval embeds the query and ranks stored materials
/// by cosine similarity before prompt assembly.
pub struct OpenAiGateway {
    config: Config,
    store: SyllabusStore,
    client: reqwest::Client,
}

impl OpenAiGateway {
    pub fn new(config: &Config, store: SyllabusStore) -> Result<Self> {
        if std::env::var("OPENAI_API_KEY").is_err() {
            bail!("OPENAI_API_KEY environment variable not set");
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.ai.timeout_secs))
            .build()?;

        Ok(Self {
            config: config.clone(),
            store,
            client,
        })
    }

    async fn chat_completion(&self, system: String, user: String) -> Result<String> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY not set"))?;

        let body = ChatCompletionRequest {
            model: self.config.ai.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system,
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user,
                },
            ],
        };

        let response = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("OpenAI API error {}: {}", status, body_text);
        }

        let completion: ChatCompletionResponse = response.json().await?;
        completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| anyhow::anyhow!("OpenAI response contained no choices"))
    }

    /// Fetches the most relevant stored syllabus excerpts for a query.
    ///
    /// Retrieval failures degrade to an empty context rather than failing
    /// the generation call.
    async fn syllabus_context(&self, query: &str) -> String {
        let query_vec = match embed_query(&self.config.ai, query).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "syllabus retrieval skipped: query embedding failed");
                return String::new();
            }
        };

        let ranked = match self
            .store
            .most_relevant(&query_vec, self.config.ai.max_context_materials)
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "syllabus retrieval skipped: ranking failed");
                return String::new();
            }
        };

        let mut context = String::new();
        for material in ranked {
            let excerpt: String = material.content.chars().take(MAX_EXCERPT_CHARS).collect();
            context.push_str(&format!("[{}]\n{}\n\n", material.filename, excerpt));
        }
        context
    }
}

#[async_trait]
impl AiGateway for OpenAiGateway {
    async fn generate_content(&self, request: &ContentRequest) -> Result<String> {
        let system = format!(
            "You are Learnova, an expert tutor. Produce {} content about the \
             given topic, pitched at a {} student. Ground your answer in the \
             provided syllabus and reference material when relevant.",
            request.content_type,
            request.education_level.replace('_', " "),
        );

        let syllabus = self.syllabus_context(&request.topic).await;
        let mut user = format!("Topic: {}\n", request.topic);
        if !request.reference_material.is_empty() {
            user.push_str(&format!(
                "\nReference material:\n{}\n",
                request.reference_material
            ));
        }
        if !syllabus.is_empty() {
            user.push_str(&format!("\nSyllabus materials:\n{}", syllabus));
        }

        self.chat_completion(system, user).await
    }

    async fn chat(&self, request: &ChatRequest) -> Result<String> {
        let system = format!(
            "You are Learnova, a friendly tutor answering questions for a {} \
             student. Be accurate and concise.",
            request.education_level.replace('_', " "),
        );

        let syllabus = self.syllabus_context(&request.question).await;
        let mut user = format!("Question: {}\n", request.question);
        if !request.context.is_empty() {
            user.push_str(&format!("\nConversation context:\n{}\n", request.context));
        }
        if !syllabus.is_empty() {
            user.push_str(&format!("\nSyllabus materials:\n{}", syllabus));
        }

        self.chat_completion(system, user).await
    }

    async fn add_syllabus_materials(
        &self,
        filename: &str,
        text: &str,
        metadata: &SyllabusMetadata,
    ) -> Result<bool> {
        if text.trim().is_empty() {
            tracing::warn!(filename, "rejecting syllabus material with no extractable text");
            return Ok(false);
        }

        let embed_input: String = text.chars().take(MAX_EMBED_CHARS).collect();
        let vectors = embed_texts(&self.config.ai, &[embed_input]).await?;
        let embedding = vectors
            .first()
            .ok_or_else(|| anyhow::anyhow!("Empty embedding response"))?;

        self.store
            .add(filename, text, metadata, Some(embedding.as_slice()))
            .await?;
        Ok(true)
    }

    async fn list_uploaded_syllabus(&self) -> Result<Vec<SyllabusMaterial>> {
        self.store.list().await
    }
}

// ============ Disabled Gateway ============

/// Gateway used when `ai.provider = "disabled"`.
///
/// Syllabus ingestion and listing still work (no embedding vectors are
/// stored, so retrieval ranking is unavailable); generation and chat fail
/// with a descriptive error.
pub struct DisabledGateway {
    store: SyllabusStore,
}

#[async_trait]
impl AiGateway for DisabledGateway {
    async fn generate_content(&self, _request: &ContentRequest) -> Result<String> {
        bail!("AI provider is disabled")
    }

    async fn chat(&self, _request: &ChatRequest) -> Result<String> {
        bail!("AI provider is disabled")
    }

    async fn add_syllabus_materials(
        &self,
        filename: &str,
        text: &str,
        metadata: &SyllabusMetadata,
    ) -> Result<bool> {
        if text.trim().is_empty() {
            tracing::warn!(filename, "rejecting syllabus material with no extractable text");
            return Ok(false);
        }
        self.store.add(filename, text, metadata, None).await?;
        Ok(true)
    }

    async fn list_uploaded_syllabus(&self) -> Result<Vec<SyllabusMaterial>> {
        self.store.list().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{default_education_level, default_subject};
    use crate::migrate;

    async fn disabled_gateway() -> DisabledGateway {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        migrate::run_migrations(&pool).await.unwrap();
        DisabledGateway {
            store: SyllabusStore::new(pool),
        }
    }

    fn meta() -> SyllabusMetadata {
        SyllabusMetadata::now(default_education_level(), default_subject())
    }

    #[tokio::test]
    async fn disabled_gateway_refuses_generation() {
        let gateway = disabled_gateway().await;
        let request = ContentRequest {
            topic: "Photosynthesis".to_string(),
            education_level: default_education_level(),
            reference_material: String::new(),
            content_type: "explanation".to_string(),
        };
        let err = gateway.generate_content(&request).await.unwrap_err();
        assert!(err.to_string().contains("disabled"));
    }

    #[tokio::test]
    async fn disabled_gateway_still_ingests_and_lists() {
        let gateway = disabled_gateway().await;
        let ok = gateway
            .add_syllabus_materials("bio.txt", "cells divide", &meta())
            .await
            .unwrap();
        assert!(ok);

        let materials = gateway.list_uploaded_syllabus().await.unwrap();
        assert_eq!(materials.len(), 1);
        assert_eq!(materials[0].filename, "bio.txt");
    }

    #[tokio::test]
    async fn empty_material_is_rejected_not_errored() {
        let gateway = disabled_gateway().await;
        let ok = gateway
            .add_syllabus_materials("blank.txt", "   \n", &meta())
            .await
            .unwrap();
        assert!(!ok);
        assert!(gateway.list_uploaded_syllabus().await.unwrap().is_empty());
    }
}
