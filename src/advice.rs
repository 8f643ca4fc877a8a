use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

pub const PIVOT_LANGUAGE: &str = "en";
pub const GENERATION_DISABLED: &str = "AI assistant is disabled in deployed version.";
pub const GENERATION_FAILED: &str = "AI assistant is temporarily unavailable.";

#[async_trait::async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, target: &str) -> Result<String, ServiceError>;
}

#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, ServiceError>;
}

/// Missing or `null` fields fall back to an empty message and English.
#[derive(Debug, Default, Deserialize)]
pub struct AdviceRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub lang: Option<String>,
}

impl AdviceRequest {
    pub fn message(&self) -> &str {
        self.message.as_deref().unwrap_or_default()
    }

    pub fn lang(&self) -> &str {
        self.lang.as_deref().unwrap_or(PIVOT_LANGUAGE)
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct AdviceResponse {
    pub answer: String,
    pub lang_code: String,
}

pub fn build_prompt(query: &str) -> String {
    format!(
        "[ROLE: Indian Agriculture Scientist]\n\
         User Query: {}\n\
         Task: Analyze the soil and crop. Give 2 sentences of specific expert advice.",
        query
    )
}

pub struct AdviceGenerator {
    translator: Arc<dyn Translator>,
    generator: Option<Arc<dyn TextGenerator>>,
}

impl AdviceGenerator {
    /// `generator` is `None` when text generation is switched off; answers
    /// then carry a fixed placeholder.
    pub fn new(translator: Arc<dyn Translator>, generator: Option<Arc<dyn TextGenerator>>) -> Self {
        Self {
            translator,
            generator,
        }
    }

    pub fn generation_enabled(&self) -> bool {
        self.generator.is_some()
    }

    pub async fn advise(&self, message: &str, lang: &str) -> AdviceResponse {
        let english_query = self.translate_or_keep(message, PIVOT_LANGUAGE).await;
        let prompt = build_prompt(&english_query);

        let english_answer = match &self.generator {
            Some(generator) => match generator.generate(&prompt).await {
                Ok(answer) => answer.trim().to_string(),
                Err(e) => {
                    log::error!("❌ Generation error: {}", e);
                    GENERATION_FAILED.to_string()
                }
            },
            None => GENERATION_DISABLED.to_string(),
        };

        let answer = self.translate_or_keep(&english_answer, lang).await;

        AdviceResponse {
            answer,
            lang_code: format!("{}-IN", lang),
        }
    }

    async fn translate_or_keep(&self, text: &str, target: &str) -> String {
        match self.translator.translate(text, target).await {
            Ok(translated) => translated,
            Err(e) => {
                log::warn!("⚠️ Translation to '{}' failed, keeping original text: {}", target, e);
                text.to_string()
            }
        }
    }
}
