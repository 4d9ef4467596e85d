//! Narrative generation
//!
//! The pipeline hands each structured summary to a `NarrativeGenerator`
//! and stores whatever text comes back. The engines never see this trait,
//! so they stay testable without any external service.

use crate::Result;
use async_trait::async_trait;

pub mod gemini;
pub mod prompts;

pub use gemini::GeminiNarrator;

/// Turns a role description and a prompt into prose.
#[async_trait]
pub trait NarrativeGenerator: Send + Sync {
    async fn generate(&self, role: &str, prompt: &str) -> Result<String>;
}

/// Offline narrator for development & testing.
/// Echoes the structured prompt under a heading instead of calling a model.
pub struct TemplateNarrator;

#[async_trait]
impl NarrativeGenerator for TemplateNarrator {
    async fn generate(&self, role: &str, prompt: &str) -> Result<String> {
        Ok(format!(
            "[offline narrative] {}\n\n{}",
            role.trim(),
            prompt.trim()
        ))
    }
}
