//! Prompt assembly and answer generation over retrieved documents.

use brief_core::{BriefError, LanguageModel, ScoredDocument};
use std::sync::Arc;

use crate::gemini::UNEXPECTED_FORMAT;

/// Returned in place of an answer when no model is configured
pub const MODEL_UNAVAILABLE: &str = "⚠️ Gemini model is not available. Please check your API key.";

/// Retrieved document texts joined with newlines, in retrieval order
pub fn build_context(docs: &[ScoredDocument]) -> String {
    docs.iter()
        .map(|d| d.document.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Analyst-style prompt sent to the model
pub fn build_prompt(question: &str, context: &str) -> String {
    format!(
        "You are a financial assistant. Use the following data to generate a market-style report like a Bloomberg analyst.\n\
         Context:\n{context}\n\n\
         Question:\n{question}\n\n\
         Give a professional, crisp answer with key figures and sentiment."
    )
}

#[derive(Clone)]
pub struct AnswerGenerator {
    model: Option<Arc<dyn LanguageModel>>,
}

impl AnswerGenerator {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model: Some(model) }
    }

    /// A generator that always answers with [`MODEL_UNAVAILABLE`]
    pub fn unavailable() -> Self {
        Self { model: None }
    }

    pub fn from_model(model: Option<Arc<dyn LanguageModel>>) -> Self {
        Self { model }
    }

    pub fn model_name(&self) -> Option<&str> {
        self.model.as_deref().map(|m| m.model_name())
    }

    pub async fn try_generate(&self, question: &str, docs: &[ScoredDocument]) -> Result<String, BriefError> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| BriefError::NotConfigured("no language model configured".to_string()))?;

        let prompt = build_prompt(question, &build_context(docs));
        model.complete(&prompt).await
    }

    /// Never fails: problems come back as a user-facing apology string.
    pub async fn generate(&self, question: &str, docs: &[ScoredDocument]) -> String {
        if self.model.is_none() {
            return MODEL_UNAVAILABLE.to_string();
        }

        match self.try_generate(question, docs).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Answer generation failed: {}", e);
                self.apology(&e)
            }
        }
    }

    /// User-facing text standing in for an answer that could not be generated
    pub fn apology(&self, err: &BriefError) -> String {
        match err {
            _ if self.model.is_none() => MODEL_UNAVAILABLE.to_string(),
            BriefError::InvalidResponse(msg) if msg == UNEXPECTED_FORMAT => msg.clone(),
            other => format!("⚠️ Error generating response: {}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use brief_core::{DocumentMetadata, IndexedDocument, SourceKind, Ticker};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingModel {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LanguageModel for RecordingModel {
        async fn complete(&self, prompt: &str) -> Result<String, BriefError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok("TSLA trades at 64x trailing earnings.".to_string())
        }

        fn model_name(&self) -> &str {
            "recording"
        }
    }

    struct FailingModel;

    #[async_trait]
    impl LanguageModel for FailingModel {
        async fn complete(&self, _prompt: &str) -> Result<String, BriefError> {
            Err(BriefError::Upstream("503 overloaded".to_string()))
        }

        fn model_name(&self) -> &str {
            "failing"
        }
    }

    fn doc(text: &str) -> ScoredDocument {
        ScoredDocument {
            document: IndexedDocument {
                text: text.to_string(),
                metadata: DocumentMetadata::new(SourceKind::StockData, Ticker::from("TSLA")),
            },
            distance: 0.5,
        }
    }

    #[test]
    fn test_prompt_layout() {
        let prompt = build_prompt("What's Tesla's P/E ratio?", "line one\nline two");
        assert_eq!(
            prompt,
            "You are a financial assistant. Use the following data to generate a market-style report like a Bloomberg analyst.\n\
             Context:\nline one\nline two\n\n\
             Question:\nWhat's Tesla's P/E ratio?\n\n\
             Give a professional, crisp answer with key figures and sentiment."
        );
    }

    #[test]
    fn test_context_keeps_retrieval_order() {
        assert_eq!(build_context(&[doc("b"), doc("a")]), "b\na");
        assert_eq!(build_context(&[]), "");
    }

    #[tokio::test]
    async fn test_generate_passes_docs_to_model() {
        let model = Arc::new(RecordingModel::default());
        let generator = AnswerGenerator::new(model.clone());

        let answer = generator
            .generate("What's Tesla's P/E ratio?", &[doc("TSLA trailingPE: 64.2")])
            .await;

        assert_eq!(answer, "TSLA trades at 64x trailing earnings.");
        let prompts = model.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("TSLA trailingPE: 64.2"));
        assert!(prompts[0].contains("Question:\nWhat's Tesla's P/E ratio?"));
    }

    #[tokio::test]
    async fn test_unavailable_model_apologizes() {
        let generator = AnswerGenerator::unavailable();
        assert_eq!(generator.generate("anything", &[]).await, MODEL_UNAVAILABLE);
        assert!(generator.try_generate("anything", &[]).await.is_err());
    }

    #[tokio::test]
    async fn test_model_failure_apologizes() {
        let generator = AnswerGenerator::new(Arc::new(FailingModel));
        let answer = generator.generate("anything", &[doc("x")]).await;
        assert_eq!(answer, "⚠️ Error generating response: Upstream error: 503 overloaded");
    }

    #[test]
    fn test_only_gemini_format_error_passes_through() {
        let generator = AnswerGenerator::new(Arc::new(FailingModel));

        let empty = BriefError::InvalidResponse(UNEXPECTED_FORMAT.to_string());
        assert_eq!(generator.apology(&empty), UNEXPECTED_FORMAT);

        let other = BriefError::InvalidResponse("expected value at line 1 column 1".to_string());
        assert_eq!(
            generator.apology(&other),
            "⚠️ Error generating response: Invalid response: expected value at line 1 column 1"
        );
    }
}
