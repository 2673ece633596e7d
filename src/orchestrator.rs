//! Request Orchestrator
//!
//! Composes the quota gate, the text generator and the sanitizer into the
//! single user-facing "design a character" operation.
//!
//! The quota is consumed before the generator is called and is not given
//! back when generation fails.

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use crate::generator::TextGenerator;
use crate::metrics;
use crate::quota::{ConsumeOutcome, QuotaGate, QuotaStatus, ResetOutcome};
use crate::sanitize;

/// Longest traits string passed to the prompt, in characters
pub const MAX_TRAITS_CHARS: usize = 100;

/// Shown when the quota is closed
pub const QUOTA_EXHAUSTED_MESSAGE: &str =
    "You have reached the maximum number of requests allowed.";

/// Shown for every generator failure
pub const GENERATION_FAILED_MESSAGE: &str =
    "There was an issue generating the character. Try again!";

/// Shown after a successful password override
pub const UNLOCK_SUCCESS_MESSAGE: &str =
    "Password correct! You can now generate more characters.";

/// Build the generator prompt for `traits`
pub fn build_prompt(traits: &str) -> String {
    format!(
        "Write an interesting Character Background and name for a character with traits {}",
        traits
    )
}

/// Limit `traits` to [`MAX_TRAITS_CHARS`] characters
pub fn truncate_traits(traits: &str) -> &str {
    match traits.char_indices().nth(MAX_TRAITS_CHARS) {
        Some((idx, _)) => &traits[..idx],
        None => traits,
    }
}

/// Outcome of one generation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generation {
    /// Cleaned character description
    Character(String),
    /// Quota closed, generator not called
    QuotaExhausted,
    /// Generator failed or returned nothing
    Failed,
}

impl Generation {
    /// Text shown to the user
    pub fn message(&self) -> &str {
        match self {
            Generation::Character(text) => text,
            Generation::QuotaExhausted => QUOTA_EXHAUSTED_MESSAGE,
            Generation::Failed => GENERATION_FAILED_MESSAGE,
        }
    }

    fn outcome_label(&self) -> &'static str {
        match self {
            Generation::Character(_) => "success",
            Generation::QuotaExhausted => "denied",
            Generation::Failed => "failed",
        }
    }
}

/// Character generation front door
pub struct RequestOrchestrator {
    gate: Mutex<QuotaGate>,
    generator: Arc<dyn TextGenerator>,
}

impl RequestOrchestrator {
    pub fn new(gate: QuotaGate, generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            gate: Mutex::new(gate),
            generator,
        }
    }

    /// Generate a character and return the text to display
    pub async fn handle(&self, traits: &str) -> String {
        self.generate(traits).await.message().to_string()
    }

    /// Generate a character for `traits`
    #[instrument(skip_all, fields(traits_len = traits.chars().count()))]
    pub async fn generate(&self, traits: &str) -> Generation {
        let generation = self.run(traits).await;
        metrics::GENERATIONS_TOTAL
            .with_label_values(&[generation.outcome_label()])
            .inc();
        generation
    }

    async fn run(&self, traits: &str) -> Generation {
        let outcome = self.gate.lock().await.try_consume();
        match outcome {
            ConsumeOutcome::Denied => {
                info!("Generation denied, quota exhausted");
                return Generation::QuotaExhausted;
            }
            ConsumeOutcome::Allowed { count } => {
                info!(count, "Generation admitted");
            }
        }

        let prompt = build_prompt(truncate_traits(traits));
        let started = Instant::now();
        let result = self.generator.generate(&prompt).await;
        metrics::GENERATION_DURATION_SECONDS.observe(started.elapsed().as_secs_f64());

        match result {
            Ok(generated) => match generated.non_empty() {
                Some(text) => Generation::Character(sanitize::clean(text)),
                None => {
                    warn!("Generator returned no text");
                    Generation::Failed
                }
            },
            Err(e) => {
                warn!(error = %e, kind = e.kind(), "Character generation failed");
                Generation::Failed
            }
        }
    }

    /// Try the override password
    pub async fn unlock(&self, secret: &str) -> ResetOutcome {
        let outcome = self.gate.lock().await.reset_with_password(secret);
        let label = match outcome {
            ResetOutcome::Success => "success",
            ResetOutcome::Rejected => "rejected",
        };
        metrics::UNLOCK_ATTEMPTS_TOTAL.with_label_values(&[label]).inc();
        outcome
    }

    /// Whether a generation would currently be admitted
    pub async fn is_open(&self) -> bool {
        self.gate.lock().await.is_open()
    }

    /// Current quota snapshot
    pub async fn status(&self) -> QuotaStatus {
        self.gate.lock().await.status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GeneratorError;
    use crate::generator::GeneratedText;
    use crate::quota::{MemoryQuotaStore, QuotaPolicy};
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;

    /// Generator that replays a fixed answer and records prompts
    struct ScriptedGenerator {
        reply: fn() -> Result<GeneratedText, GeneratorError>,
        prompts: StdMutex<Vec<String>>,
    }

    impl ScriptedGenerator {
        fn new(reply: fn() -> Result<GeneratedText, GeneratorError>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                prompts: StdMutex::new(Vec::new()),
            })
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(&self, prompt: &str) -> Result<GeneratedText, GeneratorError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            (self.reply)()
        }
    }

    fn orchestrator(limit: u32, generator: Arc<ScriptedGenerator>) -> RequestOrchestrator {
        let policy = QuotaPolicy {
            limit,
            window_hours: 24,
            override_password: "letmein".to_string(),
        };
        let gate = QuotaGate::new(Box::new(MemoryQuotaStore::new()), policy);
        RequestOrchestrator::new(gate, generator)
    }

    #[test]
    fn test_build_prompt() {
        assert_eq!(
            build_prompt("brave, one-eyed"),
            "Write an interesting Character Background and name for a character with traits brave, one-eyed"
        );
    }

    #[test]
    fn test_truncate_traits() {
        let long = "é".repeat(150);
        assert_eq!(truncate_traits(&long).chars().count(), MAX_TRAITS_CHARS);
        assert_eq!(truncate_traits("short"), "short");
    }

    #[tokio::test]
    async fn test_success_is_cleaned() {
        let generator = ScriptedGenerator::new(|| Ok(GeneratedText::new("## **Aria** the bold\n")));
        let orch = orchestrator(1, generator.clone());

        assert_eq!(orch.handle("bold").await, "Aria the bold");
        assert_eq!(orch.status().await.count, 1);
        assert_eq!(generator.prompts(), vec![build_prompt("bold")]);
    }

    #[tokio::test]
    async fn test_denied_skips_generator() {
        let generator = ScriptedGenerator::new(|| Ok(GeneratedText::new("Aria")));
        let orch = orchestrator(1, generator.clone());

        orch.handle("first").await;
        assert_eq!(orch.generate("second").await, Generation::QuotaExhausted);
        assert_eq!(orch.handle("third").await, QUOTA_EXHAUSTED_MESSAGE);
        assert_eq!(orch.status().await.count, 1);
        assert_eq!(generator.prompts().len(), 1);
    }

    #[tokio::test]
    async fn test_generator_error_consumes_quota() {
        let generator = ScriptedGenerator::new(|| Err(GeneratorError::MissingApiKey));
        let orch = orchestrator(2, generator);

        assert_eq!(orch.handle("x").await, GENERATION_FAILED_MESSAGE);
        assert_eq!(orch.status().await.count, 1);
    }

    #[tokio::test]
    async fn test_empty_text_is_failure() {
        let generator = ScriptedGenerator::new(|| Ok(GeneratedText::empty()));
        let orch = orchestrator(2, generator);

        assert_eq!(orch.generate("x").await, Generation::Failed);
        assert_eq!(orch.status().await.count, 1);
    }

    #[tokio::test]
    async fn test_long_traits_are_truncated_in_prompt() {
        let generator = ScriptedGenerator::new(|| Ok(GeneratedText::new("ok")));
        let orch = orchestrator(1, generator.clone());
        let traits = "a".repeat(250);

        orch.handle(&traits).await;
        assert_eq!(generator.prompts(), vec![build_prompt(&"a".repeat(100))]);
    }

    #[tokio::test]
    async fn test_unlock_reopens() {
        let generator = ScriptedGenerator::new(|| Ok(GeneratedText::new("Aria")));
        let orch = orchestrator(1, generator);

        orch.handle("x").await;
        assert!(!orch.is_open().await);

        assert_eq!(orch.unlock("nope").await, ResetOutcome::Rejected);
        assert!(!orch.is_open().await);

        assert_eq!(orch.unlock("letmein").await, ResetOutcome::Success);
        assert!(orch.is_open().await);
        assert_eq!(orch.handle("y").await, "Aria");
    }
}
