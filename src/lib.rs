//! Character Designer Library
//!
//! Turns a short list of character traits into a generated character
//! background, behind a daily request quota that can be reset with a
//! password.

pub mod config;
pub mod error;
pub mod generator;
pub mod metrics;
pub mod orchestrator;
pub mod page;
pub mod quota;
pub mod sanitize;
pub mod server;

pub use config::Config;
pub use error::{GeneratorError, StorageError};
pub use generator::{GeminiGenerator, GeneratedText, TextGenerator};
pub use orchestrator::{Generation, RequestOrchestrator};
pub use quota::{ConsumeOutcome, FileQuotaStore, QuotaGate, QuotaStatus, ResetOutcome};
