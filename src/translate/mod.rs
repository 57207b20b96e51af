// Subtitle translation through a conversational LLM
//
// - chunk: groups cue blocks into size-bounded request payloads
// - session: multi-turn exchange with retry and pacing
// - gemini: Google Gemini backend for the session

pub mod chunk;
pub mod session;
pub mod gemini;

pub use chunk::{Chunk, DEFAULT_CHUNK_LIMIT, plan};
pub use gemini::GeminiBackend;
pub use session::*;

use crate::config::RunConfig;
use crate::error::Result;

/// Factory for creating translator instances
pub struct TranslatorFactory;

impl TranslatorFactory {
    /// Create a Gemini-backed translator from the run configuration
    pub fn create_translator(config: &RunConfig) -> Result<SessionTranslator> {
        let backend = GeminiBackend::new(config.api_key.clone(), config.gemini_model.clone())?;
        Ok(SessionTranslator::new(Box::new(backend), config.tuning.clone()))
    }
}
