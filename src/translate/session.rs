use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::TranslationTuning;
use crate::error::{Result, SasayakiError};
use crate::subtitle::segment;
use super::chunk::{Chunk, plan};

/// Who produced a turn in the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One message in the conversation history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn user<S: Into<String>>(text: S) -> Self {
        Self { role: Role::User, text: text.into() }
    }

    pub fn model<S: Into<String>>(text: S) -> Self {
        Self { role: Role::Model, text: text.into() }
    }
}

/// Why the model stopped generating a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    MaxTokens,
    Safety,
    Recitation,
    Other(String),
}

impl From<&str> for FinishReason {
    fn from(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "STOP" => Self::Stop,
            "MAX_TOKENS" => Self::MaxTokens,
            "SAFETY" => Self::Safety,
            "RECITATION" => Self::Recitation,
            _ => Self::Other(s.to_string()),
        }
    }
}

impl FinishReason {
    pub fn is_normal(&self) -> bool {
        matches!(self, Self::Stop)
    }
}

/// One candidate answer: ordered content parts plus its stop reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub finish_reason: FinishReason,
    pub parts: Vec<String>,
}

impl Candidate {
    pub fn text(&self) -> String {
        self.parts.concat()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelResponse {
    pub candidates: Vec<Candidate>,
}

impl ModelResponse {
    /// Text of all candidates, parts in order, candidates in the order returned.
    pub fn text(&self) -> String {
        self.candidates.iter().map(Candidate::text).collect()
    }

    /// Candidates that stopped for anything other than a normal completion.
    pub fn abnormal_stops(&self) -> impl Iterator<Item = &FinishReason> {
        self.candidates
            .iter()
            .map(|c| &c.finish_reason)
            .filter(|r| !r.is_normal())
    }
}

/// A conversational model endpoint. Each call carries the full prior history.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn send(&self, history: &[Turn], message: &str) -> Result<ModelResponse>;
}

/// Conversation state for one document. History only grows on success, so a
/// failed request can be resent against the same context.
struct ChatSession<'a> {
    backend: &'a dyn ChatBackend,
    history: Vec<Turn>,
}

impl<'a> ChatSession<'a> {
    fn new(backend: &'a dyn ChatBackend) -> Self {
        Self {
            backend,
            history: Vec::new(),
        }
    }

    async fn send_message(&mut self, message: &str) -> Result<ModelResponse> {
        let response = self.backend.send(&self.history, message).await?;

        self.history.push(Turn::user(message));
        let reply = response
            .candidates
            .first()
            .map(Candidate::text)
            .unwrap_or_default();
        // the API rejects empty parts, so a contentless reply is not recorded
        if !reply.is_empty() {
            self.history.push(Turn::model(reply));
        }

        Ok(response)
    }
}

/// Build the first turn: fixed instruction followed by the first chunk.
pub fn instruction_prompt(target_language: &str, chunk: &str) -> String {
    format!(
        "Translate these SRT subtitles into {}. Return them as valid SRT subtitles. Subtitles to translate:\n{}",
        target_language, chunk
    )
}

/// Drives a multi-turn translation of a chunked subtitle document.
pub struct SessionTranslator {
    backend: Box<dyn ChatBackend>,
    tuning: TranslationTuning,
}

impl SessionTranslator {
    pub fn new(backend: Box<dyn ChatBackend>, tuning: TranslationTuning) -> Self {
        Self { backend, tuning }
    }

    /// Segment a subtitle document, plan chunks and translate them.
    pub async fn translate_document(&self, text: &str, target_language: &str) -> Result<String> {
        debug!("Characters count: {}", text.chars().count());
        let blocks = segment(text);
        debug!("Subtitle sections count: {}", blocks.len());

        let chunks = plan(&blocks, self.tuning.chunk_limit);
        self.translate(&chunks, target_language).await
    }

    /// Translate all chunks in one session and return the concatenated text.
    ///
    /// A failed turn is retried once after the retry cooldown. A second
    /// failure aborts the whole translation.
    pub async fn translate(&self, chunks: &[Chunk], target_language: &str) -> Result<String> {
        let mut session = ChatSession::new(self.backend.as_ref());
        let mut translated = String::new();

        debug!("Translation language: {}", target_language);
        debug!("Required API requests: {}", chunks.len());

        for (index, chunk) in chunks.iter().enumerate() {
            let request = index + 1;
            debug!("Request #{} ({} characters)", request, chunk.char_len());

            let prompt = if index == 0 {
                instruction_prompt(target_language, chunk.text())
            } else {
                chunk.text().to_string()
            };

            let response = match session.send_message(&prompt).await {
                Ok(response) => response,
                Err(e) => {
                    warn!("Translation request #{} failed: {}", request, e);
                    info!(
                        "Retrying request #{} in {}s",
                        request,
                        self.tuning.retry_cooldown.as_secs()
                    );
                    sleep(self.tuning.retry_cooldown).await;

                    session.send_message(&prompt).await.map_err(|e| {
                        SasayakiError::Translation(format!(
                            "request #{} failed after retry: {}",
                            request, e
                        ))
                    })?
                }
            };

            for reason in response.abnormal_stops() {
                warn!("Finish reason other than STOP on request #{}: {:?}", request, reason);
            }
            translated.push_str(&response.text());

            if index != 0 && index + 1 < chunks.len() {
                sleep(self.tuning.turn_delay).await;
            }
        }

        Ok(translated)
    }
}
