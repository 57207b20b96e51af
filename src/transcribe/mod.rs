// Transcription engines
//
// Both engines share one contract: read a 16 kHz mono WAV and write an SRT
// file at the requested path.
// - faster_whisper: Python helper script running faster-whisper (default)
// - whisper_cpp: whisper.cpp command line binary

pub mod faster_whisper;
pub mod whisper_cpp;

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::config::{EngineKind, RunConfig};
use crate::error::Result;
use crate::process::ProcessRunner;
use crate::setup::AppLayout;

/// What the engine does with the speech.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptionTask {
    /// Keep the spoken language
    Transcribe,
    /// Let the engine translate speech to English
    Translate,
}

impl TranscriptionTask {
    /// An LLM translation pass follows, so the engine keeps the source language.
    pub fn for_run(config: &RunConfig) -> Self {
        if config.translate {
            Self::Transcribe
        } else {
            Self::Translate
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transcribe => "transcribe",
            Self::Translate => "translate",
        }
    }
}

/// Main trait for transcription engines
#[async_trait]
pub trait TranscriptionEngine: Send + Sync {
    /// Human readable engine name
    fn name(&self) -> &'static str;

    /// Transcribe `audio_path` into an SRT file at `output_path`.
    async fn transcribe(
        &self,
        runner: &dyn ProcessRunner,
        audio_path: &Path,
        output_path: &Path,
        config: &RunConfig,
    ) -> Result<PathBuf>;
}

/// Factory for creating transcription engines
pub struct TranscriberFactory;

impl TranscriberFactory {
    pub fn create_engine(kind: EngineKind, layout: &AppLayout) -> Box<dyn TranscriptionEngine> {
        match kind {
            EngineKind::FasterWhisper => {
                Box::new(faster_whisper::FasterWhisperEngine::new(layout.clone()))
            }
            EngineKind::WhisperCpp => Box::new(whisper_cpp::WhisperCppEngine::new(layout.clone())),
        }
    }
}
