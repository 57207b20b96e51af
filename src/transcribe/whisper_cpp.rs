use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::RunConfig;
use crate::error::{Result, SasayakiError};
use crate::process::{ExternalCommand, ProcessRunner};
use crate::setup::AppLayout;
use super::{TranscriptionEngine, TranscriptionTask};

/// whisper.cpp `whisper-cli` binary installed in the application directory.
pub struct WhisperCppEngine {
    layout: AppLayout,
}

impl WhisperCppEngine {
    pub fn new(layout: AppLayout) -> Self {
        Self { layout }
    }

    pub fn command(
        &self,
        audio_path: &Path,
        output_path: &Path,
        config: &RunConfig,
    ) -> ExternalCommand {
        let translate = TranscriptionTask::for_run(config) == TranscriptionTask::Translate;
        // whisper-cli appends the extension itself
        let output_stem = output_path.with_extension("");

        ExternalCommand::new(
            self.layout.whisper_cpp_binary().to_string_lossy(),
            "Transcription using whisper.cpp.",
        )
        .opt("--threads", config.threads.clone())
        .opt("--translate", translate.to_string())
        .arg("--output-srt")
        .arg("--output-file")
        .path(output_stem)
        .opt("--language", "auto")
        .arg("--model")
        .path(self.layout.whisper_cpp_model(&config.model))
        .arg("--file")
        .path(audio_path)
    }
}

#[async_trait]
impl TranscriptionEngine for WhisperCppEngine {
    fn name(&self) -> &'static str {
        "whisper.cpp"
    }

    async fn transcribe(
        &self,
        runner: &dyn ProcessRunner,
        audio_path: &Path,
        output_path: &Path,
        config: &RunConfig,
    ) -> Result<PathBuf> {
        let command = self.command(audio_path, output_path, config);
        runner.run(&command).await?;

        if !output_path.exists() {
            return Err(SasayakiError::Transcription(format!(
                "whisper.cpp did not produce {}",
                output_path.display()
            )));
        }
        debug!("Created file: {}", output_path.display());
        Ok(output_path.to_path_buf())
    }
}
