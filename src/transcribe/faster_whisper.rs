use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::RunConfig;
use crate::error::{Result, SasayakiError};
use crate::process::{ExternalCommand, ProcessRunner};
use crate::setup::AppLayout;
use super::{TranscriptionEngine, TranscriptionTask};

/// faster-whisper through the helper script in the application directory.
pub struct FasterWhisperEngine {
    layout: AppLayout,
}

impl FasterWhisperEngine {
    pub fn new(layout: AppLayout) -> Self {
        Self { layout }
    }

    pub fn command(
        &self,
        audio_path: &Path,
        output_path: &Path,
        config: &RunConfig,
    ) -> ExternalCommand {
        let task = TranscriptionTask::for_run(config);

        ExternalCommand::new(
            self.layout.whisper_env_python().to_string_lossy(),
            "Transcription using faster-whisper.",
        )
        .path(self.layout.transcribe_script())
        .arg("--output")
        .path(output_path)
        .opt("--model", config.model.clone())
        .opt("--threads", config.threads.clone())
        .arg("--appdir")
        .path(self.layout.models_dir())
        .opt("--action", task.as_str())
        .arg("--input")
        .path(audio_path)
    }
}

#[async_trait]
impl TranscriptionEngine for FasterWhisperEngine {
    fn name(&self) -> &'static str {
        "faster-whisper"
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
                "faster-whisper did not produce {}",
                output_path.display()
            )));
        }
        debug!("Created file: {}", output_path.display());
        Ok(output_path.to_path_buf())
    }
}
