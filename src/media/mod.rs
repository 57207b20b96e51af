// Media processing through ffmpeg
//
// - commands: argument builders for each ffmpeg operation

pub mod commands;

use std::path::Path;
use tracing::info;

pub use commands::MediaCommandBuilder;

use crate::error::Result;
use crate::process::ProcessRunner;

/// ffmpeg-backed audio extraction and subtitle muxing.
pub struct MediaProcessor<'a> {
    runner: &'a dyn ProcessRunner,
    command_builder: MediaCommandBuilder,
}

impl<'a> MediaProcessor<'a> {
    pub fn new(runner: &'a dyn ProcessRunner) -> Self {
        Self::with_binary(runner, "ffmpeg")
    }

    pub fn with_binary<S: Into<String>>(runner: &'a dyn ProcessRunner, binary_path: S) -> Self {
        Self {
            runner,
            command_builder: MediaCommandBuilder::new(binary_path),
        }
    }

    pub async fn extract_audio(&self, video_path: &Path, audio_path: &Path) -> Result<()> {
        info!("Extracting audio from {} to {}", video_path.display(), audio_path.display());
        let command = self.command_builder.extract_audio(video_path, audio_path);
        self.runner.run(&command).await
    }

    pub async fn embed_subtitles(
        &self,
        video_path: &Path,
        subtitle_path: &Path,
        output_path: &Path,
        language: &str,
    ) -> Result<()> {
        info!(
            "Embedding subtitles from {} into {} -> {}",
            subtitle_path.display(),
            video_path.display(),
            output_path.display()
        );
        let command = self
            .command_builder
            .embed_subtitles(video_path, subtitle_path, output_path, language);
        self.runner.run(&command).await
    }
}
