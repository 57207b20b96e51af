use std::path::Path;

use crate::process::ExternalCommand;

/// Builder for ffmpeg invocations used by the pipeline
pub struct MediaCommandBuilder {
    binary_path: String,
}

impl MediaCommandBuilder {
    pub fn new<S: Into<String>>(binary_path: S) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }

    /// Mono 16 kHz PCM WAV, the input format whisper engines expect
    pub fn extract_audio<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        video_path: P,
        audio_path: Q,
    ) -> ExternalCommand {
        ExternalCommand::new(&self.binary_path, "Extracting audio from video file.")
            .arg("-y")
            .arg("-i")
            .path(video_path)
            .opt("-ar", "16000")
            .opt("-ac", "1")
            .opt("-c:a", "pcm_s16le")
            .path(audio_path)
    }

    /// Mux a subtitle track into the video without re-encoding
    pub fn embed_subtitles<P: AsRef<Path>, Q: AsRef<Path>, R: AsRef<Path>>(
        &self,
        video_path: P,
        subtitle_path: Q,
        output_path: R,
        language: &str,
    ) -> ExternalCommand {
        ExternalCommand::new(&self.binary_path, "Embedding subtitles.")
            .arg("-y")
            .arg("-i")
            .path(video_path)
            .arg("-i")
            .path(subtitle_path)
            .opt("-c", "copy")
            .opt("-c:s", "srt")
            .opt("-metadata:s:s:0", format!("language={}", language))
            .path(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_audio_args() {
        let cmd = MediaCommandBuilder::new("ffmpeg").extract_audio("in.mp4", "tmp/audio.wav");
        assert_eq!(cmd.program, "ffmpeg");
        assert_eq!(
            cmd.args,
            vec!["-y", "-i", "in.mp4", "-ar", "16000", "-ac", "1", "-c:a", "pcm_s16le", "tmp/audio.wav"]
        );
    }

    #[test]
    fn test_embed_subtitles_args() {
        let cmd = MediaCommandBuilder::new("ffmpeg").embed_subtitles("v.mkv", "s.srt", "out.mkv", "polish");
        assert_eq!(
            cmd.args,
            vec![
                "-y", "-i", "v.mkv", "-i", "s.srt", "-c", "copy", "-c:s", "srt",
                "-metadata:s:s:0", "language=polish", "out.mkv"
            ]
        );
    }
}
