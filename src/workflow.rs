//! One pipeline run: classify the input, fetch and transcribe media when
//! needed, translate, then place or mux the results.
//!
//! All intermediate files live in the scratch directory, which is wiped at
//! the start of every run. Two concurrent runs share that directory and will
//! corrupt each other.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info, warn};

use crate::config::RunConfig;
use crate::download::{download_video, is_remote};
use crate::error::{Result, SasayakiError};
use crate::media::MediaProcessor;
use crate::process::ProcessRunner;
use crate::setup::AppLayout;
use crate::transcribe::{TranscriberFactory, TranscriptionEngine};
use crate::translate::SessionTranslator;

const SUBTITLE_EXTENSION: &str = "srt";
const TRANSCRIPTION_SUFFIX: &str = " (transcription)";
const AUDIO_FILE: &str = "audio.wav";
/// Track language recorded when the engine translated speech to English.
const ENGINE_LANGUAGE: &str = "eng";

/// What kind of input a run starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// URL that must be downloaded first
    RemoteVideo,
    /// A subtitle file from an earlier run; only translation is performed
    ExistingTranscript,
    LocalVideo,
}

pub fn classify_input(input: &str, force_download: bool) -> InputKind {
    if force_download || is_remote(input) {
        return InputKind::RemoteVideo;
    }

    let is_subtitle = Path::new(input)
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case(SUBTITLE_EXTENSION))
        .unwrap_or(false);

    if is_subtitle {
        InputKind::ExistingTranscript
    } else {
        InputKind::LocalVideo
    }
}

/// File stem used for every output name. A ` (transcription)` suffix left by
/// an earlier run is dropped so re-translating a transcript yields `<name>.srt`.
pub fn base_name(path: &Path, kind: InputKind) -> Result<String> {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| SasayakiError::Config(format!("Invalid input filename: {}", path.display())))?;

    if kind == InputKind::ExistingTranscript {
        if let Some(stripped) = stem.strip_suffix(TRANSCRIPTION_SUFFIX) {
            return Ok(stripped.to_string());
        }
    }
    Ok(stem)
}

/// Move by copy then delete. Only a failed copy is an error; the source is
/// then left in place. A source that cannot be deleted is logged.
pub async fn move_file(source: &Path, destination: &Path) -> Result<()> {
    debug!("Moving file: {} to destination: {}", source.display(), destination.display());

    fs::copy(source, destination).await.map_err(|e| {
        SasayakiError::Io(std::io::Error::new(
            e.kind(),
            format!("couldn't copy {} to {}: {}", source.display(), destination.display(), e),
        ))
    })?;

    if let Err(e) = fs::remove_file(source).await {
        warn!("Copied {} but could not delete it: {}", source.display(), e);
    }
    Ok(())
}

async fn remove_quietly(path: &Path) {
    debug!("Deleting file: {}", path.display());
    if let Err(e) = fs::remove_file(path).await {
        debug!("Could not delete {}: {}", path.display(), e);
    }
}

/// Paths for one invocation.
#[derive(Debug, Clone)]
pub struct RunState {
    pub kind: InputKind,
    pub translate: bool,
    pub base_name: String,
    pub work_dir: PathBuf,
    /// Video being processed: the input itself, or the download in the work dir
    pub video: Option<PathBuf>,
    /// Subtitle file given as input
    pub transcript_input: Option<PathBuf>,
    pub audio: PathBuf,
    /// Engine output, `<name> (transcription).srt` in the work dir
    pub raw_transcript: PathBuf,
    /// Translation output, `<name>.srt` in the work dir
    pub translated: PathBuf,
    pub output_dir: PathBuf,
}

impl RunState {
    fn new(kind: InputKind, translate: bool, base_name: String, work_dir: PathBuf) -> Self {
        Self {
            kind,
            translate,
            audio: work_dir.join(AUDIO_FILE),
            raw_transcript: work_dir.join(format!("{}{}.srt", base_name, TRANSCRIPTION_SUFFIX)),
            translated: work_dir.join(format!("{}.srt", base_name)),
            base_name,
            work_dir,
            video: None,
            transcript_input: None,
            output_dir: PathBuf::new(),
        }
    }
}

/// Files produced by a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutcome {
    pub outputs: Vec<PathBuf>,
}

pub struct Workflow {
    config: RunConfig,
    layout: AppLayout,
    runner: Box<dyn ProcessRunner>,
    engine: Box<dyn TranscriptionEngine>,
    translator: SessionTranslator,
    current_dir: PathBuf,
    is_windows: bool,
}

impl Workflow {
    pub fn new(
        config: RunConfig,
        layout: AppLayout,
        runner: Box<dyn ProcessRunner>,
        translator: SessionTranslator,
        current_dir: PathBuf,
    ) -> Self {
        let engine = TranscriberFactory::create_engine(config.engine, &layout);

        Self {
            config,
            layout,
            runner,
            engine,
            translator,
            current_dir,
            is_windows: cfg!(windows),
        }
    }

    /// Process one input (URL, video path or subtitle path).
    pub async fn run(&self, input: &str) -> Result<RunOutcome> {
        let kind = classify_input(input, self.config.force_download);
        let translate = self.config.translate || kind == InputKind::ExistingTranscript;
        info!("Input {} classified as {:?}", input, kind);

        if translate {
            self.config.require_api_key()?;
        }
        if kind != InputKind::RemoteVideo && !Path::new(input).exists() {
            return Err(SasayakiError::FileNotFound(input.to_string()));
        }

        let work_dir = self.layout.reset_tmp()?;

        let state = match kind {
            InputKind::RemoteVideo => {
                let video = download_video(self.runner.as_ref(), input, &work_dir, self.is_windows).await?;
                let mut state = RunState::new(kind, translate, base_name(&video, kind)?, work_dir);
                state.video = Some(video);
                state.output_dir = self.current_dir.clone();
                state
            }
            InputKind::LocalVideo => {
                let video = PathBuf::from(input);
                let mut state = RunState::new(kind, translate, base_name(&video, kind)?, work_dir);
                state.output_dir = self.parent_dir(&video);
                state.video = Some(video);
                state
            }
            InputKind::ExistingTranscript => {
                let transcript = PathBuf::from(input);
                let mut state = RunState::new(kind, translate, base_name(&transcript, kind)?, work_dir);
                state.output_dir = self.parent_dir(&transcript);
                state.transcript_input = Some(transcript);
                state
            }
        };

        if let Some(video) = &state.video {
            self.transcribe_video(video, &state).await?;
        }

        if state.translate {
            self.translate(&state).await?;
        }

        self.finalize(&state).await
    }

    fn parent_dir(&self, path: &Path) -> PathBuf {
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => self.current_dir.clone(),
        }
    }

    async fn transcribe_video(&self, video: &Path, state: &RunState) -> Result<()> {
        let media = MediaProcessor::new(self.runner.as_ref());
        media.extract_audio(video, &state.audio).await?;

        info!("Transcribing with {}", self.engine.name());
        let result = self
            .engine
            .transcribe(self.runner.as_ref(), &state.audio, &state.raw_transcript, &self.config)
            .await;

        remove_quietly(&state.audio).await;
        result.map(|_| ())
    }

    async fn translate(&self, state: &RunState) -> Result<()> {
        let source = state
            .transcript_input
            .as_deref()
            .unwrap_or(state.raw_transcript.as_path());
        let text = fs::read_to_string(source).await?;

        info!("Translation using Google Gemini ({})", self.config.gemini_model);
        let translated = self
            .translator
            .translate_document(&text, &self.config.target_language)
            .await?;

        fs::write(&state.translated, translated).await?;
        debug!("Created file: {}", state.translated.display());
        info!("Translation done.");
        Ok(())
    }

    async fn finalize(&self, state: &RunState) -> Result<RunOutcome> {
        let mut outcome = RunOutcome::default();

        match state.kind {
            InputKind::ExistingTranscript => {
                let destination = state.output_dir.join(format!("{}.srt", state.base_name));
                self.place(&state.translated, destination, &mut outcome).await;
            }
            InputKind::RemoteVideo => {
                let (subtitles, language) = if state.translate {
                    (&state.translated, self.config.target_language.as_str())
                } else {
                    (&state.raw_transcript, ENGINE_LANGUAGE)
                };
                let video = state
                    .video
                    .as_deref()
                    .ok_or_else(|| SasayakiError::FileNotFound("downloaded video".to_string()))?;
                let destination = state.output_dir.join(format!("{}.mkv", state.base_name));

                MediaProcessor::new(self.runner.as_ref())
                    .embed_subtitles(video, subtitles, &destination, language)
                    .await?;
                outcome.outputs.push(destination);

                remove_quietly(video).await;
                remove_quietly(&state.raw_transcript).await;
                if state.translate {
                    remove_quietly(&state.translated).await;
                }
            }
            InputKind::LocalVideo => {
                if state.translate {
                    let raw = state
                        .output_dir
                        .join(format!("{}{}.srt", state.base_name, TRANSCRIPTION_SUFFIX));
                    self.place(&state.raw_transcript, raw, &mut outcome).await;
                }
                let source = if state.translate {
                    &state.translated
                } else {
                    &state.raw_transcript
                };
                let destination = state.output_dir.join(format!("{}.srt", state.base_name));
                self.place(source, destination, &mut outcome).await;
            }
        }

        Ok(outcome)
    }

    /// Best-effort move into the output location; failures are reported only.
    async fn place(&self, source: &Path, destination: PathBuf, outcome: &mut RunOutcome) {
        match move_file(source, &destination).await {
            Ok(()) => outcome.outputs.push(destination),
            Err(e) => warn!("Failed to move {} to {}: {}", source.display(), destination.display(), e),
        }
    }
}
