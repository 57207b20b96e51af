use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use assert_fs::TempDir;
use assert_fs::prelude::*;
use async_trait::async_trait;

use sasayaki::config::{ConfigFile, RunConfig, RunOptions};
use sasayaki::error::{Result, SasayakiError};
use sasayaki::process::{ExternalCommand, ProcessRunner};
use sasayaki::setup::AppLayout;
use sasayaki::translate::{
    Candidate, ChatBackend, FinishReason, ModelResponse, SessionTranslator, Turn,
};
use sasayaki::workflow::Workflow;

const TRANSCRIPT: &str = "1\n00:00:00,000 --> 00:00:02,000\nこんにちは\n\n2\n00:00:02,000 --> 00:00:04,000\nさようなら\n";
const TRANSLATION: &str = "1\n00:00:00,000 --> 00:00:02,000\nHello\n\n2\n00:00:02,000 --> 00:00:04,000\nGoodbye\n";

/// Records every command and creates the files the real tools would write.
#[derive(Clone, Default)]
struct FakeRunner {
    calls: Arc<Mutex<Vec<ExternalCommand>>>,
    /// Tool that exits with an error: "ffmpeg", "yt-dlp" or "engine"
    failing: Option<&'static str>,
}

impl FakeRunner {
    fn failing(tool: &'static str) -> Self {
        Self {
            failing: Some(tool),
            ..Self::default()
        }
    }

    fn tool(command: &ExternalCommand) -> &str {
        match command.program.as_str() {
            "yt-dlp" | "ffmpeg" => command.program.as_str(),
            _ => "engine",
        }
    }

    fn calls(&self) -> Vec<ExternalCommand> {
        self.calls.lock().unwrap().clone()
    }

    fn programs(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|c| Self::tool(c).to_string())
            .collect()
    }
}

fn value_after<'a>(command: &'a ExternalCommand, flag: &str) -> Option<&'a str> {
    let idx = command.args.iter().position(|a| a == flag)?;
    command.args.get(idx + 1).map(String::as_str)
}

#[async_trait]
impl ProcessRunner for FakeRunner {
    async fn run(&self, command: &ExternalCommand) -> Result<()> {
        self.calls.lock().unwrap().push(command.clone());

        if self.failing == Some(Self::tool(command)) {
            return Err(SasayakiError::Process {
                command: command.command_line(),
                output: "crashed".to_string(),
            });
        }

        let output = match command.program.as_str() {
            "yt-dlp" => value_after(command, "-o").map(PathBuf::from),
            "ffmpeg" => command.args.last().map(PathBuf::from),
            _ => value_after(command, "--output").map(PathBuf::from),
        };
        if let Some(path) = output {
            let content = if command.program == "ffmpeg" || command.program == "yt-dlp" {
                "media"
            } else {
                TRANSCRIPT
            };
            std::fs::write(path, content)?;
        }
        Ok(())
    }

    async fn capture(&self, command: &ExternalCommand) -> Result<String> {
        self.calls.lock().unwrap().push(command.clone());
        Ok("Talk [abc123].webm\n".to_string())
    }
}

struct FixedBackend;

#[async_trait]
impl ChatBackend for FixedBackend {
    async fn send(&self, _history: &[Turn], _message: &str) -> Result<ModelResponse> {
        Ok(ModelResponse {
            candidates: vec![Candidate {
                finish_reason: FinishReason::Stop,
                parts: vec![TRANSLATION.to_string()],
            }],
        })
    }
}

struct FailingBackend;

#[async_trait]
impl ChatBackend for FailingBackend {
    async fn send(&self, _history: &[Turn], _message: &str) -> Result<ModelResponse> {
        Err(SasayakiError::Translation("HTTP 503".to_string()))
    }
}

struct Fixture {
    home: TempDir,
    media: TempDir,
    cwd: TempDir,
    runner: FakeRunner,
}

impl Fixture {
    fn new() -> Self {
        Self::with_runner(FakeRunner::default())
    }

    fn with_runner(runner: FakeRunner) -> Self {
        Self {
            home: TempDir::new().unwrap(),
            media: TempDir::new().unwrap(),
            cwd: TempDir::new().unwrap(),
            runner,
        }
    }

    fn layout(&self) -> AppLayout {
        AppLayout::new(self.home.path().join(".sasayaki"))
    }

    fn workflow(&self, translate: bool, key: &str, backend: Box<dyn ChatBackend>) -> Workflow {
        let file = ConfigFile {
            key: key.to_string(),
            ..ConfigFile::default()
        };
        let options = RunOptions {
            translate,
            target_language: "english".to_string(),
            ..RunOptions::default()
        };
        let config = RunConfig::resolve(file, self.layout().config_path(), options, false);
        let translator = SessionTranslator::new(backend, config.tuning.clone());

        Workflow::new(
            config,
            self.layout(),
            Box::new(self.runner.clone()),
            translator,
            self.cwd.path().to_path_buf(),
        )
    }
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

#[tokio::test]
async fn test_local_video_without_translation() {
    let fx = Fixture::new();
    let video = fx.media.child("lecture.mp4");
    video.write_str("video").unwrap();

    let outcome = fx
        .workflow(false, "insert-key-here", Box::new(FixedBackend))
        .run(&path_str(video.path()))
        .await
        .unwrap();

    let subtitles = fx.media.child("lecture.srt");
    assert_eq!(outcome.outputs, vec![subtitles.path().to_path_buf()]);
    subtitles.assert(TRANSCRIPT);
    assert!(!fx.media.child("lecture (transcription).srt").path().exists());

    assert_eq!(fx.runner.programs(), vec!["ffmpeg", "engine"]);
    let engine_call = &fx.runner.calls()[1];
    assert_eq!(value_after(engine_call, "--action"), Some("translate"));
    assert!(!fx.layout().tmp_dir().join("audio.wav").exists());
}

#[tokio::test]
async fn test_local_video_with_translation_keeps_both_files() {
    let fx = Fixture::new();
    let video = fx.media.child("lecture.mp4");
    video.write_str("video").unwrap();

    let outcome = fx
        .workflow(true, "real-key", Box::new(FixedBackend))
        .run(&path_str(video.path()))
        .await
        .unwrap();

    assert_eq!(outcome.outputs.len(), 2);
    fx.media.child("lecture (transcription).srt").assert(TRANSCRIPT);
    fx.media.child("lecture.srt").assert(TRANSLATION);
    let engine_call = &fx.runner.calls()[1];
    assert_eq!(value_after(engine_call, "--action"), Some("transcribe"));
}

#[tokio::test]
async fn test_existing_transcript_is_only_translated() {
    let fx = Fixture::new();
    let transcript = fx.media.child("clip (transcription).srt");
    transcript.write_str(TRANSCRIPT).unwrap();

    let outcome = fx
        .workflow(false, "real-key", Box::new(FixedBackend))
        .run(&path_str(transcript.path()))
        .await
        .unwrap();

    let translated = fx.media.child("clip.srt");
    assert_eq!(outcome.outputs, vec![translated.path().to_path_buf()]);
    translated.assert(TRANSLATION);
    transcript.assert(TRANSCRIPT);
    assert!(fx.runner.calls().is_empty());
}

#[tokio::test]
async fn test_remote_video_is_muxed_into_current_dir() {
    let fx = Fixture::new();

    let outcome = fx
        .workflow(false, "insert-key-here", Box::new(FixedBackend))
        .run("https://example.com/watch?v=abc123")
        .await
        .unwrap();

    let muxed = fx.cwd.child("Talk [abc123].mkv");
    assert_eq!(outcome.outputs, vec![muxed.path().to_path_buf()]);
    assert!(muxed.path().exists());
    assert_eq!(
        fx.runner.programs(),
        vec!["yt-dlp", "yt-dlp", "ffmpeg", "engine", "ffmpeg"]
    );

    let mux = &fx.runner.calls()[4];
    assert!(mux.args.iter().any(|a| a == "language=eng"));
    assert!(!fx.layout().tmp_dir().join("Talk [abc123].mkv").exists());
    assert!(!fx.layout().tmp_dir().join("Talk [abc123] (transcription).srt").exists());
}

#[tokio::test(start_paused = true)]
async fn test_failed_translation_writes_no_output() {
    let fx = Fixture::new();
    let video = fx.media.child("lecture.mp4");
    video.write_str("video").unwrap();

    let err = fx
        .workflow(true, "real-key", Box::new(FailingBackend))
        .run(&path_str(video.path()))
        .await
        .unwrap_err();

    assert!(matches!(err, SasayakiError::Translation(_)));
    assert!(!fx.media.child("lecture.srt").path().exists());
    assert!(!fx.media.child("lecture (transcription).srt").path().exists());
}

#[tokio::test]
async fn test_missing_key_stops_before_any_work() {
    let fx = Fixture::new();
    let video = fx.media.child("lecture.mp4");
    video.write_str("video").unwrap();

    let err = fx
        .workflow(true, "insert-key-here", Box::new(FixedBackend))
        .run(&path_str(video.path()))
        .await
        .unwrap_err();

    assert!(matches!(err, SasayakiError::MissingApiKey { .. }));
    assert!(fx.runner.calls().is_empty());
}

#[tokio::test]
async fn test_missing_local_input() {
    let fx = Fixture::new();

    let err = fx
        .workflow(false, "insert-key-here", Box::new(FixedBackend))
        .run(&path_str(&fx.media.path().join("nope.mp4")))
        .await
        .unwrap_err();

    assert!(matches!(err, SasayakiError::FileNotFound(_)));
}

#[tokio::test]
async fn test_remote_video_with_translation_muxes_translated_track() {
    let fx = Fixture::new();

    let outcome = fx
        .workflow(true, "real-key", Box::new(FixedBackend))
        .run("https://example.com/watch?v=abc123")
        .await
        .unwrap();

    assert_eq!(outcome.outputs, vec![fx.cwd.path().join("Talk [abc123].mkv")]);

    let mux = fx.runner.calls().last().unwrap().clone();
    assert_eq!(FakeRunner::tool(&mux), "ffmpeg");
    assert!(mux.args.iter().any(|a| a == "language=english"));
    let inputs: Vec<&str> = mux
        .args
        .windows(2)
        .filter(|w| w[0] == "-i")
        .map(|w| w[1].as_str())
        .collect();
    assert_eq!(
        Path::new(inputs[1]),
        fx.layout().tmp_dir().join("Talk [abc123].srt")
    );
    assert!(!fx.layout().tmp_dir().join("Talk [abc123].srt").exists());
    assert!(!fx.layout().tmp_dir().join("Talk [abc123] (transcription).srt").exists());
}

#[tokio::test]
async fn test_engine_failure_is_fatal_and_removes_audio() {
    let fx = Fixture::with_runner(FakeRunner::failing("engine"));
    let video = fx.media.child("lecture.mp4");
    video.write_str("video").unwrap();

    let err = fx
        .workflow(false, "insert-key-here", Box::new(FixedBackend))
        .run(&path_str(video.path()))
        .await
        .unwrap_err();

    assert!(matches!(err, SasayakiError::Process { .. }));
    assert_eq!(fx.runner.programs(), vec!["ffmpeg", "engine"]);
    assert!(!fx.layout().tmp_dir().join("audio.wav").exists());
    assert_eq!(std::fs::read_dir(fx.media.path()).unwrap().count(), 1);
}

#[tokio::test]
async fn test_audio_extraction_failure_stops_the_run() {
    let fx = Fixture::with_runner(FakeRunner::failing("ffmpeg"));
    let video = fx.media.child("lecture.mp4");
    video.write_str("video").unwrap();

    let err = fx
        .workflow(false, "insert-key-here", Box::new(FixedBackend))
        .run(&path_str(video.path()))
        .await
        .unwrap_err();

    assert!(matches!(err, SasayakiError::Process { .. }));
    assert_eq!(fx.runner.programs(), vec!["ffmpeg"]);
    assert_eq!(std::fs::read_dir(fx.media.path()).unwrap().count(), 1);
}

#[tokio::test]
async fn test_blocked_destination_does_not_abort_finalize() {
    let fx = Fixture::new();
    let video = fx.media.child("lecture.mp4");
    video.write_str("video").unwrap();
    fx.media.child("lecture (transcription).srt").create_dir_all().unwrap();

    let outcome = fx
        .workflow(true, "real-key", Box::new(FixedBackend))
        .run(&path_str(video.path()))
        .await
        .unwrap();

    let translated = fx.media.child("lecture.srt");
    assert_eq!(outcome.outputs, vec![translated.path().to_path_buf()]);
    translated.assert(TRANSLATION);
    assert!(fx.media.child("lecture (transcription).srt").path().is_dir());
}
