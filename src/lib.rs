//! Sasayaki - subtitles for local and online videos
//!
//! Downloads with yt-dlp, extracts audio with ffmpeg, transcribes with
//! faster-whisper or whisper.cpp and optionally translates the transcript
//! with Google Gemini.

pub mod cli;
pub mod config;
pub mod download;
pub mod error;
pub mod media;
pub mod process;
pub mod setup;
pub mod subtitle;
pub mod transcribe;
pub mod translate;
pub mod workflow;
