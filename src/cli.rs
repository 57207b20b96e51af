use clap::Parser;

use crate::config::RunOptions;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Subtitle generator for local and online videos", long_about = None)]
pub struct Args {
    /// Video URL, video file, or subtitle file to translate
    pub input: Option<String>,

    /// Create the application directory and a default config file
    #[arg(long)]
    pub install: bool,

    /// Remove the application directory
    #[arg(long)]
    pub uninstall: bool,

    /// Reset the config file to its defaults
    #[arg(long)]
    pub config: bool,

    /// Download the input with yt-dlp even if it does not look like a URL
    #[arg(long)]
    pub ytdlp: bool,

    /// Show the full output of external commands
    #[arg(short, long)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Translate the transcript with Google Gemini
    #[arg(long)]
    pub gemini: bool,

    /// Target language for Gemini translation
    #[arg(long, default_value = "english")]
    pub lang: String,

    /// Use whisper.cpp instead of faster-whisper
    #[arg(long)]
    pub cpp: bool,

    /// Whisper model, overrides the config file
    #[arg(long)]
    pub model: Option<String>,
}

impl Args {
    pub fn to_run_options(&self) -> RunOptions {
        RunOptions {
            translate: self.gemini,
            target_language: self.lang.clone(),
            force_cpp: self.cpp,
            model: self.model.clone(),
            force_download: self.ytdlp,
            verbose: self.verbose,
            debug: self.debug,
        }
    }
}
