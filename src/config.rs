use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, SasayakiError};
use crate::translate::{DEFAULT_CHUNK_LIMIT, gemini};

/// Placeholder written into fresh config files in place of a real API key.
pub const PLACEHOLDER_KEY: &str = "insert-key-here";

const CONFIG_TEMPLATE: &str = r#"# Google Gemini API key
key = "insert-key-here"

# Number of CPU threads used for transcription
threads = "8"

# Whisper model, e.g. large-v3, medium, small, tiny
model = "medium"

# Always use whisper.cpp instead of faster-whisper
# (whisper.cpp is always used on Windows)
cpp = false

# Optional: characters per translation request
# chunk_limit = 8500

# Optional: Gemini model used for translation
# gemini_model = "gemini-1.5-pro"
"#;

fn is_usable_key(key: &str) -> bool {
    let key = key.trim();
    !key.is_empty() && key != PLACEHOLDER_KEY
}

fn default_key() -> String {
    PLACEHOLDER_KEY.to_string()
}

fn default_threads() -> String {
    "8".to_string()
}

fn default_model() -> String {
    "medium".to_string()
}

/// On-disk configuration document (`config.toml` in the application directory).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Google Gemini API key
    #[serde(default = "default_key")]
    pub key: String,
    /// CPU thread count, passed verbatim to the engine
    #[serde(default = "default_threads")]
    pub threads: String,
    /// Whisper model name
    #[serde(default = "default_model")]
    pub model: String,
    /// Force whisper.cpp
    #[serde(default)]
    pub cpp: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_limit: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini_model: Option<String>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            key: default_key(),
            threads: default_threads(),
            model: default_model(),
            cpp: false,
            chunk_limit: None,
            gemini_model: None,
        }
    }
}

impl ConfigFile {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            SasayakiError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        toml::from_str(&content).map_err(|e| {
            SasayakiError::Config(format!("Failed to parse config file {}: {}", path.display(), e))
        })
    }

    /// Write the commented default config, replacing any existing file.
    pub fn write_template<P: AsRef<Path>>(path: P) -> Result<()> {
        std::fs::write(path.as_ref(), CONFIG_TEMPLATE).map_err(|e| {
            SasayakiError::Config(format!("Failed to write config file: {}", e))
        })
    }

    pub fn has_api_key(&self) -> bool {
        is_usable_key(&self.key)
    }
}

/// Which transcription engine runs for this invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    /// faster-whisper through the Python helper script
    FasterWhisper,
    /// whisper.cpp command line binary
    WhisperCpp,
}

/// Size and pacing knobs for the translation session.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationTuning {
    /// Characters per chunk before it is closed
    pub chunk_limit: usize,
    /// Wait before the single retry of a failed request
    pub retry_cooldown: Duration,
    /// Wait between consecutive requests after the first
    pub turn_delay: Duration,
}

impl Default for TranslationTuning {
    fn default() -> Self {
        Self {
            chunk_limit: DEFAULT_CHUNK_LIMIT,
            retry_cooldown: Duration::from_secs(90),
            turn_delay: Duration::from_secs(5),
        }
    }
}

/// Command line choices that feed into the run configuration.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub translate: bool,
    pub target_language: String,
    pub force_cpp: bool,
    pub model: Option<String>,
    pub force_download: bool,
    pub verbose: bool,
    pub debug: bool,
}

/// Everything one invocation needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub config_path: PathBuf,
    pub api_key: String,
    pub threads: String,
    pub model: String,
    pub engine: EngineKind,
    pub translate: bool,
    pub target_language: String,
    pub force_download: bool,
    pub verbose: bool,
    pub debug: bool,
    pub gemini_model: String,
    pub tuning: TranslationTuning,
}

impl RunConfig {
    pub fn resolve(
        file: ConfigFile,
        config_path: PathBuf,
        options: RunOptions,
        is_windows: bool,
    ) -> Self {
        let engine = if is_windows || options.force_cpp || file.cpp {
            EngineKind::WhisperCpp
        } else {
            EngineKind::FasterWhisper
        };

        let mut tuning = TranslationTuning::default();
        if let Some(limit) = file.chunk_limit.filter(|l| *l > 0) {
            tuning.chunk_limit = limit;
        }

        Self {
            config_path,
            api_key: file.key,
            threads: file.threads,
            model: options.model.filter(|m| !m.is_empty()).unwrap_or(file.model),
            engine,
            translate: options.translate,
            target_language: options.target_language,
            force_download: options.force_download,
            verbose: options.verbose,
            debug: options.debug,
            gemini_model: file
                .gemini_model
                .unwrap_or_else(|| gemini::DEFAULT_MODEL.to_string()),
            tuning,
        }
    }

    /// Fail when translation is needed but no usable API key is configured.
    pub fn require_api_key(&self) -> Result<()> {
        if !is_usable_key(&self.api_key) {
            return Err(SasayakiError::MissingApiKey {
                config_path: self.config_path.clone(),
            });
        }
        Ok(())
    }
}
