use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use tokio::fs as async_fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::config::{ConfigFile, EngineKind, RunConfig};
use crate::error::{Result, SasayakiError};

const MODEL_BASE_URL: &str = "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";

/// Seconds the user has to abort an uninstall.
pub const UNINSTALL_COUNTDOWN: u64 = 10;

/// Paths inside the per-user application directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppLayout {
    root: PathBuf,
}

impl AppLayout {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    /// `~/.sasayaki`
    pub fn default_location() -> Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| SasayakiError::Config("Cannot determine home directory".to_string()))?;
        Ok(Self::new(home.join(".sasayaki")))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn exists(&self) -> bool {
        self.root.is_dir()
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    pub fn models_dir(&self) -> PathBuf {
        self.root.join("models")
    }

    /// Scratch directory, wiped at the start of every run
    pub fn tmp_dir(&self) -> PathBuf {
        self.root.join("tmp")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.root.join("log")
    }

    pub fn whisper_cpp_binary(&self) -> PathBuf {
        if cfg!(windows) {
            self.root.join("whisper-cli.exe")
        } else {
            self.root.join("whisper-cli")
        }
    }

    pub fn whisper_cpp_model(&self, model: &str) -> PathBuf {
        self.models_dir().join(model_filename(model))
    }

    pub fn whisper_env_python(&self) -> PathBuf {
        self.root.join("whisper-env").join("bin").join("python")
    }

    pub fn transcribe_script(&self) -> PathBuf {
        self.root.join("transcribe.py")
    }

    /// Remove and recreate the scratch directory.
    pub fn reset_tmp(&self) -> Result<PathBuf> {
        let tmp = self.tmp_dir();
        if tmp.exists() {
            std::fs::remove_dir_all(&tmp)?;
        }
        std::fs::create_dir_all(&tmp)?;
        debug!("Cleared dir: {}", tmp.display());
        Ok(tmp)
    }
}

/// `ggml-<model>.bin`
pub fn model_filename(model: &str) -> String {
    format!("ggml-{}.bin", model)
}

pub fn model_url(model: &str) -> String {
    format!("{}/{}", MODEL_BASE_URL, model_filename(model))
}

/// Creates, checks and removes the application directory.
pub struct SetupManager {
    client: Client,
    layout: AppLayout,
}

impl SetupManager {
    pub fn new(layout: AppLayout) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("sasayaki/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, layout })
    }

    pub fn layout(&self) -> &AppLayout {
        &self.layout
    }

    /// Lay out the application directory and write a fresh config file.
    pub fn install(&self) -> Result<PathBuf> {
        info!("Creating application directory: {}", self.layout.root().display());
        std::fs::create_dir_all(self.layout.tmp_dir())?;
        std::fs::create_dir_all(self.layout.models_dir())?;
        std::fs::create_dir_all(self.layout.log_dir())?;
        self.write_config()
    }

    /// Write the default config file, replacing any existing one.
    pub fn write_config(&self) -> Result<PathBuf> {
        std::fs::create_dir_all(self.layout.root())?;
        let path = self.layout.config_path();
        ConfigFile::write_template(&path)?;
        info!("Created config file: {}", path.display());
        Ok(path)
    }

    /// Delete the application directory after a countdown the user can interrupt.
    pub async fn uninstall(&self, countdown: u64) -> Result<()> {
        println!("Directory will be deleted in {} seconds: {}", countdown, self.layout.root().display());
        println!("Hit ctrl + C to stop.");
        for remaining in (1..=countdown).rev() {
            print!("{} ", remaining);
            std::io::stdout().flush()?;
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        println!();

        if self.layout.exists() {
            async_fs::remove_dir_all(self.layout.root()).await?;
        }
        info!("Removed {}", self.layout.root().display());
        Ok(())
    }

    /// Make sure the selected engine can run: the whisper.cpp binary must be
    /// installed and its model is downloaded on first use.
    pub async fn prepare_engine(&self, config: &RunConfig) -> Result<()> {
        if config.engine != EngineKind::WhisperCpp {
            return Ok(());
        }

        let binary = self.layout.whisper_cpp_binary();
        if !binary.exists() {
            return Err(SasayakiError::Config(format!(
                "whisper.cpp binary not found at {}. Copy a whisper-cli build there first.",
                binary.display()
            )));
        }

        let model_path = self.layout.whisper_cpp_model(&config.model);
        if !model_path.exists() {
            self.download_model(&config.model).await?;
        }
        Ok(())
    }

    /// Download a whisper.cpp ggml model into the models directory.
    pub async fn download_model(&self, model: &str) -> Result<PathBuf> {
        let local_path = self.layout.whisper_cpp_model(model);
        if local_path.exists() {
            info!("Model {} already exists at {}", model, local_path.display());
            return Ok(local_path);
        }
        async_fs::create_dir_all(self.layout.models_dir()).await?;

        let url = model_url(model);
        info!("Downloading whisper.cpp model ({})", model_filename(model));

        let mut response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(SasayakiError::Download(format!(
                "Failed to download model {}: HTTP {}",
                model,
                response.status()
            )));
        }

        let pb = ProgressBar::new(response.content_length().unwrap_or(0));
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
        {
            pb.set_style(style.progress_chars("#>-"));
        }

        // Only a complete download is renamed to the model path
        let temp_path = local_path.with_extension("tmp");
        let mut file = async_fs::File::create(&temp_path).await?;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            pb.inc(chunk.len() as u64);
        }
        file.flush().await?;
        drop(file);

        async_fs::rename(&temp_path, &local_path).await?;

        pb.finish_with_message(format!("Downloaded {}", model));
        info!("Successfully downloaded {} to {}", model, local_path.display());
        Ok(local_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunOptions;

    #[test]
    fn test_layout_paths() {
        let layout = AppLayout::new("/home/u/.sasayaki");
        assert_eq!(layout.config_path(), Path::new("/home/u/.sasayaki/config.toml"));
        assert_eq!(
            layout.whisper_cpp_model("large-v3"),
            Path::new("/home/u/.sasayaki/models/ggml-large-v3.bin")
        );
        assert_eq!(layout.tmp_dir(), Path::new("/home/u/.sasayaki/tmp"));
    }

    #[test]
    fn test_model_url() {
        assert_eq!(
            model_url("small"),
            "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-small.bin"
        );
    }

    #[test]
    fn test_reset_tmp_wipes_previous_run() {
        let dir = tempfile::tempdir().unwrap();
        let layout = AppLayout::new(dir.path());
        std::fs::create_dir_all(layout.tmp_dir()).unwrap();
        std::fs::write(layout.tmp_dir().join("stale.wav"), b"old").unwrap();

        let tmp = layout.reset_tmp().unwrap();
        assert!(tmp.is_dir());
        assert_eq!(std::fs::read_dir(&tmp).unwrap().count(), 0);
    }

    #[test]
    fn test_install_creates_layout_and_config() {
        let dir = tempfile::tempdir().unwrap();
        let manager = SetupManager::new(AppLayout::new(dir.path().join(".sasayaki"))).unwrap();

        let config_path = manager.install().unwrap();
        assert!(manager.layout().models_dir().is_dir());
        assert!(manager.layout().tmp_dir().is_dir());
        assert!(!ConfigFile::from_file(config_path).unwrap().has_api_key());
    }

    #[tokio::test(start_paused = true)]
    async fn test_uninstall_removes_directory() {
        let dir = tempfile::tempdir().unwrap();
        let manager = SetupManager::new(AppLayout::new(dir.path().join(".sasayaki"))).unwrap();
        manager.install().unwrap();

        manager.uninstall(UNINSTALL_COUNTDOWN).await.unwrap();
        assert!(!manager.layout().exists());
    }

    #[tokio::test]
    async fn test_prepare_engine_requires_whisper_cpp_binary() {
        let dir = tempfile::tempdir().unwrap();
        let manager = SetupManager::new(AppLayout::new(dir.path())).unwrap();
        let options = RunOptions {
            force_cpp: true,
            ..RunOptions::default()
        };
        let config = RunConfig::resolve(ConfigFile::default(), manager.layout().config_path(), options, false);

        let err = manager.prepare_engine(&config).await.unwrap_err();
        assert!(matches!(err, SasayakiError::Config(msg) if msg.contains("whisper.cpp binary not found")));
    }
}
