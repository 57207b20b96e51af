//! Execution of external programs (yt-dlp, ffmpeg, transcription engines).
//!
//! Commands are described by [`ExternalCommand`] and executed through the
//! [`ProcessRunner`] trait so the pipeline can be driven by a fake in tests.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{Result, SasayakiError};

/// Abstract external command representation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCommand {
    pub program: String,
    pub args: Vec<String>,
    pub description: String,
    /// Run with the application directory as working directory
    pub in_app_dir: bool,
}

impl ExternalCommand {
    pub fn new<S1: Into<String>, S2: Into<String>>(program: S1, description: S2) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            description: description.into(),
            in_app_dir: false,
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Add a path argument
    pub fn path<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Add a flag followed by its value
    pub fn opt<S1: Into<String>, S2: Into<String>>(self, flag: S1, value: S2) -> Self {
        self.arg(flag).arg(value)
    }

    pub fn in_app_dir(mut self) -> Self {
        self.in_app_dir = true;
        self
    }

    /// The full command line, for diagnostics
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Runs external programs on behalf of the pipeline.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run a pipeline step. A non-zero exit is an error carrying the
    /// command line and the captured output.
    async fn run(&self, command: &ExternalCommand) -> Result<()>;

    /// Run quietly and return standard output.
    async fn capture(&self, command: &ExternalCommand) -> Result<String>;
}

/// Runs commands on the host system.
pub struct SystemRunner {
    app_dir: PathBuf,
    verbose: bool,
}

impl SystemRunner {
    pub fn new<P: Into<PathBuf>>(app_dir: P, verbose: bool) -> Self {
        Self {
            app_dir: app_dir.into(),
            verbose,
        }
    }

    fn command(&self, command: &ExternalCommand) -> Command {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args);
        if command.in_app_dir {
            cmd.current_dir(&self.app_dir);
        }
        cmd
    }

    fn spawn_error(command: &ExternalCommand, e: std::io::Error) -> SasayakiError {
        SasayakiError::Process {
            command: command.command_line(),
            output: format!("failed to start {}: {}", command.program, e),
        }
    }

    async fn run_streaming(&self, command: &ExternalCommand) -> Result<()> {
        println!("━━━ {} ━━━\n", command.description);

        let status = self
            .command(command)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| Self::spawn_error(command, e))?;

        println!();

        if !status.success() {
            return Err(SasayakiError::Process {
                command: command.command_line(),
                output: format!("exited with {}", status),
            });
        }
        Ok(())
    }

    async fn run_with_spinner(&self, command: &ExternalCommand) -> Result<()> {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message(command.description.clone());
        spinner.enable_steady_tick(Duration::from_millis(100));

        let output = match self.command(command).output().await {
            Ok(output) => output,
            Err(e) => {
                spinner.abandon_with_message(format!("✗ {}", command.description));
                return Err(Self::spawn_error(command, e));
            }
        };

        if !output.status.success() {
            spinner.abandon_with_message(format!("✗ {}", command.description));
            let mut combined = String::from_utf8_lossy(&output.stdout).to_string();
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
            return Err(SasayakiError::Process {
                command: command.command_line(),
                output: combined,
            });
        }

        spinner.finish_with_message(format!("✓ {}", command.description));
        Ok(())
    }
}

#[async_trait]
impl ProcessRunner for SystemRunner {
    async fn run(&self, command: &ExternalCommand) -> Result<()> {
        debug!("Executing: {}", command.command_line());
        info!("{}", command.description);

        if self.verbose {
            self.run_streaming(command).await
        } else {
            self.run_with_spinner(command).await
        }
    }

    async fn capture(&self, command: &ExternalCommand) -> Result<String> {
        debug!("Executing: {}", command.command_line());

        let output = self
            .command(command)
            .output()
            .await
            .map_err(|e| Self::spawn_error(command, e))?;

        if !output.status.success() {
            let mut combined = String::from_utf8_lossy(&output.stdout).to_string();
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
            return Err(SasayakiError::Process {
                command: command.command_line(),
                output: combined,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}
