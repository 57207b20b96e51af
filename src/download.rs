use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Result, SasayakiError};
use crate::process::{ExternalCommand, ProcessRunner};

/// yt-dlp output template: title capped at 150 bytes plus the video id.
pub const NAME_TEMPLATE: &str = "%(title).150B%(title.151B&…|)s [%(display_id)s].%(ext)s";

/// Returns true for inputs that must be fetched before processing.
pub fn is_remote(input: &str) -> bool {
    let trimmed = input.trim();
    trimmed.starts_with("http://") || trimmed.starts_with("https://")
}

/// Ask yt-dlp which filename the template resolves to, without downloading.
pub fn filename_command(url: &str, is_windows: bool) -> ExternalCommand {
    let mut cmd = ExternalCommand::new("yt-dlp", "Resolving video filename.")
        .arg("--windows-filenames")
        .opt("--remux-video", "mkv")
        .opt("-o", NAME_TEMPLATE)
        .opt("--print", "filename")
        .arg(url);

    // Console output on Windows is not UTF-8
    if is_windows {
        cmd = cmd.arg("--restrict-filenames");
    }
    cmd
}

pub fn download_command<P: AsRef<Path>>(url: &str, destination: P) -> ExternalCommand {
    ExternalCommand::new("yt-dlp", "Downloading video.")
        .opt("--remux-video", "mkv")
        .arg("-o")
        .path(destination)
        .arg(url)
}

/// Turn the filename printed by yt-dlp into the `.mkv` name used in the work dir.
pub fn work_video_name(printed: &str) -> Result<String> {
    let printed = printed.trim();
    let line = printed.lines().last().unwrap_or_default().trim();

    let stem = Path::new(line)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            SasayakiError::Download(format!("yt-dlp returned no usable filename: {:?}", printed))
        })?;

    Ok(format!("{}.mkv", stem))
}

/// Download a remote video into `work_dir` and return the local path.
pub async fn download_video(
    runner: &dyn ProcessRunner,
    url: &str,
    work_dir: &Path,
    is_windows: bool,
) -> Result<PathBuf> {
    info!("Downloading remote video: {}", url);

    let printed = runner.capture(&filename_command(url, is_windows)).await?;
    let name = work_video_name(&printed)?;
    let destination = work_dir.join(&name);
    debug!("Work video: {}", destination.display());

    runner.run(&download_command(url, &destination)).await?;
    Ok(destination)
}
