use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;

use crate::config::MediaSection;

use super::{SplitError, SplitResult};

/// Narrow seam over the external decoder so splitting can run against a fake.
#[async_trait]
pub trait MediaTool: Send + Sync {
    /// Total duration in seconds.
    async fn probe_duration(&self, input: &Path) -> SplitResult<f64>;

    /// Writes `[start, start + duration)` of `input` to `output` as mono
    /// audio at the configured sample rate.
    async fn extract(
        &self,
        input: &Path,
        start: f64,
        duration: f64,
        output: &Path,
    ) -> SplitResult<()>;
}

#[derive(Debug, Clone)]
pub struct FfmpegTool {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    sample_rate: u32,
    channels: u32,
}

impl FfmpegTool {
    pub fn new(config: &MediaSection) -> Self {
        Self {
            ffmpeg: config.ffmpeg.clone(),
            ffprobe: config.ffprobe.clone(),
            sample_rate: config.sample_rate,
            channels: config.channels,
        }
    }

    pub fn extract_args(&self, input: &Path, start: f64, duration: f64, output: &Path) -> Vec<String> {
        vec![
            "-y".into(),
            "-ss".into(),
            format!("{start:.3}"),
            "-t".into(),
            format!("{duration:.3}"),
            "-i".into(),
            input.to_string_lossy().into_owned(),
            "-ac".into(),
            self.channels.to_string(),
            "-ar".into(),
            self.sample_rate.to_string(),
            output.to_string_lossy().into_owned(),
        ]
    }
}

fn describe(program: &Path, args: &[String]) -> String {
    let mut command = program.display().to_string();
    for arg in args {
        command.push(' ');
        command.push_str(arg);
    }
    command
}

#[async_trait]
impl MediaTool for FfmpegTool {
    async fn probe_duration(&self, input: &Path) -> SplitResult<f64> {
        let output = Command::new(&self.ffprobe)
            .kill_on_drop(true)
            .arg("-v")
            .arg("error")
            .arg("-show_entries")
            .arg("format=duration")
            .arg("-of")
            .arg("default=noprint_wrappers=1:nokey=1")
            .arg(input)
            .output()
            .await
            .map_err(|source| SplitError::Io {
                path: self.ffprobe.clone(),
                source,
            })?;
        if !output.status.success() {
            return Err(SplitError::Probe {
                path: input.to_path_buf(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let value = stdout.trim();
        value.parse::<f64>().map_err(|_| SplitError::Probe {
            path: input.to_path_buf(),
            message: format!("non-numeric duration {value:?}"),
        })
    }

    async fn extract(
        &self,
        input: &Path,
        start: f64,
        duration: f64,
        output: &Path,
    ) -> SplitResult<()> {
        let args = self.extract_args(input, start, duration, output);
        let result = Command::new(&self.ffmpeg)
            .kill_on_drop(true)
            .args(&args)
            .output()
            .await
            .map_err(|source| SplitError::Io {
                path: self.ffmpeg.clone(),
                source,
            })?;
        if !result.status.success() {
            return Err(SplitError::Transcode {
                command: describe(&self.ffmpeg, &args),
                status: result.status.code(),
                stderr: String::from_utf8_lossy(&result.stderr).into_owned(),
            });
        }
        Ok(())
    }
}
