use crate::commands::{self, ConcatOptions, NormalizeOptions, ToolCommand};
use crate::config::Conf;
use crate::prelude::*;
use std::path::{Path, PathBuf};

mod utils;
pub use utils::{parse_duration, parse_volume_metrics, CommandResult, VolumeMetrics};
use utils::ffmpeg::run_tool;

/// Runs the commands from [`crate::commands`] against the configured binaries.
///
/// Every call spawns exactly one process and owns it until it exits, so a
/// client can be shared freely between tasks.
#[derive(Debug, Clone)]
pub struct FfmpegClient {
    conf: Conf,
}

impl FfmpegClient {
    pub fn new(conf: Conf) -> Self {
        Self { conf }
    }
}

impl FfmpegClient {
    /// Runs an already built command. A nonzero exit status is returned as
    /// [`crate::errors::WrapperError::Execution`].
    #[tracing::instrument(skip(self, command), fields(tool = command.tool.name()))]
    pub async fn run(&self, command: &ToolCommand) -> Result<CommandResult> {
        let program = self.conf.program(command.tool);
        run_tool(program, &command.args, self.conf.timeout()).await
    }

    #[tracing::instrument(skip(self, options), fields(parts = options.parts.len()))]
    pub async fn concatenate(&self, options: &ConcatOptions) -> Result<CommandResult> {
        info!("concatenating {} parts into {:?}", options.parts.len(), options.output);
        self.run(&commands::concat_command(options)?).await
    }

    #[tracing::instrument(skip(self, parts), fields(parts = parts.len()))]
    pub async fn concatenate_simple(
        &self,
        parts: &[PathBuf],
        output: &Path,
        channels: u32,
    ) -> Result<CommandResult> {
        self.run(&commands::simple_concat_command(parts, output, channels)?)
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn convert(
        &self,
        input: &Path,
        output: &Path,
        bit_rate_kbps: u32,
    ) -> Result<CommandResult> {
        self.run(&commands::convert_command(input, output, bit_rate_kbps)?)
            .await
    }

    /// Duration of `path` in seconds, as reported by ffprobe.
    #[tracing::instrument(skip(self))]
    pub async fn duration(&self, path: &Path) -> Result<f64> {
        let result = self.run(&commands::duration_command(path)?).await?;
        let seconds = parse_duration(&result.stdout)?;
        debug!("{:?} is {} seconds long", path, seconds);
        Ok(seconds)
    }

    #[tracing::instrument(skip(self))]
    pub async fn silence(&self, seconds: f64, output: &Path) -> Result<CommandResult> {
        self.run(&commands::silence_command(seconds, output)?).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn normalize(&self, options: &NormalizeOptions) -> Result<CommandResult> {
        self.run(&commands::normalize_command(options)?).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn detect_volume(&self, path: &Path) -> Result<VolumeMetrics> {
        let result = self.run(&commands::volume_detect_command(path)?).await?;
        let metrics = parse_volume_metrics(&result.stderr)?;
        debug!("volume of {:?}: {:?}", path, metrics);
        Ok(metrics)
    }
}
