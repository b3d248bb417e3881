//! Builds `ffmpeg`/`ffprobe` argument lists for audio book assembly and runs
//! them as subprocesses.
//!
//! [`commands`] holds the pure builders, [`client::FfmpegClient`] runs them and
//! turns the tool output into typed results.

pub mod client;
pub mod commands;
pub mod config;
pub mod errors;
pub mod prelude;

pub use client::{CommandResult, FfmpegClient, VolumeMetrics};
pub use config::Conf;
pub use errors::WrapperError;
