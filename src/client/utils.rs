use crate::errors::WrapperError;
use crate::prelude::*;
use anyhow::Context;
use std::process::Output;

/// Exit status and decoded output of one finished tool run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// `-1` when the process was terminated by a signal.
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// Turns a failed run of `program` into [`WrapperError::Execution`].
    pub fn into_error(self, program: &str) -> WrapperError {
        WrapperError::Execution {
            program: program.to_string(),
            status: self.status,
            stdout: self.stdout,
            stderr: self.stderr,
        }
    }
}

impl From<Output> for CommandResult {
    fn from(output: Output) -> Self {
        Self {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

/// Loudness figures reported by the `volumedetect` filter, in dB.
///
/// A `None` field means the matching line was missing from the log.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VolumeMetrics {
    /// `mean_volume` from the filter output.
    pub root_mean_square: Option<f64>,
    pub max_volume: Option<f64>,
}

/// Parses ffprobe's `csv=p=0` duration output into seconds.
///
/// Only the first comma separated field is used. Anything that is not a
/// finite, non-negative number (ffprobe prints `N/A` for streams without a
/// duration) is an error rather than a zero duration.
pub fn parse_duration(stdout: &str) -> Result<f64> {
    let value = stdout.trim();
    let value = value.split(',').next().unwrap_or(value).trim();
    trace!("parsing duration from: {:?}", value);
    seconds(value).map_err(WrapperError::DurationParse)
}

fn seconds(value: &str) -> anyhow::Result<f64> {
    let seconds = value
        .parse::<f64>()
        .with_context(|| format!("could not parse {:?} as seconds", value))?;
    anyhow::ensure!(
        seconds.is_finite() && seconds >= 0.0,
        "{:?} is not a valid duration",
        value
    );
    Ok(seconds)
}

/// Extracts `mean_volume` and `max_volume` from a volumedetect log.
pub fn parse_volume_metrics(stderr: &str) -> Result<VolumeMetrics> {
    let mut metrics = VolumeMetrics::default();
    for line in stderr.lines() {
        let slot = if line.contains("mean_volume:") {
            &mut metrics.root_mean_square
        } else if line.contains("max_volume:") {
            &mut metrics.max_volume
        } else {
            continue;
        };
        *slot = Some(decibels(line).map_err(WrapperError::VolumeParse)?);
    }
    if metrics == VolumeMetrics::default() {
        warn!("no volumedetect lines found in the ffmpeg output");
    }
    Ok(metrics)
}

/// The value is the token right before the trailing unit (`... -16.7 dB`).
fn decibels(line: &str) -> anyhow::Result<f64> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let value = tokens
        .len()
        .checked_sub(2)
        .and_then(|index| tokens.get(index))
        .with_context(|| format!("no value in line {:?}", line))?;
    value
        .parse::<f64>()
        .with_context(|| format!("could not parse {:?} in line {:?}", value, line))
}

pub mod ffmpeg;

#[cfg(test)]
mod tests {
    use super::*;

    const VOLUMEDETECT_LOG: &str = "\
Input #0, wav, from 'book.wav':
  Duration: 00:00:04.00, bitrate: 1536 kb/s
[Parsed_volumedetect_0 @ 0x55d5c4f0a8c0] n_samples: 384000
[Parsed_volumedetect_0 @ 0x55d5c4f0a8c0] mean_volume: -16.7 dB
[Parsed_volumedetect_0 @ 0x55d5c4f0a8c0] max_volume: -0.0 dB
[Parsed_volumedetect_0 @ 0x55d5c4f0a8c0] histogram_0db: 12
";

    #[test]
    fn duration_from_probe_output() {
        assert_eq!(parse_duration("0.850000\n").unwrap(), 0.85);
    }

    #[test]
    fn duration_uses_first_csv_field() {
        assert_eq!(parse_duration("12.500000,\n").unwrap(), 12.5);
    }

    #[test]
    fn malformed_duration_is_a_parse_failure() {
        let err = parse_duration("N/A\n").unwrap_err();
        assert!(matches!(err, WrapperError::DurationParse(_)));

        let err = parse_duration("").unwrap_err();
        assert!(err.is_parse_failure());
    }

    #[test]
    fn non_finite_or_negative_duration_is_a_parse_failure() {
        for output in ["inf\n", "NaN\n", "-1.500000\n", "-inf"] {
            let err = parse_duration(output).unwrap_err();
            assert!(
                matches!(err, WrapperError::DurationParse(_)),
                "{:?} was accepted",
                output
            );
        }
        assert_eq!(parse_duration("0.000000\n").unwrap(), 0.0);
    }

    #[test]
    fn volume_metrics_from_log() {
        let metrics = parse_volume_metrics(VOLUMEDETECT_LOG).unwrap();

        assert_eq!(
            metrics,
            VolumeMetrics {
                root_mean_square: Some(-16.7),
                max_volume: Some(-0.0),
            }
        );
    }

    #[test]
    fn missing_lines_leave_fields_empty() {
        let metrics =
            parse_volume_metrics("[Parsed_volumedetect_0 @ 0x1] max_volume: -3.5 dB\n").unwrap();

        assert_eq!(metrics.root_mean_square, None);
        assert_eq!(metrics.max_volume, Some(-3.5));
        assert_eq!(parse_volume_metrics("").unwrap(), VolumeMetrics::default());
    }

    #[test]
    fn malformed_volume_line_is_a_parse_failure() {
        let err = parse_volume_metrics("[Parsed_volumedetect_0 @ 0x1] mean_volume: loud dB\n")
            .unwrap_err();
        assert!(matches!(err, WrapperError::VolumeParse(_)));

        let err = parse_volume_metrics("mean_volume:").unwrap_err();
        assert!(err.is_parse_failure());
    }

    #[test]
    fn nonzero_result_becomes_execution_failure() {
        let result = CommandResult {
            status: 1,
            stdout: "out".to_string(),
            stderr: "No such file or directory".to_string(),
        };
        assert!(!result.success());

        match result.into_error("ffmpeg") {
            WrapperError::Execution {
                program,
                status,
                stdout,
                stderr,
            } => {
                assert_eq!(program, "ffmpeg");
                assert_eq!(status, 1);
                assert_eq!(stdout, "out");
                assert_eq!(stderr, "No such file or directory");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
