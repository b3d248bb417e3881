//! Builders for the ffmpeg/ffprobe argument lists.
//!
//! Every builder is a pure function: it turns typed parameters into a
//! [`ToolCommand`] and never touches the filesystem or spawns anything.
//! Running the command is the job of [`crate::client::FfmpegClient`].

use crate::errors::WrapperError;
use crate::prelude::*;
use std::fmt;
use std::path::{Path, PathBuf};

/// Label of the main (concatenated) stream inside the filter graph.
pub const BOOK_LABEL: &str = "[book]";
/// Sample rate used for generated silence.
pub const SILENCE_SAMPLE_RATE: u32 = 48_000;
/// Delay put in front of short inputs so loudnorm has enough signal to measure.
const SHORT_INPUT_PAD_SECONDS: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Ffmpeg,
    Ffprobe,
}

impl Tool {
    pub fn name(&self) -> &'static str {
        match self {
            Tool::Ffmpeg => "ffmpeg",
            Tool::Ffprobe => "ffprobe",
        }
    }
}

/// A fully built invocation: which tool to run and the exact argument vector.
///
/// The `Display` form joins the tool name and arguments with single spaces.
/// It is meant for logs and dry runs only; the arguments are always passed to
/// the process as a vector and never go through a shell.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCommand {
    pub tool: Tool,
    pub args: Vec<String>,
}

impl ToolCommand {
    pub fn new(tool: Tool) -> Self {
        Self { tool, args: vec![] }
    }

    /// A command that only reports errors on its log output.
    fn quiet(tool: Tool) -> Self {
        let mut command = Self::new(tool);
        command.push("-hide_banner").push("-loglevel").push("error");
        command
    }

    pub fn push(&mut self, arg: impl Into<String>) -> &mut Self {
        self.args.push(arg.into());
        self
    }

    /// Number of `-i` flags, i.e. how many inputs ffmpeg will open.
    pub fn input_count(&self) -> usize {
        self.args.iter().filter(|arg| *arg == "-i").count()
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tool.name())?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Targets for the `loudnorm` filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoudnormParams {
    /// Integrated loudness target (I), in LUFS.
    pub integrated: f64,
    /// Maximum true peak (TP), in dBTP.
    pub true_peak: f64,
    /// Loudness range target (LRA), in LU.
    pub loudness_range: f64,
}

impl Default for LoudnormParams {
    fn default() -> Self {
        Self {
            integrated: -24.0,
            true_peak: -2.0,
            loudness_range: 7.0,
        }
    }
}

impl LoudnormParams {
    /// `loudnorm=I=..:TP=..:LRA=..` with every value rendered to one decimal
    /// place, so whole numbers come out as `-18.0` rather than `-18`.
    pub fn filter(&self) -> String {
        format!(
            "loudnorm=I={:.1}:TP={:.1}:LRA={:.1}",
            self.integrated, self.true_peak, self.loudness_range
        )
    }
}

/// Looping background track mixed under the concatenated book.
#[derive(Debug, Clone, PartialEq)]
pub struct Background {
    pub path: PathBuf,
    pub volume: f64,
}

impl Background {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            volume: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConcatOptions {
    /// Parts in concatenation order.
    pub parts: Vec<PathBuf>,
    pub output: PathBuf,
    pub channels: u32,
    pub sample_rate: u32,
    /// Volume applied to the concatenated stream.
    pub volume: f64,
    pub background: Option<Background>,
    pub loudnorm: Option<LoudnormParams>,
    /// Pad the stream around loudnorm for inputs shorter than its window.
    /// Only has an effect together with `loudnorm`.
    pub pad_short_input: bool,
    /// Passed to `amix` as `normalize=1`/`normalize=0` when mixing a background.
    pub normalize_mix: bool,
}

impl ConcatOptions {
    pub fn new<P: Into<PathBuf>>(
        parts: impl IntoIterator<Item = P>,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            parts: parts.into_iter().map(Into::into).collect(),
            output: output.into(),
            channels: 2,
            sample_rate: 48_000,
            volume: 1.0,
            background: None,
            loudnorm: None,
            pad_short_input: false,
            normalize_mix: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    pub loudnorm: LoudnormParams,
    pub sample_rate: u32,
}

fn path_str(path: &Path) -> Result<&str> {
    path.to_str()
        .ok_or_else(|| WrapperError::PathToString(path.to_path_buf()))
}

fn push_inputs(command: &mut ToolCommand, parts: &[PathBuf]) -> Result<()> {
    for part in parts {
        command.push("-i").push(path_str(part)?);
    }
    Ok(())
}

/// Builds the `-filter_complex` graph for [`concat_command`].
///
/// The main chain is `concat -> volume -> [loudnorm]` and ends in
/// [`BOOK_LABEL`]. With a background the graph continues with a looping
/// `amovie` source that is mixed under the book and cut to its length.
pub fn concat_filter_graph(options: &ConcatOptions) -> Result<String> {
    let mut graph = format!(
        "concat=n={}:v=0:a=1,volume={:.1}",
        options.parts.len(),
        options.volume
    );
    if let Some(loudnorm) = &options.loudnorm {
        if options.pad_short_input {
            graph.push_str(&format!(",adelay={}s", SHORT_INPUT_PAD_SECONDS));
        }
        graph.push(',');
        graph.push_str(&loudnorm.filter());
        if options.pad_short_input {
            graph.push_str(&format!(",atrim=start={}", SHORT_INPUT_PAD_SECONDS));
        }
    }
    graph.push_str(BOOK_LABEL);

    if let Some(background) = &options.background {
        // TODO: escape filtergraph metacharacters (':', ',', ';', '[') in background paths
        graph.push_str(&format!(
            ";amovie={}:loop=0,asetpts=N/SR/TB,volume={:.1}[background];\
             {}[background]amix=duration=shortest:normalize={}",
            path_str(&background.path)?,
            background.volume,
            BOOK_LABEL,
            u8::from(options.normalize_mix)
        ));
    }
    trace!("concat filter graph: {}", graph);
    Ok(graph)
}

/// Concatenates the parts through a filter graph, optionally normalizing the
/// loudness and mixing a background track under the result.
///
/// The part list is not validated; an empty list produces `concat=n=0`.
pub fn concat_command(options: &ConcatOptions) -> Result<ToolCommand> {
    let graph = concat_filter_graph(options)?;

    let mut command = ToolCommand::quiet(Tool::Ffmpeg);
    push_inputs(&mut command, &options.parts)?;
    command.push("-filter_complex").push(graph);
    if options.background.is_none() {
        command.push("-map").push(BOOK_LABEL);
    }
    command
        .push("-ac")
        .push(options.channels.to_string())
        .push("-ar")
        .push(options.sample_rate.to_string())
        .push("-y")
        .push(path_str(&options.output)?);
    Ok(command)
}

/// Plain multi-input invocation without any filter graph.
pub fn simple_concat_command(
    parts: &[PathBuf],
    output: &Path,
    channels: u32,
) -> Result<ToolCommand> {
    let mut command = ToolCommand::quiet(Tool::Ffmpeg);
    push_inputs(&mut command, parts)?;
    command
        .push("-ac")
        .push(channels.to_string())
        .push("-y")
        .push(path_str(output)?);
    Ok(command)
}

/// Transcodes `input` into `output`; the container/codec follow the output extension.
pub fn convert_command(input: &Path, output: &Path, bit_rate_kbps: u32) -> Result<ToolCommand> {
    let mut command = ToolCommand::quiet(Tool::Ffmpeg);
    command
        .push("-i")
        .push(path_str(input)?)
        .push("-ab")
        .push(format!("{}k", bit_rate_kbps))
        .push("-y")
        .push(path_str(output)?);
    Ok(command)
}

/// Asks ffprobe for nothing but `format=duration`, printed as a bare CSV value.
pub fn duration_command(path: &Path) -> Result<ToolCommand> {
    let mut command = ToolCommand::quiet(Tool::Ffprobe);
    command
        .push("-i")
        .push(path_str(path)?)
        .push("-show_entries")
        .push("format=duration")
        .push("-v")
        .push("quiet")
        .push("-of")
        .push("csv=p=0");
    Ok(command)
}

pub fn silence_command(seconds: f64, output: &Path) -> Result<ToolCommand> {
    let mut command = ToolCommand::quiet(Tool::Ffmpeg);
    command
        .push("-f")
        .push("lavfi")
        .push("-i")
        .push("anullsrc")
        .push("-t")
        .push(format!("{:.3}", seconds))
        .push("-ar")
        .push(SILENCE_SAMPLE_RATE.to_string())
        .push("-ac")
        .push("1")
        .push("-y")
        .push(path_str(output)?);
    Ok(command)
}

/// Single-pass loudnorm. Without `-y`, an existing output makes ffmpeg exit
/// with an error instead of being overwritten.
pub fn normalize_command(options: &NormalizeOptions) -> Result<ToolCommand> {
    let mut command = ToolCommand::quiet(Tool::Ffmpeg);
    command
        .push("-i")
        .push(path_str(&options.input)?)
        .push("-af")
        .push(options.loudnorm.filter())
        .push("-ar")
        .push(options.sample_rate.to_string())
        .push(path_str(&options.output)?);
    Ok(command)
}

/// Runs the `volumedetect` filter and throws the decoded audio away.
///
/// The log level stays at ffmpeg's default because the measurements are
/// printed at info level.
pub fn volume_detect_command(path: &Path) -> Result<ToolCommand> {
    let mut command = ToolCommand::new(Tool::Ffmpeg);
    command
        .push("-hide_banner")
        .push("-nostats")
        .push("-i")
        .push(path_str(path)?)
        .push("-af")
        .push("volumedetect")
        .push("-vn")
        .push("-sn")
        .push("-dn")
        .push("-f")
        .push("null")
        .push("-");
    Ok(command)
}
