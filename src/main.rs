use clap::{Args, Parser, Subcommand};
use ffmpeg_wrapper::commands::{
    self, Background, ConcatOptions, LoudnormParams, NormalizeOptions, ToolCommand,
};
use ffmpeg_wrapper::prelude::Result;
use ffmpeg_wrapper::{Conf, FfmpegClient, WrapperError};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "ffmpeg_wrapper=info";

#[derive(Debug, Parser)]
#[command(name = "ffmpeg-wrapper", version, about)]
struct Cli {
    /// Config file read after ./settings.toml and ~/.config/ffmpeg-wrapper/config.toml;
    /// unlike those it must exist
    #[arg(long, global = true, env = "FFMPEG_WRAPPER_CONFIG")]
    config: Option<String>,

    /// Print the command instead of running it
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Args)]
struct LoudnormArgs {
    /// Integrated loudness target (LUFS)
    #[arg(long, default_value_t = -24.0, allow_negative_numbers = true)]
    integrated: f64,
    /// True peak ceiling (dBTP)
    #[arg(long, default_value_t = -2.0, allow_negative_numbers = true)]
    true_peak: f64,
    /// Loudness range target (LU)
    #[arg(long, default_value_t = 7.0)]
    lra: f64,
}

impl From<&LoudnormArgs> for LoudnormParams {
    fn from(args: &LoudnormArgs) -> Self {
        LoudnormParams {
            integrated: args.integrated,
            true_peak: args.true_peak,
            loudness_range: args.lra,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Concatenate parts, optionally normalizing and mixing in a background
    Concat {
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, default_value_t = 2)]
        channels: u32,
        #[arg(long, default_value_t = 48_000)]
        sample_rate: u32,
        #[arg(long, default_value_t = 1.0)]
        volume: f64,
        /// Looping track mixed under the book
        #[arg(long)]
        background: Option<PathBuf>,
        #[arg(long, default_value_t = 1.0)]
        background_volume: f64,
        /// Run loudnorm on the concatenated stream
        #[arg(long)]
        loudnorm: bool,
        #[command(flatten)]
        targets: LoudnormArgs,
        /// Pad around loudnorm for very short books
        #[arg(long)]
        short: bool,
        /// Mix the background with `normalize=0`
        #[arg(long)]
        no_normalize_mix: bool,
        #[arg(required = true)]
        parts: Vec<PathBuf>,
    },
    /// Concatenate parts without a filter graph
    SimpleConcat {
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, default_value_t = 2)]
        channels: u32,
        #[arg(required = true)]
        parts: Vec<PathBuf>,
    },
    /// Transcode a file to the format of the output extension
    Convert {
        input: PathBuf,
        output: PathBuf,
        /// Target bit rate in kbps
        #[arg(long, default_value_t = 256)]
        bit_rate: u32,
    },
    /// Print the duration of a file in seconds
    Duration { file: PathBuf },
    /// Write a mono 48 kHz silent file
    Silence { seconds: f64, output: PathBuf },
    /// Single-pass loudness normalization
    Normalize {
        input: PathBuf,
        output: PathBuf,
        #[command(flatten)]
        targets: LoudnormArgs,
        #[arg(long, default_value_t = 48_000)]
        sample_rate: u32,
    },
    /// Print mean and max volume of a file
    Volume { file: PathBuf },
}

impl Commands {
    fn build(&self) -> Result<ToolCommand> {
        match self {
            Commands::Concat {
                output,
                channels,
                sample_rate,
                volume,
                background,
                background_volume,
                loudnorm,
                targets,
                short,
                no_normalize_mix,
                parts,
            } => {
                let mut options = ConcatOptions::new(parts.iter().cloned(), output.clone());
                options.channels = *channels;
                options.sample_rate = *sample_rate;
                options.volume = *volume;
                options.background = background.as_ref().map(|path| Background {
                    path: path.clone(),
                    volume: *background_volume,
                });
                options.loudnorm = loudnorm.then(|| LoudnormParams::from(targets));
                options.pad_short_input = *short;
                options.normalize_mix = !no_normalize_mix;
                commands::concat_command(&options)
            }
            Commands::SimpleConcat {
                output,
                channels,
                parts,
            } => commands::simple_concat_command(parts, output, *channels),
            Commands::Convert {
                input,
                output,
                bit_rate,
            } => commands::convert_command(input, output, *bit_rate),
            Commands::Duration { file } => commands::duration_command(file),
            Commands::Silence { seconds, output } => commands::silence_command(*seconds, output),
            Commands::Normalize {
                input,
                output,
                targets,
                sample_rate,
            } => commands::normalize_command(&NormalizeOptions {
                input: input.clone(),
                output: output.clone(),
                loudnorm: targets.into(),
                sample_rate: *sample_rate,
            }),
            Commands::Volume { file } => commands::volume_detect_command(file),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    run(Cli::parse()).await
}

async fn run(cli: Cli) -> Result<()> {
    let mut builder = Conf::builder()
        .file("./settings.toml")
        .file("~/.config/ffmpeg-wrapper/config.toml");
    if let Some(path) = &cli.config {
        builder = builder.required_file(path);
    }
    let conf = builder
        .env()
        .load()
        .map_err(WrapperError::LoadConfig)?;

    let command = cli.command.build()?;
    if cli.dry_run {
        println!("{}", command);
        return Ok(());
    }
    let client = FfmpegClient::new(conf);

    let start_time = Instant::now();
    match &cli.command {
        Commands::Duration { file } => println!("{}", client.duration(file).await?),
        Commands::Volume { file } => {
            let metrics = client.detect_volume(file).await?;
            println!("mean_volume: {}", format_db(metrics.root_mean_square));
            println!("max_volume: {}", format_db(metrics.max_volume));
        }
        _ => {
            client.run(&command).await?;
        }
    }
    info!("Done. Whole operation took: {:?}", start_time.elapsed());
    Ok(())
}

fn format_db(value: Option<f64>) -> String {
    match value {
        Some(value) => format!("{:.1} dB", value),
        None => "n/a".to_string(),
    }
}
