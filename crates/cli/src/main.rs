use std::path::PathBuf;
use std::process;

use clap::Parser;

use reencode_core::pipeline::pipeline_logger::{
    NullPipelineLogger, PipelineLogger, StdoutPipelineLogger,
};
use reencode_core::pipeline::reencode_use_case::{ExhaustedPolicy, ReencodeConfig, ReencodeUseCase};
use reencode_core::shared::constants::{
    DEFAULT_BIT_RATE, DEFAULT_CODEC_NAME, DEFAULT_INPUT_PATH, DEFAULT_ITERATIONS,
    DEFAULT_OUTPUT_PATH,
};
use reencode_core::video::domain::frame_source::FrameSource;
use reencode_core::video::infrastructure::ffmpeg_encoder::{EncoderSettings, FfmpegEncoder};
use reencode_core::video::infrastructure::ffmpeg_reader::FfmpegReader;
use reencode_core::video::infrastructure::synthetic_source::{FrameSize, SyntheticSource};

/// Decode a video, stamp a moving test pattern on every frame and
/// re-encode the result as a raw elementary stream.
#[derive(Parser)]
#[command(name = "reencode")]
struct Cli {
    /// Input video file.
    #[arg(long, default_value = DEFAULT_INPUT_PATH)]
    input: PathBuf,

    /// Output file (raw bitstream, no container).
    #[arg(long, default_value = DEFAULT_OUTPUT_PATH)]
    output: PathBuf,

    /// Encoder name as known to libavcodec.
    #[arg(long, default_value = DEFAULT_CODEC_NAME)]
    codec: String,

    /// Number of frames to encode.
    #[arg(long, default_value_t = DEFAULT_ITERATIONS)]
    iterations: usize,

    /// Target bit rate in bits per second.
    #[arg(long, default_value_t = DEFAULT_BIT_RATE)]
    bit_rate: usize,

    /// What to do when the input runs out: rewind, stop or fail.
    #[arg(long, default_value = "rewind")]
    on_exhausted: String,

    /// Generate WIDTHxHEIGHT test pictures instead of reading --input.
    #[arg(long)]
    synthetic: Option<String>,

    /// Suppress the per-frame and per-packet lines.
    #[arg(long)]
    quiet: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let on_exhausted: ExhaustedPolicy = cli.on_exhausted.parse()?;
    let source = open_source(&cli)?;
    let metadata = source.metadata().clone();

    let settings = EncoderSettings::new(&cli.codec, metadata.width, metadata.height)
        .with_bit_rate(cli.bit_rate);
    let encoder = FfmpegEncoder::create(&cli.output, settings)?;

    let logger: Box<dyn PipelineLogger> = if cli.quiet {
        Box::new(NullPipelineLogger)
    } else {
        Box::new(StdoutPipelineLogger::new())
    };

    let mut use_case = ReencodeUseCase::new(
        source,
        Box::new(encoder),
        logger,
        ReencodeConfig {
            iterations: cli.iterations,
            on_exhausted,
        },
    );
    let report = use_case.execute()?;

    if report.rewinds > 0 {
        log::info!("Input was restarted {} times", report.rewinds);
    }
    log::info!(
        "Wrote {} bytes to {}",
        report.encode.total_bytes(),
        cli.output.display()
    );
    Ok(())
}

fn open_source(cli: &Cli) -> Result<Box<dyn FrameSource>, Box<dyn std::error::Error>> {
    match &cli.synthetic {
        Some(size) => {
            let size: FrameSize = size.parse()?;
            log::info!("Generating {}x{} test pictures", size.width, size.height);
            Ok(Box::new(SyntheticSource::new(size)))
        }
        None => {
            let reader = FfmpegReader::open(&cli.input)?;
            let meta = reader.metadata();
            log::info!(
                "Decoding {} ({} {}x{})",
                cli.input.display(),
                meta.codec,
                meta.width,
                meta.height
            );
            Ok(Box::new(reader))
        }
    }
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if cli.synthetic.is_none() && !cli.input.exists() {
        return Err(format!("Input file not found: {}", cli.input.display()).into());
    }
    if cli.iterations == 0 {
        return Err("Iterations must be at least 1".into());
    }
    if cli.bit_rate == 0 {
        return Err("Bit rate must be positive".into());
    }
    if cli.codec.trim().is_empty() {
        return Err("Codec name must not be empty".into());
    }
    cli.on_exhausted.parse::<ExhaustedPolicy>()?;
    Ok(())
}
