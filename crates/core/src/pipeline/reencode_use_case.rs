use std::fmt;
use std::str::FromStr;

use crate::shared::constants::DEFAULT_ITERATIONS;
use crate::shared::frame::VideoFrame;
use crate::video::domain::frame_encoder::{EncodeSummary, FrameEncoder, WrittenPacket};
use crate::video::domain::frame_source::FrameSource;

use super::pipeline_logger::PipelineLogger;
use super::test_pattern::paint_luma_pattern;

/// What the driver does when the source runs out of frames before the
/// requested number of iterations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExhaustedPolicy {
    /// Start the source over and keep going.
    #[default]
    Rewind,
    /// Stop early and flush what has been encoded so far.
    Stop,
    /// Treat running out of input as an error.
    Fail,
}

impl FromStr for ExhaustedPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rewind" => Ok(Self::Rewind),
            "stop" => Ok(Self::Stop),
            "fail" => Ok(Self::Fail),
            other => Err(format!(
                "On-exhausted policy must be one of: rewind, stop, fail, got '{other}'"
            )),
        }
    }
}

impl fmt::Display for ExhaustedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Rewind => "rewind",
            Self::Stop => "stop",
            Self::Fail => "fail",
        };
        f.write_str(name)
    }
}

/// Configuration for a re-encode run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReencodeConfig {
    pub iterations: usize,
    pub on_exhausted: ExhaustedPolicy,
}

impl Default for ReencodeConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            on_exhausted: ExhaustedPolicy::default(),
        }
    }
}

/// Outcome of a completed run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReencodeReport {
    /// Frames pushed through the encoder.
    pub iterations: usize,
    pub rewinds: usize,
    pub encode: EncodeSummary,
}

/// Orchestrates decode → stamp pattern → encode for a fixed number of
/// iterations, then flushes and finishes the encoder.
///
/// Frame `i` gets the scrolling luma pattern for iteration `i` and a
/// presentation timestamp of exactly `i`, regardless of what the source
/// decoded.
pub struct ReencodeUseCase {
    source: Box<dyn FrameSource>,
    encoder: Box<dyn FrameEncoder>,
    logger: Box<dyn PipelineLogger>,
    config: ReencodeConfig,
}

impl ReencodeUseCase {
    pub fn new(
        source: Box<dyn FrameSource>,
        encoder: Box<dyn FrameEncoder>,
        logger: Box<dyn PipelineLogger>,
        config: ReencodeConfig,
    ) -> Self {
        Self {
            source,
            encoder,
            logger,
            config,
        }
    }

    pub fn execute(&mut self) -> Result<ReencodeReport, Box<dyn std::error::Error>> {
        let mut rewinds = 0;
        let mut iterations = 0;

        for i in 0..self.config.iterations {
            let mut frame = match self.source.next_frame()? {
                Some(frame) => frame,
                None => match self.config.on_exhausted {
                    ExhaustedPolicy::Rewind => {
                        rewinds += 1;
                        self.rewind_and_read()?
                    }
                    ExhaustedPolicy::Stop => {
                        self.logger
                            .info(&format!("Input exhausted after {i} frames, stopping"));
                        break;
                    }
                    ExhaustedPolicy::Fail => {
                        return Err(format!("Input exhausted after {i} frames").into());
                    }
                },
            };

            paint_luma_pattern(&mut frame, i);
            frame.set_pts(i as i64);

            self.logger.frame_sent(frame.pts());
            let packets = self.encoder.encode(Some(&frame))?;
            self.report(&packets);
            iterations += 1;
        }

        let packets = self.encoder.encode(None)?;
        self.report(&packets);

        let encode = self.encoder.finish()?;
        self.logger.summary(&encode);

        Ok(ReencodeReport {
            iterations,
            rewinds,
            encode,
        })
    }

    fn rewind_and_read(&mut self) -> Result<VideoFrame, Box<dyn std::error::Error>> {
        log::debug!("Input exhausted, rewinding");
        self.source.rewind()?;
        self.source
            .next_frame()?
            .ok_or_else(|| "Input has no decodable video frames".into())
    }

    fn report(&mut self, packets: &[WrittenPacket]) {
        for packet in packets {
            self.logger.packet_written(packet);
        }
    }
}
