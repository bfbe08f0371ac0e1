use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use ffmpeg_next::codec::Id;
use ffmpeg_next::util::frame::video::Video;
use thiserror::Error;

use crate::shared::constants::{
    DEFAULT_BIT_RATE, FRAME_RATE, GOP_SIZE, H264_PRESET, MAX_B_FRAMES, MPEG_SEQUENCE_END_CODE,
};
use crate::shared::frame::{VideoFrame, CB, CR, LUMA};
use crate::video::domain::frame_encoder::{EncodeSummary, FrameEncoder, WrittenPacket};

#[derive(Error, Debug)]
pub enum EncoderError {
    #[error("codec '{0}' not found")]
    CodecNotFound(String),
    #[error("could not open codec '{codec}': {source}")]
    Open {
        codec: String,
        #[source]
        source: ffmpeg_next::Error,
    },
    #[error("could not open {}: {source}", path.display())]
    CreateOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("frame is {actual_width}x{actual_height}, encoder expects {width}x{height}")]
    FrameSize {
        width: u32,
        height: u32,
        actual_width: u32,
        actual_height: u32,
    },
    #[error("error sending a frame for encoding: {0}")]
    Send(#[source] ffmpeg_next::Error),
    #[error("error during encoding: {0}")]
    Receive(#[source] ffmpeg_next::Error),
    #[error("failed to write encoded data: {0}")]
    Write(#[source] std::io::Error),
    #[error("cannot {action} while the encoder is {state:?}")]
    InvalidState {
        action: &'static str,
        state: EncoderState,
    },
}

/// Lifecycle of an [`FfmpegEncoder`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncoderState {
    /// Accepting frames.
    Ready,
    /// End of stream signalled; only buffered packets remain.
    Draining,
    /// Trailer written and sink flushed.
    Closed,
}

/// Encoder parameters. Everything but the codec name and picture size has
/// a fixed default.
#[derive(Clone, Debug, PartialEq)]
pub struct EncoderSettings {
    pub codec_name: String,
    pub width: u32,
    pub height: u32,
    pub bit_rate: usize,
    pub frame_rate: i32,
    pub gop_size: u32,
    pub max_b_frames: usize,
}

impl EncoderSettings {
    pub fn new(codec_name: &str, width: u32, height: u32) -> Self {
        Self {
            codec_name: codec_name.to_string(),
            width,
            height,
            bit_rate: DEFAULT_BIT_RATE,
            frame_rate: FRAME_RATE,
            gop_size: GOP_SIZE,
            max_b_frames: MAX_B_FRAMES,
        }
    }

    pub fn with_bit_rate(mut self, bit_rate: usize) -> Self {
        self.bit_rate = bit_rate;
        self
    }
}

/// Encodes frames with a named libavcodec encoder and writes the raw
/// bitstream to `W`, with no container around it.
///
/// Packets are written as soon as the encoder releases them. For MPEG-1/2
/// video the sequence end code is appended on [`FrameEncoder::finish`] so
/// the output is a complete elementary stream.
pub struct FfmpegEncoder<W: Write> {
    encoder: ffmpeg_next::codec::encoder::video::Encoder,
    codec_id: Id,
    packet: ffmpeg_next::Packet,
    sink: W,
    settings: EncoderSettings,
    state: EncoderState,
    summary: EncodeSummary,
}

impl FfmpegEncoder<BufWriter<File>> {
    /// Opens the encoder, then creates (or truncates) the output file.
    pub fn create(path: &Path, settings: EncoderSettings) -> Result<Self, EncoderError> {
        // Codec problems are reported before the output file is touched.
        let (encoder, codec_id) = open_encoder(&settings)?;
        let file = File::create(path).map_err(|source| EncoderError::CreateOutput {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_parts(
            encoder,
            codec_id,
            BufWriter::new(file),
            settings,
        ))
    }
}

impl<W: Write> FfmpegEncoder<W> {
    pub fn new(sink: W, settings: EncoderSettings) -> Result<Self, EncoderError> {
        let (encoder, codec_id) = open_encoder(&settings)?;
        Ok(Self::from_parts(encoder, codec_id, sink, settings))
    }

    fn from_parts(
        encoder: ffmpeg_next::codec::encoder::video::Encoder,
        codec_id: Id,
        sink: W,
        settings: EncoderSettings,
    ) -> Self {
        Self {
            encoder,
            codec_id,
            packet: ffmpeg_next::Packet::empty(),
            sink,
            settings,
            state: EncoderState::Ready,
            summary: EncodeSummary::default(),
        }
    }

    pub fn state(&self) -> EncoderState {
        self.state
    }

    pub fn summary(&self) -> EncodeSummary {
        self.summary
    }

    /// Whether [`FrameEncoder::finish`] appends the MPEG sequence end code.
    pub fn writes_sequence_end_code(&self) -> bool {
        needs_sequence_end_code(self.codec_id)
    }

    /// Consumes the encoder and hands back the sink.
    pub fn into_sink(self) -> W {
        self.sink
    }

    fn send(&mut self, frame: &VideoFrame) -> Result<(), EncoderError> {
        if frame.width() != self.settings.width || frame.height() != self.settings.height {
            return Err(EncoderError::FrameSize {
                width: self.settings.width,
                height: self.settings.height,
                actual_width: frame.width(),
                actual_height: frame.height(),
            });
        }

        let mut yuv = Video::new(
            ffmpeg_next::format::Pixel::YUV420P,
            self.settings.width,
            self.settings.height,
        );
        fill_planes(frame, &mut yuv);
        yuv.set_pts(Some(frame.pts()));

        self.encoder.send_frame(&yuv).map_err(EncoderError::Send)?;
        self.summary.frames_sent += 1;
        Ok(())
    }

    /// Writes out every packet the encoder currently has. Stops on
    /// "try again" or end of stream; neither is an error.
    fn drain(&mut self) -> Result<Vec<WrittenPacket>, EncoderError> {
        let mut written = Vec::new();
        loop {
            match self.encoder.receive_packet(&mut self.packet) {
                Ok(()) => {}
                Err(ffmpeg_next::Error::Other { errno })
                    if errno == ffmpeg_next::util::error::EAGAIN =>
                {
                    break;
                }
                Err(ffmpeg_next::Error::Eof) => break,
                Err(source) => return Err(EncoderError::Receive(source)),
            }

            let data = self.packet.data().unwrap_or_default();
            self.sink.write_all(data).map_err(EncoderError::Write)?;
            let packet = WrittenPacket {
                pts: self.packet.pts(),
                size: data.len(),
            };

            // Release the payload before asking for the next one.
            self.packet = ffmpeg_next::Packet::empty();

            self.summary.packets_written += 1;
            self.summary.payload_bytes += packet.size;
            written.push(packet);
        }
        Ok(written)
    }

    fn flush(&mut self) -> Result<Vec<WrittenPacket>, EncoderError> {
        if self.state == EncoderState::Ready {
            self.encoder.send_eof().map_err(EncoderError::Send)?;
            self.state = EncoderState::Draining;
        }
        self.drain()
    }
}

impl<W: Write> FrameEncoder for FfmpegEncoder<W> {
    fn encode(
        &mut self,
        frame: Option<&VideoFrame>,
    ) -> Result<Vec<WrittenPacket>, Box<dyn std::error::Error>> {
        match (frame, self.state) {
            (Some(frame), EncoderState::Ready) => {
                self.send(frame)?;
                Ok(self.drain()?)
            }
            (None, EncoderState::Ready | EncoderState::Draining) => Ok(self.flush()?),
            (_, state) => Err(EncoderError::InvalidState {
                action: if frame.is_some() {
                    "encode a frame"
                } else {
                    "flush"
                },
                state,
            }
            .into()),
        }
    }

    fn finish(&mut self) -> Result<EncodeSummary, Box<dyn std::error::Error>> {
        if self.state == EncoderState::Closed {
            return Ok(self.summary);
        }

        let leftover = self.flush()?;
        if !leftover.is_empty() {
            log::debug!("Flushed {} packets while finishing", leftover.len());
        }

        if needs_sequence_end_code(self.codec_id) {
            self.sink
                .write_all(&MPEG_SEQUENCE_END_CODE)
                .map_err(EncoderError::Write)?;
            self.summary.trailer_bytes = MPEG_SEQUENCE_END_CODE.len();
        }
        self.sink.flush().map_err(EncoderError::Write)?;
        self.state = EncoderState::Closed;

        Ok(self.summary)
    }
}

/// Finds the named encoder, applies `settings` and opens it.
fn open_encoder(
    settings: &EncoderSettings,
) -> Result<(ffmpeg_next::codec::encoder::video::Encoder, Id), EncoderError> {
    let open_error = |source| EncoderError::Open {
        codec: settings.codec_name.clone(),
        source,
    };

    ffmpeg_next::init().map_err(open_error)?;

    let codec = ffmpeg_next::encoder::find_by_name(&settings.codec_name)
        .ok_or_else(|| EncoderError::CodecNotFound(settings.codec_name.clone()))?;

    let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
        .encoder()
        .video()
        .map_err(open_error)?;

    encoder_ctx.set_bit_rate(settings.bit_rate);
    encoder_ctx.set_width(settings.width);
    encoder_ctx.set_height(settings.height);
    encoder_ctx.set_time_base(ffmpeg_next::Rational(1, settings.frame_rate));
    encoder_ctx.set_frame_rate(Some(ffmpeg_next::Rational(settings.frame_rate, 1)));
    encoder_ctx.set_gop(settings.gop_size);
    encoder_ctx.set_max_b_frames(settings.max_b_frames);
    encoder_ctx.set_format(ffmpeg_next::format::Pixel::YUV420P);

    let mut options = ffmpeg_next::Dictionary::new();
    if codec.id() == Id::H264 {
        options.set("preset", H264_PRESET);
    }

    let encoder = encoder_ctx.open_with(options).map_err(open_error)?;

    log::debug!(
        "Opened encoder {} ({}x{}, {} bit/s, gop {}, {} b-frames)",
        settings.codec_name,
        settings.width,
        settings.height,
        settings.bit_rate,
        settings.gop_size,
        settings.max_b_frames
    );

    Ok((encoder, codec.id()))
}

/// MPEG-1 and MPEG-2 elementary streams end with an explicit sequence end
/// code; every other codec's raw bitstream is written as is.
fn needs_sequence_end_code(codec_id: Id) -> bool {
    matches!(codec_id, Id::MPEG1VIDEO | Id::MPEG2VIDEO)
}

/// Copies a packed [`VideoFrame`] into an ffmpeg frame, respecting stride.
fn fill_planes(frame: &VideoFrame, yuv: &mut Video) {
    for plane in [LUMA, CB, CR] {
        let cols = frame.plane_width(plane);
        let rows = frame.plane_height(plane);
        let stride = yuv.stride(plane);
        let src = frame.plane(plane);
        let dst = yuv.data_mut(plane);
        for row in 0..rows {
            dst[row * stride..row * stride + cols]
                .copy_from_slice(&src[row * cols..(row + 1) * cols]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn frame(index: i64, w: u32, h: u32) -> VideoFrame {
        let mut frame = VideoFrame::blank(w, h);
        frame
            .plane_mut(LUMA)
            .iter_mut()
            .enumerate()
            .for_each(|(i, b)| *b = (i as i64 + index * 3) as u8);
        frame.set_pts(index);
        frame
    }

    fn encoder(codec: &str) -> FfmpegEncoder<Vec<u8>> {
        FfmpegEncoder::new(Vec::new(), EncoderSettings::new(codec, 160, 120)).unwrap()
    }

    fn encode_all(encoder: &mut FfmpegEncoder<Vec<u8>>, count: i64) -> Vec<WrittenPacket> {
        let mut packets = Vec::new();
        for i in 0..count {
            packets.extend(encoder.encode(Some(&frame(i, 160, 120))).unwrap());
        }
        packets.extend(encoder.encode(None).unwrap());
        packets
    }

    #[test]
    fn test_settings_defaults() {
        let settings = EncoderSettings::new("mpeg1video", 320, 240);
        assert_eq!(settings.bit_rate, 400_000);
        assert_eq!(settings.frame_rate, 25);
        assert_eq!(settings.gop_size, 10);
        assert_eq!(settings.max_b_frames, 1);
        assert_eq!(settings.with_bit_rate(1_000).bit_rate, 1_000);
    }

    #[test]
    fn test_unknown_codec_is_rejected() {
        let settings = EncoderSettings::new("no-such-codec", 160, 120);
        let result = FfmpegEncoder::new(Vec::new(), settings);
        assert!(matches!(
            result,
            Err(EncoderError::CodecNotFound(name)) if name == "no-such-codec"
        ));
    }

    #[rstest]
    #[case::mpeg1("mpeg1video", true)]
    #[case::mpeg2("mpeg2video", true)]
    #[case::mpeg4("mpeg4", false)]
    fn test_sequence_end_code_only_for_mpeg12(#[case] codec: &str, #[case] expected: bool) {
        assert_eq!(encoder(codec).writes_sequence_end_code(), expected);
    }

    #[rstest]
    #[case::mpeg1("mpeg1video", 4)]
    #[case::mpeg2("mpeg2video", 4)]
    #[case::mpeg4("mpeg4", 0)]
    fn test_bytes_written_equal_packets_plus_trailer(
        #[case] codec: &str,
        #[case] trailer: usize,
    ) {
        let mut encoder = encoder(codec);
        let packets = encode_all(&mut encoder, 12);
        let summary = encoder.finish().unwrap();
        let output = encoder.into_sink();

        let payload: usize = packets.iter().map(|p| p.size).sum();
        assert_eq!(summary.payload_bytes, payload);
        assert_eq!(summary.trailer_bytes, trailer);
        assert_eq!(output.len(), payload + trailer);
        assert_eq!(summary.total_bytes(), output.len());
        if trailer > 0 {
            assert_eq!(output[output.len() - 4..], MPEG_SEQUENCE_END_CODE);
        }
    }

    #[test]
    fn test_every_frame_produces_a_packet_after_flush() {
        let mut encoder = encoder("mpeg1video");
        let packets = encode_all(&mut encoder, 12);
        assert_eq!(packets.len(), 12);
        assert_eq!(encoder.summary().frames_sent, 12);
        assert_eq!(encoder.summary().packets_written, 12);
    }

    #[test]
    fn test_b_frames_delay_output() {
        let mut encoder = encoder("mpeg1video");
        let first = encoder.encode(Some(&frame(0, 160, 120))).unwrap();
        let second = encoder.encode(Some(&frame(1, 160, 120))).unwrap();
        let third = encoder.encode(Some(&frame(2, 160, 120))).unwrap();
        // One B-frame means at least one frame is held back at any time.
        assert!(first.len() + second.len() + third.len() < 3);
        let flushed = encoder.encode(None).unwrap();
        assert_eq!(first.len() + second.len() + third.len() + flushed.len(), 3);
    }

    #[test]
    fn test_flush_moves_to_draining_and_repeats_cleanly() {
        let mut encoder = encoder("mpeg1video");
        encoder.encode(Some(&frame(0, 160, 120))).unwrap();
        assert_eq!(encoder.state(), EncoderState::Ready);

        encoder.encode(None).unwrap();
        assert_eq!(encoder.state(), EncoderState::Draining);

        // A second flush finds nothing left and is not an error.
        assert!(encoder.encode(None).unwrap().is_empty());
    }

    #[test]
    fn test_frame_after_flush_is_rejected() {
        let mut encoder = encoder("mpeg1video");
        encoder.encode(None).unwrap();
        let err = encoder.encode(Some(&frame(0, 160, 120))).unwrap_err();
        assert!(err.to_string().contains("Draining"));
    }

    #[test]
    fn test_finish_flushes_and_closes() {
        let mut encoder = encoder("mpeg1video");
        for i in 0..5 {
            encoder.encode(Some(&frame(i, 160, 120))).unwrap();
        }
        let summary = encoder.finish().unwrap();
        assert_eq!(encoder.state(), EncoderState::Closed);
        assert_eq!(summary.packets_written, 5);
    }

    #[test]
    fn test_finish_is_idempotent() {
        let mut encoder = encoder("mpeg1video");
        encode_all(&mut encoder, 2);
        let first = encoder.finish().unwrap();
        let second = encoder.finish().unwrap();
        assert_eq!(first, second);
        assert_eq!(encoder.into_sink().len(), first.total_bytes());
    }

    #[test]
    fn test_frame_size_mismatch_is_rejected() {
        let mut encoder = encoder("mpeg1video");
        let err = encoder.encode(Some(&frame(0, 320, 240))).unwrap_err();
        assert!(err.to_string().contains("320x240"));
    }

    #[test]
    fn test_packet_timestamps_follow_frame_pts() {
        let mut encoder = encoder("mpeg1video");
        let packets = encode_all(&mut encoder, 6);
        let mut pts: Vec<i64> = packets.iter().filter_map(|p| p.pts).collect();
        pts.sort_unstable();
        assert_eq!(pts, (0..6).collect::<Vec<_>>());
    }

    #[test]
    fn test_create_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.mpg");

        let mut encoder =
            FfmpegEncoder::create(&path, EncoderSettings::new("mpeg1video", 160, 120)).unwrap();
        for i in 0..3 {
            encoder.encode(Some(&frame(i, 160, 120))).unwrap();
        }
        encoder.encode(None).unwrap();
        let summary = encoder.finish().unwrap();
        drop(encoder);

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len(), summary.total_bytes());
        assert_eq!(bytes[bytes.len() - 4..], MPEG_SEQUENCE_END_CODE);
    }

    #[test]
    fn test_create_does_not_touch_file_for_unknown_codec() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.mpg");

        let settings = EncoderSettings::new("no-such-codec", 160, 120);
        let result = FfmpegEncoder::create(&path, settings);
        assert!(result.is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_create_in_missing_directory_fails() {
        let result = FfmpegEncoder::create(
            Path::new("/nonexistent/dir/out.mpg"),
            EncoderSettings::new("mpeg1video", 160, 120),
        );
        assert!(matches!(result, Err(EncoderError::CreateOutput { .. })));
    }
}
