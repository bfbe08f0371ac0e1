use std::path::{Path, PathBuf};

use ffmpeg_next::software::scaling;
use ffmpeg_next::util::frame::video::Video;
use thiserror::Error;

use crate::shared::frame::{VideoFrame, CB, CR, LUMA};
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::frame_source::FrameSource;

#[derive(Error, Debug)]
pub enum ReaderError {
    #[error("could not open input {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: ffmpeg_next::Error,
    },
    #[error("no video stream in {}", .0.display())]
    NoVideoStream(PathBuf),
    #[error("could not open decoder for stream {stream_index}: {source}")]
    Decoder {
        stream_index: usize,
        #[source]
        source: ffmpeg_next::Error,
    },
    #[error("failed to read packet: {0}")]
    Read(#[source] ffmpeg_next::Error),
    #[error("failed to decode frame: {0}")]
    Decode(#[source] ffmpeg_next::Error),
    #[error("failed to convert frame to YUV420P: {0}")]
    Convert(#[source] ffmpeg_next::Error),
}

/// Decodes the first video stream of a container via ffmpeg-next
/// (libavformat + libavcodec).
///
/// Every frame is converted to YUV420P at the stream's declared size and
/// copied out into an owned [`VideoFrame`], so callers never share buffers
/// with the decoder. Container, decoder and scaler are released on drop.
pub struct FfmpegReader {
    path: PathBuf,
    input: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: Option<scaling::Context>,
    metadata: VideoMetadata,
    draining: bool,
}

impl FfmpegReader {
    pub fn open(path: &Path) -> Result<Self, ReaderError> {
        let open_error = |source| ReaderError::Open {
            path: path.to_path_buf(),
            source,
        };

        ffmpeg_next::init().map_err(open_error)?;
        let input = ffmpeg_next::format::input(path).map_err(open_error)?;

        let (decoder, stream_index, fps) = {
            let stream = input
                .streams()
                .find(|s| s.parameters().medium() == ffmpeg_next::media::Type::Video)
                .ok_or_else(|| ReaderError::NoVideoStream(path.to_path_buf()))?;

            let stream_index = stream.index();
            let decoder =
                ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
                    .and_then(|ctx| ctx.decoder().video())
                    .map_err(|source| ReaderError::Decoder {
                        stream_index,
                        source,
                    })?;

            let rate = stream.rate();
            let fps = if rate.denominator() != 0 {
                rate.numerator() as f64 / rate.denominator() as f64
            } else {
                0.0
            };
            (decoder, stream_index, fps)
        };

        let metadata = VideoMetadata {
            width: decoder.width(),
            height: decoder.height(),
            fps,
            codec: decoder
                .codec()
                .map(|c| c.name().to_string())
                .unwrap_or_default(),
            stream_index,
            source_path: Some(path.to_path_buf()),
        };

        log::debug!(
            "Opened {} stream {stream_index}: {} {}x{} @ {fps:.2} fps",
            path.display(),
            metadata.codec,
            metadata.width,
            metadata.height
        );

        Ok(Self {
            path: path.to_path_buf(),
            input,
            decoder,
            scaler: None,
            metadata,
            draining: false,
        })
    }

    /// Pulls one decoded picture out of the decoder, if it has one ready.
    fn receive(&mut self) -> Result<Option<Video>, ReaderError> {
        let mut decoded = Video::empty();
        match self.decoder.receive_frame(&mut decoded) {
            Ok(()) => Ok(Some(decoded)),
            Err(ffmpeg_next::Error::Other { errno })
                if errno == ffmpeg_next::util::error::EAGAIN =>
            {
                Ok(None)
            }
            Err(ffmpeg_next::Error::Eof) => Ok(None),
            Err(source) => Err(ReaderError::Decode(source)),
        }
    }

    fn convert(&mut self, decoded: &Video) -> Result<VideoFrame, ReaderError> {
        let width = self.metadata.width;
        let height = self.metadata.height;

        // Rebuilt whenever the decoder changes format or size mid-stream.
        let mut scaler = match self.scaler.take() {
            Some(scaler)
                if scaler.input().format == decoded.format()
                    && scaler.input().width == decoded.width()
                    && scaler.input().height == decoded.height() =>
            {
                scaler
            }
            _ => scaling::Context::get(
                decoded.format(),
                decoded.width(),
                decoded.height(),
                ffmpeg_next::format::Pixel::YUV420P,
                width,
                height,
                scaling::Flags::BILINEAR,
            )
            .map_err(ReaderError::Convert)?,
        };

        let mut yuv = Video::empty();
        let result = scaler.run(decoded, &mut yuv);
        self.scaler = Some(scaler);
        result.map_err(ReaderError::Convert)?;

        let mut frame = VideoFrame::blank(width, height);
        copy_planes(&yuv, &mut frame);
        frame.set_pts(decoded.pts().unwrap_or(0));
        Ok(frame)
    }
}

impl FrameSource for FfmpegReader {
    fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    fn next_frame(&mut self) -> Result<Option<VideoFrame>, Box<dyn std::error::Error>> {
        loop {
            if let Some(decoded) = self.receive()? {
                return Ok(Some(self.convert(&decoded)?));
            }

            if self.draining {
                return Ok(None);
            }

            let mut packet = ffmpeg_next::Packet::empty();
            match packet.read(&mut self.input) {
                Ok(()) => {}
                Err(ffmpeg_next::Error::Eof) => {
                    self.decoder.send_eof().map_err(ReaderError::Decode)?;
                    self.draining = true;
                    continue;
                }
                Err(source) => return Err(ReaderError::Read(source).into()),
            }

            if packet.stream() != self.metadata.stream_index {
                log::trace!("Skipping packet from stream {}", packet.stream());
                continue;
            }

            self.decoder
                .send_packet(&packet)
                .map_err(ReaderError::Decode)?;
        }
    }

    fn rewind(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        log::debug!("Re-opening {} from the start", self.path.display());
        *self = Self::open(&self.path)?;
        Ok(())
    }
}

/// Copies each plane of a YUV420P ffmpeg frame into `frame`, dropping the
/// per-row stride padding.
fn copy_planes(yuv: &Video, frame: &mut VideoFrame) {
    for plane in [LUMA, CB, CR] {
        let cols = frame.plane_width(plane);
        let rows = frame.plane_height(plane);
        let stride = yuv.stride(plane);
        let src = yuv.data(plane);
        let dst = frame.plane_mut(plane);
        for row in 0..rows {
            dst[row * cols..(row + 1) * cols]
                .copy_from_slice(&src[row * stride..row * stride + cols]);
        }
    }
}
