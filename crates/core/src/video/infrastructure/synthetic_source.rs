use std::str::FromStr;

use thiserror::Error;

use crate::shared::constants::FRAME_RATE;
use crate::shared::frame::{VideoFrame, CB, CR};
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::frame_source::FrameSource;

#[derive(Error, Debug, PartialEq)]
pub enum SyntheticSourceError {
    #[error("expected a size like 352x288, got '{0}'")]
    Malformed(String),
    #[error("frame size must be non-zero and even, got {width}x{height}")]
    InvalidSize { width: u32, height: u32 },
}

/// Picture size of a generated stream, parsed from `WIDTHxHEIGHT`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub fn new(width: u32, height: u32) -> Result<Self, SyntheticSourceError> {
        if width == 0 || height == 0 || width % 2 != 0 || height % 2 != 0 {
            return Err(SyntheticSourceError::InvalidSize { width, height });
        }
        Ok(Self { width, height })
    }
}

impl FromStr for FrameSize {
    type Err = SyntheticSourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || SyntheticSourceError::Malformed(s.to_string());
        let (w, h) = s.split_once(['x', 'X']).ok_or_else(malformed)?;
        let width = w.trim().parse().map_err(|_| malformed())?;
        let height = h.trim().parse().map_err(|_| malformed())?;
        Self::new(width, height)
    }
}

/// Endless stream of generated YUV420P test pictures.
///
/// Frame `i` is the classic libavcodec sample image: `Y = x + y + 3i`,
/// `Cb = 128 + y + 2i`, `Cr = 64 + x + 5i`, all modulo 256. Useful when no
/// input file is at hand; it never runs out.
pub struct SyntheticSource {
    metadata: VideoMetadata,
    index: usize,
}

impl SyntheticSource {
    pub fn new(size: FrameSize) -> Self {
        Self {
            metadata: VideoMetadata {
                width: size.width,
                height: size.height,
                fps: FRAME_RATE as f64,
                codec: "rawvideo".to_string(),
                stream_index: 0,
                source_path: None,
            },
            index: 0,
        }
    }
}

impl FrameSource for SyntheticSource {
    fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    fn next_frame(&mut self) -> Result<Option<VideoFrame>, Box<dyn std::error::Error>> {
        let i = self.index;
        let mut frame = VideoFrame::blank(self.metadata.width, self.metadata.height);

        frame
            .luma_mut()
            .indexed_iter_mut()
            .for_each(|((y, x), v)| *v = (x + y + i * 3) as u8);
        frame
            .plane_view_mut(CB)
            .indexed_iter_mut()
            .for_each(|((y, _), v)| *v = (128 + y + i * 2) as u8);
        frame
            .plane_view_mut(CR)
            .indexed_iter_mut()
            .for_each(|((_, x), v)| *v = (64 + x + i * 5) as u8);

        frame.set_pts(i as i64);
        self.index += 1;
        Ok(Some(frame))
    }

    fn rewind(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.index = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::frame::LUMA;
    use rstest::rstest;

    #[rstest]
    #[case::lowercase("352x288", 352, 288)]
    #[case::uppercase("640X480", 640, 480)]
    #[case::spaces(" 160 x 120 ", 160, 120)]
    fn test_parse_frame_size(#[case] input: &str, #[case] width: u32, #[case] height: u32) {
        assert_eq!(input.parse::<FrameSize>().unwrap(), FrameSize { width, height });
    }

    #[rstest]
    #[case::no_separator("352")]
    #[case::not_a_number("wide x tall")]
    #[case::negative("-2x4")]
    fn test_parse_malformed(#[case] input: &str) {
        assert!(matches!(
            input.parse::<FrameSize>(),
            Err(SyntheticSourceError::Malformed(_))
        ));
    }

    #[rstest]
    #[case::zero("0x120")]
    #[case::odd_width("161x120")]
    #[case::odd_height("160x121")]
    fn test_parse_invalid_size(#[case] input: &str) {
        assert!(matches!(
            input.parse::<FrameSize>(),
            Err(SyntheticSourceError::InvalidSize { .. })
        ));
    }

    #[test]
    fn test_frames_follow_sample_pattern() {
        let mut source = SyntheticSource::new(FrameSize::new(8, 4).unwrap());
        source.next_frame().unwrap();
        let frame = source.next_frame().unwrap().unwrap();

        assert_eq!(frame.pts(), 1);
        assert_eq!(frame.luma()[[2, 5]], 2 + 5 + 3);
        assert_eq!(frame.plane_view(CB)[[1, 0]], 128 + 1 + 2);
        assert_eq!(frame.plane_view(CR)[[0, 3]], 64 + 3 + 5);
    }

    #[test]
    fn test_values_wrap_modulo_256() {
        let mut source = SyntheticSource::new(FrameSize::new(2, 2).unwrap());
        for _ in 0..100 {
            source.next_frame().unwrap();
        }
        let frame = source.next_frame().unwrap().unwrap();
        assert_eq!(frame.plane(LUMA)[0], (300 % 256) as u8);
    }

    #[test]
    fn test_never_exhausts_and_rewinds() {
        let mut source = SyntheticSource::new(FrameSize::new(4, 4).unwrap());
        for _ in 0..50 {
            assert!(source.next_frame().unwrap().is_some());
        }
        source.rewind().unwrap();
        assert_eq!(source.next_frame().unwrap().unwrap().pts(), 0);
    }

    #[test]
    fn test_metadata_reports_size() {
        let source = SyntheticSource::new(FrameSize::new(320, 240).unwrap());
        assert_eq!(source.metadata().width, 320);
        assert_eq!(source.metadata().height, 240);
        assert!(source.metadata().source_path.is_none());
    }
}
