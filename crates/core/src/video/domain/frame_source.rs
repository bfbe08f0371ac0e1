use crate::shared::frame::VideoFrame;
use crate::shared::video_metadata::VideoMetadata;

/// Produces decoded video frames one at a time.
///
/// Implementations own every decoding resource they acquire and release
/// it on drop, so a source can be abandoned on any error path.
pub trait FrameSource {
    /// Properties of the stream frames are taken from.
    fn metadata(&self) -> &VideoMetadata;

    /// Returns the next decoded frame, or `Ok(None)` once the input is
    /// exhausted. Exhaustion is not an error; read and decode failures are.
    fn next_frame(&mut self) -> Result<Option<VideoFrame>, Box<dyn std::error::Error>>;

    /// Restarts the source from its first frame.
    fn rewind(&mut self) -> Result<(), Box<dyn std::error::Error>>;
}
