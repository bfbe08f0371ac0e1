use crate::shared::frame::VideoFrame;

/// A compressed packet that was written to the output sink.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WrittenPacket {
    pub pts: Option<i64>,
    pub size: usize,
}

/// Totals reported once an encoder has been finished.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EncodeSummary {
    pub frames_sent: usize,
    pub packets_written: usize,
    pub payload_bytes: usize,
    pub trailer_bytes: usize,
}

impl EncodeSummary {
    /// Bytes that reached the sink: every packet plus any trailer.
    pub fn total_bytes(&self) -> usize {
        self.payload_bytes + self.trailer_bytes
    }
}

/// Compresses frames and writes the resulting packets to a byte sink.
pub trait FrameEncoder {
    /// Submits a frame, or `None` to flush, and returns every packet the
    /// encoder produced in response. An encoder may hold several frames
    /// back before emitting anything.
    fn encode(
        &mut self,
        frame: Option<&VideoFrame>,
    ) -> Result<Vec<WrittenPacket>, Box<dyn std::error::Error>>;

    /// Flushes if needed, writes any stream trailer and closes the sink.
    fn finish(&mut self) -> Result<EncodeSummary, Box<dyn std::error::Error>>;
}
