use std::time::Instant;

use crate::video::domain::frame_encoder::{EncodeSummary, WrittenPacket};

/// Cross-cutting logger for re-encode events.
///
/// Decouples the driver from where progress ends up (stdout, the `log`
/// crate, nowhere) so the orchestration code stays the same for every
/// caller.
pub trait PipelineLogger {
    /// A frame with the given timestamp is about to be handed to the encoder.
    fn frame_sent(&mut self, pts: i64);

    /// The encoder produced a packet and it reached the output.
    fn packet_written(&mut self, packet: &WrittenPacket);

    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self, _summary: &EncodeSummary) {}
}

/// Silent logger that discards all events.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn frame_sent(&mut self, _pts: i64) {}
    fn packet_written(&mut self, _packet: &WrittenPacket) {}
    fn info(&mut self, _message: &str) {}
}

/// CLI logger: one stdout line per frame sent and per packet written,
/// plus a throughput summary through `log` at the end.
pub struct StdoutPipelineLogger {
    start_time: Instant,
    frames: usize,
    bytes: usize,
}

impl StdoutPipelineLogger {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            frames: 0,
            bytes: 0,
        }
    }

    /// Returns the formatted summary string.
    pub fn summary_string(&self, summary: &EncodeSummary) -> String {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        let mut lines = vec![format!(
            "Encoded {} frames into {} packets ({} bytes, {} trailer) in {elapsed:.1}s",
            summary.frames_sent,
            summary.packets_written,
            summary.total_bytes(),
            summary.trailer_bytes,
        )];
        if self.frames > 0 && elapsed > 0.0 {
            lines.push(format!(
                "  Throughput: {:.1} fps, {:.1} kB/s",
                self.frames as f64 / elapsed,
                self.bytes as f64 / 1000.0 / elapsed
            ));
        }
        lines.join("\n")
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn frame_sent(&mut self, pts: i64) {
        self.frames += 1;
        println!("Send frame {pts:3}");
    }

    fn packet_written(&mut self, packet: &WrittenPacket) {
        self.bytes += packet.size;
        let pts = packet.pts.unwrap_or(-1);
        println!("Write packet {pts:3} (size={:5})", packet.size);
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self, summary: &EncodeSummary) {
        log::info!("{}", self.summary_string(summary));
    }
}
