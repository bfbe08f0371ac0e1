pub const DEFAULT_INPUT_PATH: &str = "/mnt/media/input_video.mp4";
pub const DEFAULT_OUTPUT_PATH: &str = "/mnt/media/output_video.mp4";
pub const DEFAULT_CODEC_NAME: &str = "mpeg1video";

/// Number of frames the driver pushes through the encoder.
pub const DEFAULT_ITERATIONS: usize = 2500;

pub const DEFAULT_BIT_RATE: usize = 400_000;
pub const FRAME_RATE: i32 = 25;

/// Emit one intra frame every ten frames.
pub const GOP_SIZE: u32 = 10;
pub const MAX_B_FRAMES: usize = 1;

/// Private option applied to H.264 encoders only.
pub const H264_PRESET: &str = "slow";

/// MPEG-1/2 `sequence_end_code`, appended so the output is a complete stream.
pub const MPEG_SEQUENCE_END_CODE: [u8; 4] = [0x00, 0x00, 0x01, 0xB7];
