//! Decodes frames from a video file with FFmpeg, stamps a test pattern on
//! each one and re-encodes the stream into a raw elementary-stream file.

pub mod shared {
    pub mod constants;
    pub mod frame;
    pub mod video_metadata;
}

pub mod video {
    pub mod domain {
        pub mod frame_encoder;
        pub mod frame_source;
    }

    pub mod infrastructure {
        pub mod ffmpeg_encoder;
        pub mod ffmpeg_reader;
        pub mod synthetic_source;

        #[cfg(test)]
        pub(crate) mod test_video;
    }
}

pub mod pipeline {
    pub mod pipeline_logger;
    pub mod reencode_use_case;
    pub mod test_pattern;
}
