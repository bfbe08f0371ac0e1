use std::path::PathBuf;

/// Properties of the video stream a frame source is decoding.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub codec: String,
    pub stream_index: usize,
    pub source_path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction() {
        let meta = VideoMetadata {
            width: 1920,
            height: 1080,
            fps: 25.0,
            codec: "h264".to_string(),
            stream_index: 1,
            source_path: Some(PathBuf::from("/tmp/test.mp4")),
        };
        assert_eq!(meta.width, 1920);
        assert_eq!(meta.height, 1080);
        assert_eq!(meta.stream_index, 1);
        assert_eq!(meta.codec, "h264");
        assert_eq!(meta.source_path, Some(PathBuf::from("/tmp/test.mp4")));
    }

    #[test]
    fn test_clone_is_independent() {
        let meta = VideoMetadata {
            width: 640,
            height: 480,
            fps: 24.0,
            codec: "vp9".to_string(),
            stream_index: 0,
            source_path: None,
        };
        let cloned = meta.clone();
        assert_eq!(meta, cloned);
    }
}
