mod ffmpeg;

pub use ffmpeg::{is_ffmpeg_on_path, EncodeConfig, FfmpegOutput};

use anyhow::Result;
use image::RgbImage;

/// Trait for video destinations
pub trait VideoSink {
    /// Persist a complete frame sequence as one video at `fps`
    fn write_video(&mut self, frames: &[RgbImage], fps: u32) -> Result<()>;
}
