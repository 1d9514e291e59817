use anyhow::Result;
use image::RgbImage;

/// Parameters handed to the generation backend for one clip
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    /// Number of frames the backend must return
    pub frame_count: u32,
    /// Amount of motion to synthesize (motion bucket id for SVD-style models)
    pub motion_strength: f32,
    /// Noise augmentation applied to the conditioning frame
    pub noise_strength: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            frame_count: 25,
            motion_strength: 160.0,
            noise_strength: 0.05,
        }
    }
}

/// Trait for motion-generation models
/// Allows swapping between different image-to-video backends
pub trait MotionModel {
    /// Synthesize a clip from a conditioning frame
    ///
    /// # Arguments
    /// * `conditioning` - Conditioning frame at working resolution
    /// * `config` - Clip parameters
    ///
    /// # Returns
    /// * Exactly `config.frame_count` frames, all at the backend's working resolution
    fn generate(
        &mut self,
        conditioning: &RgbImage,
        config: &GenerationConfig,
    ) -> Result<Vec<RgbImage>>;
}
