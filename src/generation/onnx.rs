use super::types::{GenerationConfig, MotionModel};
use crate::preprocess::{self, Preprocessor};
use crate::runtime::{self, Device};
use anyhow::{Context, Result};
use image::RgbImage;
use ndarray::arr1;
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;

/// Image-to-video diffusion model exported to ONNX
///
/// Inputs, in order: `image [1, 3, H, W]` in [0, 1], `motion_bucket_id [1]`,
/// `noise_aug_strength [1]` and `num_frames [1]` (i64).
/// Output: `[1, T, 3, H, W]` (or `[T, 3, H, W]`) in [0, 1].
pub struct OnnxVideoModel {
    session: Session,
    preprocessor: Preprocessor,
}

impl OnnxVideoModel {
    /// Create a video model from an ONNX file
    ///
    /// `working_size` is the (width, height) the model was exported for;
    /// conditioning frames of any other size are resized to it.
    pub fn new<P: AsRef<Path>>(
        model_path: P,
        device: Device,
        working_size: (u32, u32),
    ) -> Result<Self> {
        let session = runtime::load_session(model_path.as_ref(), device)?;

        tracing::info!(
            "Video model loaded ({}x{} working resolution)",
            working_size.0,
            working_size.1
        );

        Ok(Self {
            session,
            preprocessor: Preprocessor::new(working_size.0, working_size.1),
        })
    }
}

impl MotionModel for OnnxVideoModel {
    fn generate(
        &mut self,
        conditioning: &RgbImage,
        config: &GenerationConfig,
    ) -> Result<Vec<RgbImage>> {
        let _span = tracing::debug_span!("video_model").entered();

        let image = Tensor::from_array(self.preprocessor.preprocess(conditioning))?;
        let motion = Tensor::from_array(arr1(&[config.motion_strength]))?;
        let noise = Tensor::from_array(arr1(&[config.noise_strength]))?;
        let frames = Tensor::from_array(arr1(&[i64::from(config.frame_count)]))?;

        tracing::debug!(
            "Generating {} frames (motion={}, noise={})",
            config.frame_count,
            config.motion_strength,
            config.noise_strength
        );

        let _infer_span = tracing::debug_span!("inference").entered();
        let outputs = self
            .session
            .run(ort::inputs![image, motion, noise, frames])
            .context("Failed to run inference")?;
        drop(_infer_span);

        let (shape, data) = outputs[0].try_extract_tensor::<f32>()?;
        preprocess::tensor_to_frames(shape, data)
    }
}
