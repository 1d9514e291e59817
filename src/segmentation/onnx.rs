use super::types::{RegionProposal, SegmentationModel};
use crate::preprocess::{self, Preprocessor};
use crate::runtime::{self, Device};
use anyhow::{Context, Result};
use image::RgbImage;
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;

/// Automatic mask generator exported to ONNX
///
/// Expects a single `[1, 3, S, S]` input in [0, 1] and produces mask
/// logits shaped `[1, N, h, w]` or `[N, h, w]`. Each mask channel becomes
/// one region proposal at the image's native resolution.
pub struct OnnxMaskGenerator {
    session: Session,
    preprocessor: Preprocessor,
}

impl OnnxMaskGenerator {
    /// Create a mask generator from an ONNX file
    ///
    /// # Arguments
    /// * `model_path` - Path to the ONNX model file
    /// * `device` - Execution device
    /// * `input_size` - Square input edge the model was exported with
    pub fn new<P: AsRef<Path>>(model_path: P, device: Device, input_size: u32) -> Result<Self> {
        let session = runtime::load_session(model_path.as_ref(), device)?;

        tracing::info!("Mask generator loaded ({}x{} input)", input_size, input_size);

        Ok(Self {
            session,
            preprocessor: Preprocessor::new(input_size, input_size),
        })
    }
}

impl SegmentationModel for OnnxMaskGenerator {
    fn propose(&mut self, image: &RgbImage) -> Result<Vec<RegionProposal>> {
        let _span = tracing::debug_span!("mask_generator").entered();

        let input_tensor = Tensor::from_array(self.preprocessor.preprocess(image))?;

        let _infer_span = tracing::debug_span!("inference").entered();
        let outputs = self
            .session
            .run(ort::inputs![input_tensor])
            .context("Failed to run inference")?;
        drop(_infer_span);

        let (shape, logits) = outputs[0].try_extract_tensor::<f32>()?;
        let proposals = preprocess::logits_to_proposals(shape, logits, image.dimensions())?;

        tracing::debug!("Mask generator produced {} proposals", proposals.len());

        Ok(proposals)
    }
}
