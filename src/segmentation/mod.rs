mod onnx;
mod select;
pub mod types;

pub use onnx::OnnxMaskGenerator;
pub use select::select_mask;
pub use types::{Mask, RegionProposal, SegmentationModel};

use crate::runtime::Device;
use anyhow::Result;

/// Create the default segmentation backend (ONNX mask generator)
pub fn create_default_model(
    model_path: &str,
    device: Device,
    input_size: u32,
) -> Result<Box<dyn SegmentationModel>> {
    let model = OnnxMaskGenerator::new(model_path, device, input_size)?;
    Ok(Box::new(model))
}
