mod onnx;
pub mod types;

pub use onnx::OnnxVideoModel;
pub use types::{GenerationConfig, MotionModel};

use crate::runtime::Device;
use anyhow::Result;

/// Create the default generation backend (ONNX image-to-video model)
pub fn create_default_model(
    model_path: &str,
    device: Device,
    working_size: (u32, u32),
) -> Result<Box<dyn MotionModel>> {
    let model = OnnxVideoModel::new(model_path, device, working_size)?;
    Ok(Box::new(model))
}
