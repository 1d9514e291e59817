use anyhow::{Context, Result};
use ort::execution_providers::{
    CPUExecutionProvider, CUDAExecutionProvider, ExecutionProviderDispatch,
    TensorRTExecutionProvider,
};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use std::fmt;
use std::path::Path;

/// Compute device the ONNX backends run on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Device {
    Cpu,
    #[default]
    Cuda,
    Tensorrt,
}

impl Device {
    fn execution_providers(self) -> Vec<ExecutionProviderDispatch> {
        match self {
            Device::Cpu => vec![CPUExecutionProvider::default().build()],
            // Fail loudly instead of silently falling back to CPU
            Device::Cuda => vec![CUDAExecutionProvider::default().build().error_on_failure()],
            Device::Tensorrt => vec![
                TensorRTExecutionProvider::default()
                    .build()
                    .error_on_failure(),
                CUDAExecutionProvider::default().build(),
            ],
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Device::Cpu => "cpu",
            Device::Cuda => "cuda",
            Device::Tensorrt => "tensorrt",
        };
        f.write_str(name)
    }
}

/// Load an ONNX model onto the requested device
pub fn load_session(model_path: &Path, device: Device) -> Result<Session> {
    tracing::info!(
        "Loading ONNX model from {} on {}",
        model_path.display(),
        device
    );

    let session = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_intra_threads(4)?
        .with_execution_providers(device.execution_providers())?
        .commit_from_file(model_path)
        .with_context(|| format!("Failed to load model from {}", model_path.display()))?;

    tracing::debug!(
        "Model has {} inputs, {} outputs",
        session.inputs.len(),
        session.outputs.len()
    );

    Ok(session)
}
