//! Animate one region of a still image while every pixel outside it stays
//! bit-identical to the source.
//!
//! The pipeline segments the image, keeps the largest region, shows only
//! that region to an image-to-video model and pastes the generated motion
//! back onto the untouched original. Segmentation, generation and encoding
//! are traits so any backend can be plugged in.

pub mod composite;
pub mod error;
pub mod generation;
pub mod output;
pub mod pipeline;
pub mod preprocess;
pub mod runtime;
pub mod segmentation;

pub use error::{PipelineError, Result, Stage};
pub use generation::{GenerationConfig, MotionModel};
pub use output::VideoSink;
pub use pipeline::{Animation, PipelineConfig};
pub use segmentation::{Mask, RegionProposal, SegmentationModel};
