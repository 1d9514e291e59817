use crate::composite::{compose_conditioning, composite_frames, DEFAULT_FILL};
use crate::error::{PipelineError, Result, Stage};
use crate::generation::{GenerationConfig, MotionModel};
use crate::output::VideoSink;
use crate::segmentation::{select_mask, Mask, SegmentationModel};
use image::{imageops, Rgb, RgbImage};
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// (width, height) the generation backend works at
    pub working_size: (u32, u32),
    /// Colour shown to the generation backend outside the region
    pub fill: Rgb<u8>,
    pub generation: GenerationConfig,
    /// Output frame rate handed to the encoder
    pub fps: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            // native resolution of SVD-XT
            working_size: (1024, 576),
            fill: DEFAULT_FILL,
            generation: GenerationConfig::default(),
            fps: 15,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        let (width, height) = self.working_size;
        if width == 0 || height == 0 {
            return Err(PipelineError::invalid_config(
                "working width/height must be non-zero",
            ));
        }
        if self.generation.frame_count == 0 {
            return Err(PipelineError::invalid_config("frame count must be non-zero"));
        }
        if self.fps == 0 {
            return Err(PipelineError::invalid_config("fps must be non-zero"));
        }
        Ok(())
    }
}

/// Result of one pipeline run
#[derive(Debug, Clone)]
pub struct Animation {
    /// Composited frames at working resolution
    pub frames: Vec<RgbImage>,
    /// Region mask at working resolution
    pub mask: Mask,
    /// Frame the generation backend was conditioned on
    pub conditioning: RgbImage,
    pub native_size: (u32, u32),
    pub working_size: (u32, u32),
    /// Whether the source image was resampled to reach the working size
    pub resized: bool,
}

/// Animate the largest segmented region of `image`
///
/// Runs segmentation, mask selection, resize to the working resolution,
/// conditioning, generation and compositing in order. Any failure aborts
/// the run; collaborator errors are passed through unchanged.
pub fn run<S, G>(
    image: &RgbImage,
    segmenter: &mut S,
    generator: &mut G,
    config: &PipelineConfig,
) -> Result<Animation>
where
    S: SegmentationModel + ?Sized,
    G: MotionModel + ?Sized,
{
    let _span = tracing::info_span!("pipeline").entered();
    config.validate()?;

    let native_size = image.dimensions();
    let (width, height) = config.working_size;

    // Segmentation
    let start = Instant::now();
    let proposals = segmenter
        .propose(image)
        .map_err(|e| PipelineError::collaborator(Stage::Segmentation, e))?;
    tracing::info!(
        "Segmentation produced {} proposals in {:.1}ms",
        proposals.len(),
        start.elapsed().as_secs_f64() * 1000.0
    );

    let mask = select_mask(&proposals)?;
    if mask.dimensions() != native_size {
        return Err(PipelineError::mismatch(
            Stage::MaskSelection,
            native_size,
            mask.dimensions(),
        ));
    }
    tracing::info!("Selected region covers {} pixels", mask.area());

    // Working resolution
    let resized = native_size != config.working_size;
    let (working_image, working_mask) = if resized {
        tracing::info!(
            "Resizing {}x{} -> {}x{} for generation",
            native_size.0,
            native_size.1,
            width,
            height
        );
        (
            imageops::resize(image, width, height, imageops::FilterType::Triangle),
            mask.resize(width, height),
        )
    } else {
        (image.clone(), mask)
    };

    let conditioning = compose_conditioning(&working_image, &working_mask, config.fill)?;

    // Generation
    let start = Instant::now();
    let generated = generator
        .generate(&conditioning, &config.generation)
        .map_err(|e| PipelineError::collaborator(Stage::Generation, e))?;
    if generated.len() != config.generation.frame_count as usize {
        return Err(PipelineError::collaborator(
            Stage::Generation,
            anyhow::anyhow!(
                "expected {} frames, got {}",
                config.generation.frame_count,
                generated.len()
            ),
        ));
    }
    tracing::info!(
        "Generated {} frames in {:.1}ms",
        generated.len(),
        start.elapsed().as_secs_f64() * 1000.0
    );

    let frames = composite_frames(&working_image, &working_mask, &generated)?;

    Ok(Animation {
        frames,
        mask: working_mask,
        conditioning,
        native_size,
        working_size: config.working_size,
        resized,
    })
}

/// Hand a finished animation to the video encoder at `config.fps`
pub fn encode<O>(animation: &Animation, sink: &mut O, config: &PipelineConfig) -> Result<()>
where
    O: VideoSink + ?Sized,
{
    config.validate()?;

    let start = Instant::now();
    sink.write_video(&animation.frames, config.fps)
        .map_err(PipelineError::Encoding)?;
    tracing::info!(
        "Encoding took {:.1}ms",
        start.elapsed().as_secs_f64() * 1000.0
    );
    Ok(())
}
