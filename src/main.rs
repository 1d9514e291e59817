use anyhow::{Context, Result};
use cinemask::output::{EncodeConfig, FfmpegOutput};
use cinemask::runtime::Device;
use cinemask::{generation, pipeline, segmentation, GenerationConfig, PipelineConfig};
use clap::Parser;
use image::Rgb;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to source image
    #[arg(long)]
    image: PathBuf,

    /// Path to the mask generator (ONNX file)
    #[arg(long, alias = "sam-checkpoint")]
    segmentation_model: String,

    /// Square input size the mask generator was exported with
    #[arg(long, default_value_t = 1024)]
    segmentation_size: u32,

    /// Path to the image-to-video model (ONNX file)
    #[arg(long)]
    model: String,

    /// Compute device
    #[arg(long, value_enum, default_value_t = Device::Cuda)]
    device: Device,

    /// Number of frames to generate
    #[arg(long, default_value_t = 25, value_parser = clap::value_parser!(u32).range(1..))]
    num_frames: u32,

    /// Motion bucket id
    #[arg(long, default_value_t = 160.0)]
    motion_bucket: f32,

    /// Noise augmentation strength
    #[arg(long, default_value_t = 0.05)]
    noise_aug: f32,

    /// Frames per second for output video
    #[arg(long, default_value_t = 15, value_parser = clap::value_parser!(u32).range(1..))]
    fps: u32,

    /// Path to output video
    #[arg(short, long, default_value = "output.mp4")]
    output: PathBuf,

    /// Working resolution width required by the video model
    #[arg(long, default_value_t = 1024)]
    width: u32,

    /// Working resolution height required by the video model
    #[arg(long, default_value_t = 576)]
    height: u32,

    /// Gray level shown to the video model outside the region
    #[arg(long, default_value_t = 127)]
    fill: u8,

    /// Save the selected mask (working resolution) as a PNG
    #[arg(long)]
    save_mask: Option<PathBuf>,

    /// Save the conditioning frame as a PNG
    #[arg(long)]
    save_conditioning: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    tracing::info!("Cinemask starting");
    tracing::info!("Working resolution: {}x{}", args.width, args.height);
    tracing::info!(
        "Frames: {} @ {} fps (motion={}, noise={})",
        args.num_frames,
        args.fps,
        args.motion_bucket,
        args.noise_aug
    );

    let config = PipelineConfig {
        working_size: (args.width, args.height),
        fill: Rgb([args.fill; 3]),
        generation: GenerationConfig {
            frame_count: args.num_frames,
            motion_strength: args.motion_bucket,
            noise_strength: args.noise_aug,
        },
        fps: args.fps,
    };
    config.validate()?;

    // Fail before any inference if the output can't be written
    let mut output = FfmpegOutput::new(EncodeConfig::new(&args.output))
        .context("Failed to initialize video output")?;

    let image = image::open(&args.image)
        .with_context(|| format!("Failed to read image {}", args.image.display()))?
        .to_rgb8();
    tracing::info!(
        "Loaded {} ({}x{})",
        args.image.display(),
        image.width(),
        image.height()
    );

    let mut segmenter = segmentation::create_default_model(
        &args.segmentation_model,
        args.device,
        args.segmentation_size,
    )
    .context("Failed to load segmentation model")?;

    let mut generator =
        generation::create_default_model(&args.model, args.device, config.working_size)
            .context("Failed to load video model")?;

    let animation = pipeline::run(&image, segmenter.as_mut(), generator.as_mut(), &config)
        .context("Failed to animate image")?;

    if let Some(path) = &args.save_mask {
        animation
            .mask
            .to_rgb()
            .save(path)
            .with_context(|| format!("Failed to save mask to {}", path.display()))?;
        tracing::info!("Saved mask to {}", path.display());
    }

    if let Some(path) = &args.save_conditioning {
        animation
            .conditioning
            .save(path)
            .with_context(|| format!("Failed to save conditioning frame to {}", path.display()))?;
        tracing::info!("Saved conditioning frame to {}", path.display());
    }

    pipeline::encode(&animation, &mut output, &config).context("Failed to write video")?;

    tracing::info!("Wrote {}", output.path().display());

    Ok(())
}
