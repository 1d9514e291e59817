use crate::segmentation::RegionProposal;
use anyhow::{bail, ensure, Result};
use image::{imageops, GrayImage, Luma, RgbImage};
use ndarray::{Array4, ArrayViewD, Axis, Ix4, IxDyn};

/// Turns RGB images into the float tensors the ONNX backends consume
pub struct Preprocessor {
    target_width: u32,
    target_height: u32,
}

impl Preprocessor {
    pub fn new(target_width: u32, target_height: u32) -> Self {
        Self {
            target_width,
            target_height,
        }
    }

    /// `[1, 3, H, W]` tensor in [0, 1], bilinearly resized to the target size first
    pub fn preprocess(&self, image: &RgbImage) -> Array4<f32> {
        let _span = tracing::debug_span!("preprocess").entered();

        let resized;
        let source = if image.dimensions() != (self.target_width, self.target_height) {
            resized = imageops::resize(
                image,
                self.target_width,
                self.target_height,
                imageops::FilterType::Triangle,
            );
            &resized
        } else {
            image
        };

        let (width, height) = source.dimensions();
        let mut tensor = Array4::<f32>::zeros((1, 3, height as usize, width as usize));

        for (x, y, pixel) in source.enumerate_pixels() {
            for c in 0..3 {
                tensor[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
            }
        }

        tensor
    }
}

/// Convert a model output of shape `[1, T, 3, H, W]` or `[T, 3, H, W]`
/// with values in [0, 1] into RGB frames
pub fn tensor_to_frames(shape: &[i64], data: &[f32]) -> Result<Vec<RgbImage>> {
    let _span = tracing::debug_span!("postprocess").entered();

    let dims: Vec<usize> = shape.iter().map(|&d| d.max(0) as usize).collect();
    let view = ArrayViewD::from_shape(IxDyn(&dims), data)?;

    let view = match dims.len() {
        5 if dims[0] == 1 => view.index_axis_move(Axis(0), 0),
        4 => view,
        _ => bail!("expected frame tensor of shape [1,T,3,H,W] or [T,3,H,W], got {:?}", dims),
    };
    let view = view.into_dimensionality::<Ix4>()?;

    let channels = view.shape()[1];
    if channels != 3 {
        bail!("expected 3 colour channels in frame tensor, got {}", channels);
    }

    let height = view.shape()[2] as u32;
    let width = view.shape()[3] as u32;

    let frames = view
        .outer_iter()
        .map(|frame| {
            RgbImage::from_fn(width, height, |x, y| {
                let (x, y) = (x as usize, y as usize);
                image::Rgb([
                    unit_to_u8(frame[[0, y, x]]),
                    unit_to_u8(frame[[1, y, x]]),
                    unit_to_u8(frame[[2, y, x]]),
                ])
            })
        })
        .collect();

    Ok(frames)
}

/// Turn mask logits of shape `[1, N, h, w]` or `[N, h, w]` into region
/// proposals at `size`
///
/// A pixel is inside where its logit is positive. Mattes are scaled with
/// nearest filtering and empty ones are dropped.
pub fn logits_to_proposals(
    shape: &[i64],
    logits: &[f32],
    size: (u32, u32),
) -> Result<Vec<RegionProposal>> {
    let (count, mask_height, mask_width) = match *shape {
        [1, n, h, w] | [n, h, w] => (n, h, w),
        _ => bail!("unexpected mask output shape {:?}", shape),
    };
    ensure!(
        count >= 0 && mask_height > 0 && mask_width > 0,
        "unexpected mask output shape {:?}",
        shape
    );
    let (count, mask_height, mask_width) =
        (count as usize, mask_height as u32, mask_width as u32);

    let plane = (mask_width as usize) * (mask_height as usize);
    ensure!(
        logits.len() == count * plane,
        "mask output holds {} values, shape {:?} needs {}",
        logits.len(),
        shape,
        count * plane
    );

    let (width, height) = size;
    let mut proposals = Vec::with_capacity(count);
    for (n, channel) in logits.chunks_exact(plane).enumerate() {
        let matte = GrayImage::from_fn(mask_width, mask_height, |x, y| {
            let logit = channel[(y * mask_width + x) as usize];
            Luma([if logit > 0.0 { 255 } else { 0 }])
        });

        let matte = if matte.dimensions() != (width, height) {
            imageops::resize(&matte, width, height, imageops::FilterType::Nearest)
        } else {
            matte
        };

        let proposal = RegionProposal::from_matte(matte);
        if proposal.area == 0 {
            tracing::debug!("Dropping empty mask {}", n);
            continue;
        }
        proposals.push(proposal);
    }

    Ok(proposals)
}

fn unit_to_u8(value: f32) -> u8 {
    (value * 255.0).round().clamp(0.0, 255.0) as u8
}
