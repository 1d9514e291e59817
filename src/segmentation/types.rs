use anyhow::Result;
use image::{imageops, GrayImage, Luma, RgbImage};

/// Binary region-of-interest mask: `true` = pixel may be animated
/// Stored row-major, matching the pixel order of `image::ImageBuffer`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    data: Vec<bool>,
}

impl Mask {
    pub fn new(width: u32, height: u32, value: bool) -> Self {
        Self {
            width,
            height,
            data: vec![value; (width as usize) * (height as usize)],
        }
    }

    pub fn from_fn<F>(width: u32, height: u32, mut f: F) -> Self
    where
        F: FnMut(u32, u32) -> bool,
    {
        let mut data = Vec::with_capacity((width as usize) * (height as usize));
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Build a mask from an 8-bit matte; any non-zero value is inside the region
    pub fn from_luma(matte: &GrayImage) -> Self {
        let (width, height) = matte.dimensions();
        Self {
            width,
            height,
            data: matte.pixels().map(|p| p[0] != 0).collect(),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        self.data[(y as usize) * (self.width as usize) + x as usize]
    }

    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        let idx = (y as usize) * (self.width as usize) + x as usize;
        self.data[idx] = value;
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.data
    }

    /// Number of pixels inside the region
    pub fn area(&self) -> u64 {
        self.data.iter().filter(|&&v| v).count() as u64
    }

    /// Render as an 8-bit matte (0 outside, 255 inside)
    pub fn to_luma(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            Luma([if self.get(x, y) { 255 } else { 0 }])
        })
    }

    /// Grayscale RGB rendering, used for debug output
    pub fn to_rgb(&self) -> RgbImage {
        RgbImage::from_fn(self.width, self.height, |x, y| {
            let value = if self.get(x, y) { 255 } else { 0 };
            image::Rgb([value, value, value])
        })
    }

    /// Resample to a new size, keeping the mask binary
    ///
    /// The 0/255 matte is resized with bilinear filtering and every
    /// resampled value above zero counts as inside, so thin regions
    /// survive downscaling.
    pub fn resize(&self, width: u32, height: u32) -> Mask {
        if self.dimensions() == (width, height) {
            return self.clone();
        }

        let resized = imageops::resize(
            &self.to_luma(),
            width,
            height,
            imageops::FilterType::Triangle,
        );

        Mask::from_luma(&resized)
    }
}

/// A candidate region produced by a segmentation backend
///
/// `segmentation` is the raw matte as the backend produced it; only
/// `segmentation` and `area` are interpreted by the pipeline.
#[derive(Debug, Clone)]
pub struct RegionProposal {
    pub segmentation: GrayImage,
    pub area: u64,
}

impl RegionProposal {
    pub fn new(segmentation: GrayImage, area: u64) -> Self {
        Self { segmentation, area }
    }

    /// Build a proposal from a matte, counting its non-zero pixels as the area
    pub fn from_matte(segmentation: GrayImage) -> Self {
        let area = segmentation.pixels().filter(|p| p[0] != 0).count() as u64;
        Self { segmentation, area }
    }
}

/// Trait for region-proposal models
/// Allows swapping between different backends (SAM, mask generators, manual masks, etc.)
pub trait SegmentationModel {
    /// Propose candidate regions for an image
    ///
    /// # Arguments
    /// * `image` - Input RGB image at native resolution
    ///
    /// # Returns
    /// * Region proposals whose mattes match the image dimensions
    fn propose(&mut self, image: &RgbImage) -> Result<Vec<RegionProposal>>;
}
