use crate::error::{PipelineError, Result, Stage};
use crate::segmentation::Mask;
use image::{Rgb, RgbImage};

/// Neutral mid-gray the generation backend sees outside the region
pub const DEFAULT_FILL: Rgb<u8> = Rgb([127, 127, 127]);

/// Build the conditioning frame: region pixels are kept, everything else
/// is replaced with `fill`
pub fn compose_conditioning(image: &RgbImage, mask: &Mask, fill: Rgb<u8>) -> Result<RgbImage> {
    let _span = tracing::debug_span!("compose_conditioning").entered();

    if mask.dimensions() != image.dimensions() {
        return Err(PipelineError::mismatch(
            Stage::Conditioning,
            image.dimensions(),
            mask.dimensions(),
        ));
    }

    let mut conditioning = image.clone();
    for (pixel, &inside) in conditioning.pixels_mut().zip(mask.as_slice()) {
        if !inside {
            *pixel = fill;
        }
    }

    Ok(conditioning)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 40) as u8, (y * 40) as u8, ((x + y) * 10) as u8])
        })
    }

    #[test]
    fn full_mask_returns_image_unchanged() {
        let image = gradient(5, 4);
        let conditioning = compose_conditioning(&image, &Mask::new(5, 4, true), DEFAULT_FILL).unwrap();
        assert_eq!(conditioning, image);
    }

    #[test]
    fn empty_mask_is_all_fill() {
        let image = gradient(5, 4);
        let fill = Rgb([1, 2, 3]);
        let conditioning = compose_conditioning(&image, &Mask::new(5, 4, false), fill).unwrap();
        assert!(conditioning.pixels().all(|p| *p == fill));
    }

    #[test]
    fn partial_mask_keeps_region_only() {
        let image = gradient(3, 3);
        let mask = Mask::from_fn(3, 3, |x, _| x == 1);
        let conditioning = compose_conditioning(&image, &mask, DEFAULT_FILL).unwrap();
        for (x, y, pixel) in conditioning.enumerate_pixels() {
            if x == 1 {
                assert_eq!(pixel, image.get_pixel(x, y));
            } else {
                assert_eq!(*pixel, DEFAULT_FILL);
            }
        }
    }

    #[test]
    fn mismatched_mask_is_rejected() {
        let image = gradient(3, 3);
        let err = compose_conditioning(&image, &Mask::new(2, 3, true), DEFAULT_FILL).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::DimensionMismatch {
                stage: Stage::Conditioning,
                ..
            }
        ));
    }
}
