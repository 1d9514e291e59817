use crate::error::{PipelineError, Result, Stage};
use crate::segmentation::Mask;
use image::RgbImage;

/// Paste the region of each generated frame onto the original image
///
/// Pixels inside the mask come from the generated frame, all others are
/// copied from `original` untouched. The mask boundary is a hard cut.
/// Every frame is checked before any output is produced.
pub fn composite_frames(
    original: &RgbImage,
    mask: &Mask,
    generated: &[RgbImage],
) -> Result<Vec<RgbImage>> {
    let _span = tracing::debug_span!("composite_frames").entered();

    let expected = mask.dimensions();
    if original.dimensions() != expected {
        return Err(PipelineError::mismatch(
            Stage::Compositing,
            expected,
            original.dimensions(),
        ));
    }
    if let Some(frame) = generated.iter().find(|f| f.dimensions() != expected) {
        return Err(PipelineError::mismatch(
            Stage::Compositing,
            expected,
            frame.dimensions(),
        ));
    }

    let frames = generated
        .iter()
        .map(|frame| composite_one(original, mask, frame))
        .collect();

    tracing::debug!("Composited {} frames", generated.len());

    Ok(frames)
}

fn composite_one(original: &RgbImage, mask: &Mask, frame: &RgbImage) -> RgbImage {
    let mut out = original.clone();
    for ((dst, src), &inside) in out.pixels_mut().zip(frame.pixels()).zip(mask.as_slice()) {
        if inside {
            *dst = *src;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn noise(width: u32, height: u32, seed: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            let v = (x.wrapping_mul(73) ^ y.wrapping_mul(151) ^ seed.wrapping_mul(31)) as u8;
            Rgb([v, v.wrapping_add(17), v.wrapping_mul(3)])
        })
    }

    #[test]
    fn background_is_preserved_in_every_frame() {
        let original = noise(7, 5, 1);
        let mask = Mask::from_fn(7, 5, |x, y| (x * y) % 3 == 1);
        let generated: Vec<_> = (10..14).map(|s| noise(7, 5, s)).collect();

        let out = composite_frames(&original, &mask, &generated).unwrap();
        assert_eq!(out.len(), generated.len());

        for (frame, gen) in out.iter().zip(&generated) {
            for (x, y, pixel) in frame.enumerate_pixels() {
                if mask.get(x, y) {
                    assert_eq!(pixel, gen.get_pixel(x, y));
                } else {
                    assert_eq!(pixel, original.get_pixel(x, y));
                }
            }
        }
    }

    #[test]
    fn single_pixel_region_scenario() {
        let original = RgbImage::new(4, 4);
        let mut mask = Mask::new(4, 4, false);
        mask.set(1, 1, true);
        let generated = vec![RgbImage::from_pixel(4, 4, Rgb([255, 255, 255]))];

        let out = composite_frames(&original, &mask, &generated).unwrap();
        assert_eq!(out.len(), 1);
        for (x, y, pixel) in out[0].enumerate_pixels() {
            let expected = if (x, y) == (1, 1) { 255 } else { 0 };
            assert_eq!(pixel.0, [expected; 3]);
        }
    }

    #[test]
    fn frame_order_is_kept() {
        let original = RgbImage::new(2, 2);
        let mask = Mask::new(2, 2, true);
        let generated: Vec<_> = (1..=3u8)
            .map(|v| RgbImage::from_pixel(2, 2, Rgb([v, v, v])))
            .collect();
        let out = composite_frames(&original, &mask, &generated).unwrap();
        assert_eq!(out, generated);
    }

    #[test]
    fn mismatched_frame_is_rejected() {
        let original = RgbImage::new(4, 4);
        let mask = Mask::new(4, 4, true);
        let generated = vec![RgbImage::new(4, 4), RgbImage::new(4, 3)];
        let err = composite_frames(&original, &mask, &generated).unwrap_err();
        match err {
            PipelineError::DimensionMismatch {
                stage,
                expected,
                actual,
            } => {
                assert_eq!(stage, Stage::Compositing);
                assert_eq!(expected, (4, 4));
                assert_eq!(actual, (4, 3));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn mismatched_original_is_rejected() {
        let err = composite_frames(&RgbImage::new(3, 3), &Mask::new(4, 4, true), &[]).unwrap_err();
        assert!(matches!(err, PipelineError::DimensionMismatch { .. }));
    }
}
