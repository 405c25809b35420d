use image::{GenericImageView, Pixel};

/// Brightness statistics over a sampled grid of pixels, normalized to [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightingStats {
    pub mean: f32,
    pub std_dev: f32,
    pub samples: u32,
}

fn rgb_to_luma(r: u8, g: u8, b: u8) -> f32 {
    // Rec. 709 luminance
    (0.2126 * r as f32 + 0.7152 * g as f32 + 0.0722 * b as f32) / 255.0
}

/// One-pass mean/variance (Welford) over every `step`-th pixel on both axes.
/// Only the sampled pixels are read; the image is never converted up front.
pub fn measure<I, P>(image: &I, step: u32) -> Option<LightingStats>
where
    I: GenericImageView<Pixel = P>,
    P: Pixel<Subpixel = u8>,
{
    let step = step.max(1) as usize;
    let mut n = 0u32;
    let mut mean = 0f32;
    let mut m2 = 0f32;

    for y in (0..image.height()).step_by(step) {
        for x in (0..image.width()).step_by(step) {
            let p = image.get_pixel(x, y).to_rgb();
            let v = rgb_to_luma(p[0], p[1], p[2]);
            n += 1;
            let delta = v - mean;
            mean += delta / n as f32;
            m2 += delta * (v - mean);
        }
    }

    if n == 0 {
        return None;
    }

    Some(LightingStats {
        mean,
        std_dev: (m2 / n as f32).sqrt(),
        samples: n,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GrayImage, ImageBuffer, Luma, Rgb, RgbImage};

    #[test]
    fn flat_frame_has_no_contrast() {
        let img = ImageBuffer::from_pixel(32, 32, Rgb([128u8, 128, 128]));
        let stats = measure(&img, 4).unwrap();
        assert!((stats.mean - 128.0 / 255.0).abs() < 1e-3);
        assert!(stats.std_dev < 1e-3);
        assert_eq!(stats.samples, 64);
    }

    #[test]
    fn checkerboard_has_high_contrast() {
        let img = ImageBuffer::from_fn(16, 16, |x, y| {
            if (x + y) % 2 == 0 {
                Rgb([255u8, 255, 255])
            } else {
                Rgb([0u8, 0, 0])
            }
        });
        let stats = measure(&img, 1).unwrap();
        assert!((stats.mean - 0.5).abs() < 1e-3);
        assert!((stats.std_dev - 0.5).abs() < 1e-3);
    }

    #[test]
    fn stored_layout_does_not_change_stats() {
        let gray = GrayImage::from_fn(24, 24, |x, _| Luma([if x % 8 < 4 { 200u8 } else { 60 }]));
        let rgb = DynamicImage::ImageLuma8(gray.clone()).to_rgb8();

        let from_gray = measure(&DynamicImage::ImageLuma8(gray), 2).unwrap();
        let from_rgb = measure(&rgb, 2).unwrap();
        assert_eq!(from_gray.samples, from_rgb.samples);
        assert!((from_gray.mean - from_rgb.mean).abs() < 1e-4);
        assert!((from_gray.std_dev - from_rgb.std_dev).abs() < 1e-4);
    }

    #[test]
    fn empty_image_has_no_stats() {
        let img = RgbImage::new(0, 0);
        assert!(measure(&img, 4).is_none());
    }
}
