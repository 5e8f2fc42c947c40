//! Image preprocessing for the CLIP vision tower.
//!
//! CLIP ViT-B/32 expects:
//! - Shortest side resized to 224 (bicubic), then a centred 224×224 crop
//! - Pixels scaled to [0, 1], then normalized per channel with CLIP mean/std
//! - Channel order: RGB
//! - Tensor layout: NCHW [batch, channels, height, width]

use image::imageops::FilterType;
use image::DynamicImage;
use ndarray::Array4;

const CHANNELS: usize = 3;

pub const CLIP_MEAN: [f32; 3] = [0.481_454_66, 0.457_827_5, 0.408_210_73];
pub const CLIP_STD: [f32; 3] = [0.268_629_54, 0.261_302_58, 0.275_777_11];

/// Dimensions after scaling the shortest side to `size`, keeping aspect ratio.
/// The long side is truncated, not rounded, so 500x375 becomes 298x224 as in
/// the reference CLIP image processor.
fn shortest_side_dims(width: u32, height: u32, size: u32) -> (u32, u32) {
    if width <= height {
        let h = (size as f64 * height as f64 / width.max(1) as f64) as u32;
        (size, h.max(size))
    } else {
        let w = (size as f64 * width as f64 / height.max(1) as f64) as u32;
        (w.max(size), size)
    }
}

/// Resize, centre-crop and normalize an image into a `[1, 3, size, size]` tensor.
pub fn preprocess(image: &DynamicImage, size: u32) -> Array4<f32> {
    let (w, h) = shortest_side_dims(image.width(), image.height(), size);
    let resized = image.resize_exact(w, h, FilterType::CatmullRom);
    let left = (w - size) / 2;
    let top = (h - size) / 2;
    let rgb = resized.crop_imm(left, top, size, size).to_rgb8();

    let side = size as usize;
    let mut tensor = Array4::<f32>::zeros((1, CHANNELS, side, side));
    for (x, y, pixel) in rgb.enumerate_pixels() {
        for (c, &val) in pixel.0.iter().enumerate() {
            tensor[[0, c, y as usize, x as usize]] = (val as f32 / 255.0 - CLIP_MEAN[c]) / CLIP_STD[c];
        }
    }

    tensor
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_shortest_side_dims() {
        assert_eq!(shortest_side_dims(640, 480, 224), (298, 224));
        assert_eq!(shortest_side_dims(480, 640, 224), (224, 298));
        assert_eq!(shortest_side_dims(500, 375, 224), (298, 224));
        assert_eq!(shortest_side_dims(375, 500, 224), (224, 298));
        assert_eq!(shortest_side_dims(100, 100, 224), (224, 224));
    }

    #[test]
    fn test_preprocess_shape() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(640, 480));
        assert_eq!(preprocess(&img, 224).shape(), &[1, 3, 224, 224]);

        let tall = DynamicImage::ImageRgb8(RgbImage::new(50, 300));
        assert_eq!(preprocess(&tall, 32).shape(), &[1, 3, 32, 32]);
    }

    #[test]
    fn test_preprocess_normalization() {
        let white = DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 10, Rgb([255, 255, 255])));
        let tensor = preprocess(&white, 16);
        for c in 0..3 {
            let expected = (1.0 - CLIP_MEAN[c]) / CLIP_STD[c];
            assert!((tensor[[0, c, 8, 8]] - expected).abs() < 1e-4);
        }

        let black = DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 10, Rgb([0, 0, 0])));
        let tensor = preprocess(&black, 16);
        assert!((tensor[[0, 0, 0, 0]] + CLIP_MEAN[0] / CLIP_STD[0]).abs() < 1e-4);
    }

    #[test]
    fn test_centre_crop_keeps_middle() {
        // Left third red, middle third green, right third blue
        let img = RgbImage::from_fn(90, 30, |x, _| match x / 30 {
            0 => Rgb([255, 0, 0]),
            1 => Rgb([0, 255, 0]),
            _ => Rgb([0, 0, 255]),
        });
        let tensor = preprocess(&DynamicImage::ImageRgb8(img), 30);
        let green = (1.0 - CLIP_MEAN[1]) / CLIP_STD[1];
        assert!((tensor[[0, 1, 15, 15]] - green).abs() < 1e-3);
    }
}
