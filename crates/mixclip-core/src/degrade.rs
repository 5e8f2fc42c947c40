//! Pixel dropout: degrading photos by zeroing random pixels.

use std::path::{Path, PathBuf};

use image::{DynamicImage, Rgb, RgbImage};
use rand::Rng;
use serde::Serialize;

use crate::discovery::FileDiscovery;
use crate::error::PipelineError;
use crate::sampling::make_rng;

/// Extensions of the photos the dropout stage reads.
pub const DROPOUT_EXTENSIONS: &[&str] = &["jpg"];

/// Zero each pixel independently with probability `probability`.
///
/// All channels of a dropped pixel are zeroed. Grayscale images stay
/// grayscale; everything else becomes 8-bit RGB. Pixels are visited in
/// row-major order, so a seeded `rng` gives a reproducible mask.
pub fn pixel_dropout<R: Rng + ?Sized>(
    image: &DynamicImage,
    probability: f64,
    rng: &mut R,
) -> Result<DynamicImage, PipelineError> {
    if !(0.0..=1.0).contains(&probability) {
        return Err(PipelineError::Image {
            path: PathBuf::new(),
            message: format!("dropout probability {probability} outside [0, 1]"),
        });
    }

    match image {
        DynamicImage::ImageLuma8(gray) => {
            let mut out = gray.clone();
            for pixel in out.pixels_mut() {
                if rng.gen::<f64>() <= probability {
                    pixel.0 = [0];
                }
            }
            Ok(DynamicImage::ImageLuma8(out))
        }
        other => {
            let mut out: RgbImage = other.to_rgb8();
            for pixel in out.pixels_mut() {
                if rng.gen::<f64>() <= probability {
                    *pixel = Rgb([0, 0, 0]);
                }
            }
            Ok(DynamicImage::ImageRgb8(out))
        }
    }
}

/// Counts from degrading one directory.
#[derive(Debug, Clone, Serialize)]
pub struct DegradeReport {
    pub output_dir: PathBuf,
    pub probability: f64,
    pub processed: usize,
    pub failed: usize,
}

/// Photos in `input` the dropout stage would process.
pub fn dropout_inputs(input: &Path) -> Vec<PathBuf> {
    FileDiscovery::new(DROPOUT_EXTENSIONS)
        .discover(input)
        .into_iter()
        .map(|f| f.path)
        .collect()
}

fn degrade_file<R: Rng + ?Sized>(
    path: &Path,
    output: &Path,
    probability: f64,
    rng: &mut R,
) -> Result<(), PipelineError> {
    let image = image::open(path).map_err(|e| PipelineError::Image {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let degraded = pixel_dropout(&image, probability, rng)?;
    degraded.save(output).map_err(|e| PipelineError::Image {
        path: output.to_path_buf(),
        message: e.to_string(),
    })
}

/// Degrade every `.jpg` in `input`, saving each under the same name in `output`.
///
/// Undecodable files are logged and counted; the run continues.
/// `on_file` is called after each file, whatever its outcome.
pub fn apply_pixel_dropout_dir(
    input: &Path,
    output: &Path,
    probability: f64,
    seed: Option<u64>,
    mut on_file: impl FnMut(),
) -> Result<DegradeReport, PipelineError> {
    if !(0.0..=1.0).contains(&probability) {
        return Err(PipelineError::Image {
            path: input.to_path_buf(),
            message: format!("dropout probability {probability} outside [0, 1]"),
        });
    }
    if !input.is_dir() {
        return Err(PipelineError::FileNotFound(input.to_path_buf()));
    }
    std::fs::create_dir_all(output).map_err(|e| PipelineError::io(output, e))?;

    let files = dropout_inputs(input);
    tracing::info!(
        "Applying {:.0}% pixel dropout to {} images -> {:?}",
        probability * 100.0,
        files.len(),
        output
    );

    let mut rng = make_rng(seed);
    let mut report = DegradeReport {
        output_dir: output.to_path_buf(),
        probability,
        processed: 0,
        failed: 0,
    };

    for path in &files {
        let Some(name) = path.file_name() else {
            continue;
        };
        match degrade_file(path, &output.join(name), probability, &mut rng) {
            Ok(()) => report.processed += 1,
            Err(e) => {
                tracing::error!("Failed to degrade {:?}: {}", path, e);
                report.failed += 1;
            }
        }
        on_file();
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn white_rgb(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([255, 255, 255])))
    }

    fn zeroed(image: &DynamicImage) -> usize {
        image.to_rgb8().pixels().filter(|p| p.0 == [0, 0, 0]).count()
    }

    #[test]
    fn test_dropout_extremes() {
        let img = white_rgb(8, 8);
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(zeroed(&pixel_dropout(&img, 0.0, &mut rng).unwrap()), 0);
        assert_eq!(zeroed(&pixel_dropout(&img, 1.0, &mut rng).unwrap()), 64);
    }

    #[test]
    fn test_dropout_fraction_is_close() {
        let img = white_rgb(100, 100);
        let mut rng = StdRng::seed_from_u64(42);
        let out = pixel_dropout(&img, 0.5, &mut rng).unwrap();
        let frac = zeroed(&out) as f64 / 10_000.0;
        assert!((frac - 0.5).abs() < 0.05, "fraction {frac}");
    }

    #[test]
    fn test_dropout_zeroes_whole_pixels() {
        let img = white_rgb(20, 20);
        let mut rng = StdRng::seed_from_u64(9);
        let out = pixel_dropout(&img, 0.3, &mut rng).unwrap().to_rgb8();
        assert!(out
            .pixels()
            .all(|p| p.0 == [0, 0, 0] || p.0 == [255, 255, 255]));
    }

    #[test]
    fn test_same_seed_same_mask() {
        let img = white_rgb(16, 16);
        let a = pixel_dropout(&img, 0.4, &mut StdRng::seed_from_u64(5)).unwrap();
        let b = pixel_dropout(&img, 0.4, &mut StdRng::seed_from_u64(5)).unwrap();
        assert_eq!(a.to_rgb8().into_raw(), b.to_rgb8().into_raw());
    }

    #[test]
    fn test_grayscale_stays_grayscale() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(4, 4, Luma([200])));
        let out = pixel_dropout(&img, 1.0, &mut StdRng::seed_from_u64(1)).unwrap();
        assert!(matches!(out, DynamicImage::ImageLuma8(_)));
    }

    #[test]
    fn test_rejects_bad_probability() {
        let img = white_rgb(2, 2);
        assert!(pixel_dropout(&img, 1.5, &mut StdRng::seed_from_u64(0)).is_err());
    }

    #[test]
    fn test_apply_dir_counts_failures() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        white_rgb(6, 6).save(input.path().join("cat.1.jpg")).unwrap();
        std::fs::write(input.path().join("dog.1.jpg"), b"not a jpeg").unwrap();
        std::fs::write(input.path().join("notes.txt"), b"skip me").unwrap();

        let out_dir = output.path().join("dropout_25");
        let mut seen = 0;
        let report =
            apply_pixel_dropout_dir(input.path(), &out_dir, 0.25, Some(42), || seen += 1).unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(seen, 2);
        assert!(out_dir.join("cat.1.jpg").exists());
    }
}
