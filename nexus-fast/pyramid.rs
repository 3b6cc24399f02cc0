use nexus_core::Image;
use crate::types::ScaleLevel;

/// Smallest pyramid level worth running the detector on
pub const MIN_LEVEL_SIZE: usize = 32;

/// Image pyramid operations for multi-scale feature detection
pub struct ImagePyramid;

impl ImagePyramid {
    /// Generate scale levels for image pyramid
    pub fn generate_scale_levels(width: usize, height: usize, octaves: usize, scale_factor: f32) -> Vec<ScaleLevel> {
        let mut levels = Vec::new();
        let mut current_scale = 1.0f32;

        for level in 0..octaves {
            let scaled_width = ((width as f32) / current_scale) as usize;
            let scaled_height = ((height as f32) / current_scale) as usize;

            // Stop when image becomes too small for meaningful detection
            if scaled_width < MIN_LEVEL_SIZE || scaled_height < MIN_LEVEL_SIZE {
                break;
            }

            levels.push(ScaleLevel {
                level,
                scale: current_scale,
                width: scaled_width,
                height: scaled_height,
            });

            current_scale *= scale_factor;
        }

        levels
    }

    /// Build image pyramid from base image
    pub fn build_image_pyramid(img: &Image, width: usize, height: usize, scale_levels: &[ScaleLevel]) -> Vec<Image> {
        scale_levels
            .iter()
            .map(|scale_level| {
                if scale_level.level == 0 {
                    img.clone()
                } else {
                    Self::downsample_image(img, width, height, scale_level.width, scale_level.height)
                }
            })
            .collect()
    }

    /// Downsample by box-averaging the source footprint of each target pixel
    fn downsample_image(img: &Image, src_width: usize, src_height: usize, target_width: usize, target_height: usize) -> Image {
        let x_ratio = src_width as f32 / target_width as f32;
        let y_ratio = src_height as f32 / target_height as f32;
        let mut downsampled = vec![0u8; target_width * target_height];

        for y in 0..target_height {
            let y0 = (y as f32 * y_ratio) as usize;
            let y1 = (((y + 1) as f32 * y_ratio).ceil() as usize).clamp(y0 + 1, src_height);
            for x in 0..target_width {
                let x0 = (x as f32 * x_ratio) as usize;
                let x1 = (((x + 1) as f32 * x_ratio).ceil() as usize).clamp(x0 + 1, src_width);

                let mut sum = 0u32;
                for yy in y0..y1 {
                    let row = &img[yy * src_width..(yy + 1) * src_width];
                    sum += row[x0..x1].iter().map(|&p| p as u32).sum::<u32>();
                }
                let count = ((y1 - y0) * (x1 - x0)) as u32;
                downsampled[y * target_width + x] = ((sum + count / 2) / count) as u8;
            }
        }

        downsampled
    }
}
