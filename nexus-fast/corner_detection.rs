use nexus_core::{Image, Keypoint};
use crate::types::{ScoredKeypoint, ScaleLevel};
use crate::utils::has_contiguous_arc;
use rayon::prelude::*;

/// FAST-9: a corner needs 9 contiguous circle pixels on one side of the center
pub const FAST_ARC_LENGTH: usize = 9;

/// Border the 16-pixel circle needs around a tested pixel
pub const FAST_BORDER: usize = 3;

/// Segment-test corner detection
pub struct CornerDetector;

impl CornerDetector {
    /// FAST circle offsets for corner detection
    pub const FAST_OFFSETS: [(i32, i32); 16] = [
        (0, -3), (1, -3), (2, -2), (3, -1),
        (3, 0), (3, 1), (2, 2), (1, 3),
        (0, 3), (-1, 3), (-2, 2), (-3, 1),
        (-3, 0), (-3, -1), (-2, -2), (-1, -3),
    ];

    /// Detect corners on one pyramid layer, rows in parallel.
    /// Coordinates are in the layer's own pixel grid.
    pub fn detect_keypoints_at_scale(img: &Image, scale_level: &ScaleLevel, threshold: u8) -> Vec<ScoredKeypoint> {
        let width = scale_level.width;
        let height = scale_level.height;
        if width <= 2 * FAST_BORDER || height <= 2 * FAST_BORDER {
            return Vec::new();
        }

        (FAST_BORDER..height - FAST_BORDER)
            .into_par_iter()
            .flat_map_iter(|y| {
                let mut row = Vec::new();
                for x in FAST_BORDER..width - FAST_BORDER {
                    if let Some(response) = Self::segment_test(img, width, x, y, threshold) {
                        row.push(ScoredKeypoint {
                            keypoint: Keypoint {
                                octave: scale_level.level,
                                scale: scale_level.scale,
                                response,
                                ..Keypoint::new(x as f32, y as f32)
                            },
                            response,
                        });
                    }
                }
                row
            })
            .collect()
    }

    /// Full 16-pixel segment test. Returns the corner score: the summed
    /// intensity excess over the threshold on the side holding the arc.
    pub(crate) fn segment_test(img: &Image, width: usize, x: usize, y: usize, threshold: u8) -> Option<f32> {
        let center = img[y * width + x] as i32;
        let t = threshold as i32;

        // Cardinal pixels first: FAST-9 needs at least two of 0/4/8/12 on one side
        let cardinal = [0usize, 4, 8, 12].map(|i| Self::circle_pixel(img, width, x, y, i));
        let bright_cardinal = cardinal.iter().filter(|&&q| q > center + t).count();
        let dark_cardinal = cardinal.iter().filter(|&&q| q < center - t).count();
        if bright_cardinal < 2 && dark_cardinal < 2 {
            return None;
        }

        let mut bright_mask = 0u16;
        let mut dark_mask = 0u16;
        let mut bright_sum = 0i32;
        let mut dark_sum = 0i32;
        for i in 0..16 {
            let q = Self::circle_pixel(img, width, x, y, i);
            if q > center + t {
                bright_mask |= 1 << i;
                bright_sum += q - center - t;
            } else if q < center - t {
                dark_mask |= 1 << i;
                dark_sum += center - q - t;
            }
        }

        if has_contiguous_arc(bright_mask, FAST_ARC_LENGTH) {
            Some(bright_sum as f32)
        } else if has_contiguous_arc(dark_mask, FAST_ARC_LENGTH) {
            Some(dark_sum as f32)
        } else {
            None
        }
    }

    #[inline]
    fn circle_pixel(img: &Image, width: usize, x: usize, y: usize, i: usize) -> i32 {
        let (dx, dy) = Self::FAST_OFFSETS[i];
        let xx = (x as i32 + dx) as usize;
        let yy = (y as i32 + dy) as usize;
        img[yy * width + xx] as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(width: usize, height: usize) -> ScaleLevel {
        ScaleLevel { level: 0, scale: 1.0, width, height }
    }

    fn square_image(width: usize, height: usize) -> Image {
        let mut img = vec![40u8; width * height];
        for y in height / 4..height / 2 {
            for x in width / 4..width / 2 {
                img[y * width + x] = 220;
            }
        }
        img
    }

    #[test]
    fn flat_image_has_no_corners() {
        let img = vec![128u8; 40 * 40];
        assert!(CornerDetector::detect_keypoints_at_scale(&img, &level(40, 40), 20).is_empty());
    }

    #[test]
    fn square_corners_are_found() {
        let img = square_image(48, 48);
        let kps = CornerDetector::detect_keypoints_at_scale(&img, &level(48, 48), 20);
        assert!(!kps.is_empty());
        // Every detection lies near one of the four square corners
        let corners = [(12.0, 12.0), (23.0, 12.0), (12.0, 23.0), (23.0, 23.0)];
        for sk in &kps {
            let near = corners.iter().any(|&(cx, cy): &(f32, f32)| {
                (sk.keypoint.x - cx).abs() <= 3.0 && (sk.keypoint.y - cy).abs() <= 3.0
            });
            assert!(near, "unexpected corner at ({}, {})", sk.keypoint.x, sk.keypoint.y);
            assert!(sk.response > 0.0);
        }
    }

    #[test]
    fn straight_edge_is_not_a_corner() {
        let mut img = vec![30u8; 40 * 40];
        for y in 0..40 {
            for x in 20..40 {
                img[y * 40 + x] = 200;
            }
        }
        let kps = CornerDetector::detect_keypoints_at_scale(&img, &level(40, 40), 20);
        assert!(kps.is_empty());
    }

    #[test]
    fn segment_test_scores_excess_over_threshold() {
        // Single bright pixel on black: every circle pixel is 200 past the threshold
        let mut img = vec![0u8; 16 * 16];
        img[8 * 16 + 8] = 220;
        assert_eq!(CornerDetector::segment_test(&img, 16, 8, 8, 20), Some(16.0 * 200.0));
        assert_eq!(CornerDetector::segment_test(&img, 16, 5, 8, 20), None);
    }

    #[test]
    fn tiny_layer_is_skipped() {
        let img = vec![0u8; 6 * 6];
        assert!(CornerDetector::detect_keypoints_at_scale(&img, &level(6, 6), 20).is_empty());
    }
}
