use std::collections::HashMap;

use nexus_core::{Image, Keypoint};
use crate::types::ScoredKeypoint;

/// Non-maximum suppression, subpixel refinement and orientation
pub struct KeypointRefinement;

impl KeypointRefinement {
    /// Greedy NMS: strongest corners first, drop anything closer than
    /// `min_distance` to an accepted one. Ties keep input order.
    pub fn non_maximum_suppression(keypoints: &[ScoredKeypoint], min_distance: f32) -> Vec<ScoredKeypoint> {
        if keypoints.is_empty() {
            return Vec::new();
        }
        if min_distance <= 0.0 {
            return keypoints.to_vec();
        }

        let mut sorted_keypoints = keypoints.to_vec();
        sorted_keypoints.sort_by(|a, b| b.response.partial_cmp(&a.response).unwrap_or(std::cmp::Ordering::Equal));

        // Bucket accepted corners on a grid with cell = radius, so each
        // candidate only checks its 3x3 cell neighbourhood
        let cell = min_distance;
        let min_distance_sq = min_distance * min_distance;
        let mut grid: HashMap<(i64, i64), Vec<(f32, f32)>> = HashMap::new();
        let mut suppressed = Vec::new();

        for candidate in sorted_keypoints {
            let (x, y) = (candidate.keypoint.x, candidate.keypoint.y);
            let (cx, cy) = ((x / cell).floor() as i64, (y / cell).floor() as i64);

            let too_close = (-1..=1).any(|dy| {
                (-1..=1).any(|dx| {
                    grid.get(&(cx + dx, cy + dy)).is_some_and(|pts| {
                        pts.iter().any(|&(ax, ay)| {
                            let (ddx, ddy) = (x - ax, y - ay);
                            ddx * ddx + ddy * ddy < min_distance_sq
                        })
                    })
                })
            });

            if !too_close {
                grid.entry((cx, cy)).or_default().push((x, y));
                suppressed.push(candidate);
            }
        }

        suppressed
    }

    /// Refine keypoint to subpixel accuracy using quadratic surface fitting
    pub fn refine_keypoint_subpixel(img: &Image, width: usize, height: usize, kp: Keypoint) -> Keypoint {
        let x = kp.x as usize;
        let y = kp.y as usize;

        // Ensure we have enough border for 3x3 sampling
        if x < 1 || y < 1 || x + 1 >= width || y + 1 >= height {
            return kp;
        }

        let s = |xx: usize, yy: usize| img[yy * width + xx] as f32;

        // Finite differences of f(x,y) = Ax² + By² + Cxy + Dx + Ey + F
        let dx = (s(x + 1, y) - s(x - 1, y)) / 2.0;
        let dy = (s(x, y + 1) - s(x, y - 1)) / 2.0;
        let dxx = s(x + 1, y) - 2.0 * s(x, y) + s(x - 1, y);
        let dyy = s(x, y + 1) - 2.0 * s(x, y) + s(x, y - 1);
        let dxy = (s(x + 1, y + 1) - s(x - 1, y + 1) - s(x + 1, y - 1) + s(x - 1, y - 1)) / 4.0;

        let det = dxx * dyy - dxy * dxy;
        if det.abs() < 1e-6 {
            return kp;
        }

        let offset_x = (-(dyy * dx - dxy * dy) / det).clamp(-0.5, 0.5);
        let offset_y = (-(dxx * dy - dxy * dx) / det).clamp(-0.5, 0.5);

        Keypoint {
            x: kp.x + offset_x,
            y: kp.y + offset_y,
            ..kp
        }
    }

    /// Orientation by intensity centroid over a square patch; samples past
    /// the border are clamped to the nearest edge pixel
    pub fn compute_orientation(img: &Image, width: usize, height: usize, x: f32, y: f32, patch_size: usize) -> f32 {
        let half = (patch_size / 2) as i64;
        let (cx, cy) = (x.round() as i64, y.round() as i64);
        let mut m10 = 0i64;
        let mut m01 = 0i64;

        for dy in -half..=half {
            let yy = (cy + dy).clamp(0, height as i64 - 1) as usize;
            let row = &img[yy * width..(yy + 1) * width];
            for dx in -half..=half {
                let xx = (cx + dx).clamp(0, width as i64 - 1) as usize;
                let val = row[xx] as i64;
                m10 += dx * val;
                m01 += dy * val;
            }
        }

        (m01 as f32).atan2(m10 as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(x: f32, y: f32, response: f32) -> ScoredKeypoint {
        ScoredKeypoint {
            keypoint: Keypoint { response, ..Keypoint::new(x, y) },
            response,
        }
    }

    #[test]
    fn nms_keeps_strongest_of_cluster() {
        let kps = vec![scored(10.0, 10.0, 5.0), scored(11.0, 10.0, 9.0), scored(30.0, 30.0, 1.0)];
        let kept = KeypointRefinement::non_maximum_suppression(&kps, 3.0);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].keypoint.x, 11.0);
        assert_eq!(kept[1].keypoint.x, 30.0);
    }

    #[test]
    fn nms_enforces_minimum_distance() {
        let kps: Vec<_> = (0..20)
            .flat_map(|y| (0..20).map(move |x| scored(x as f32, y as f32, ((x * 7 + y * 13) % 17) as f32)))
            .collect();
        let kept = KeypointRefinement::non_maximum_suppression(&kps, 4.0);
        assert!(kept.len() < kps.len());
        for i in 0..kept.len() {
            for j in (i + 1)..kept.len() {
                let dx = kept[i].keypoint.x - kept[j].keypoint.x;
                let dy = kept[i].keypoint.y - kept[j].keypoint.y;
                assert!((dx * dx + dy * dy).sqrt() >= 4.0);
            }
        }
    }

    #[test]
    fn nms_with_zero_radius_is_identity() {
        let kps = vec![scored(1.0, 1.0, 1.0), scored(1.0, 1.0, 2.0)];
        assert_eq!(KeypointRefinement::non_maximum_suppression(&kps, 0.0).len(), 2);
    }

    #[test]
    fn subpixel_offset_is_bounded() {
        let width = 9;
        let img: Image = (0..81).map(|i| ((i % 9) * 20 + (i / 9) * 3) as u8).collect();
        let kp = Keypoint::new(4.0, 4.0);
        let refined = KeypointRefinement::refine_keypoint_subpixel(&img, width, 9, kp);
        assert!((refined.x - 4.0).abs() <= 0.5);
        assert!((refined.y - 4.0).abs() <= 0.5);
    }

    #[test]
    fn subpixel_leaves_border_points() {
        let img = vec![0u8; 16];
        let kp = Keypoint::new(0.0, 2.0);
        assert_eq!(KeypointRefinement::refine_keypoint_subpixel(&img, 4, 4, kp), kp);
    }

    #[test]
    fn orientation_points_toward_bright_side() {
        // Bright right half: centroid lies on +x, angle ~ 0
        let (w, h) = (21, 21);
        let mut img = vec![0u8; w * h];
        for y in 0..h {
            for x in 11..w {
                img[y * w + x] = 255;
            }
        }
        let angle = KeypointRefinement::compute_orientation(&img, w, h, 10.0, 10.0, 15);
        assert!(angle.abs() < 1e-3, "angle = {}", angle);

        // Bright bottom half: angle ~ +pi/2
        let mut img = vec![0u8; w * h];
        for y in 11..h {
            for x in 0..w {
                img[y * w + x] = 255;
            }
        }
        let angle = KeypointRefinement::compute_orientation(&img, w, h, 10.0, 10.0, 15);
        assert!((angle - std::f32::consts::FRAC_PI_2).abs() < 1e-3);
    }
}
