use nexus_core::{Descriptor, Image, Keypoint, DESCRIPTOR_LEN};
use rayon::prelude::*;

/// Samples per side of the descriptor window
const GRID: usize = 16;
/// Spatial cells per side
const CELLS: usize = 4;
const SAMPLES_PER_CELL: usize = GRID / CELLS;
const ORIENTATION_BINS: usize = 8;
/// Per-component cap applied before the second normalisation
const CLIP: f32 = 0.2;

/// Builds 4x4x8 gradient-orientation histograms around keypoints.
///
/// The 16x16 sampling window is centred on the keypoint, spaced by
/// `kp.scale` base-image pixels and rotated by `kp.angle`, so the same
/// structure seen at another scale or rotation yields a similar vector.
/// Gradients are measured along the rotated axes.
pub struct DescriptorGenerator {
    w: usize,
    h: usize,
}

impl DescriptorGenerator {
    pub fn new(width: usize, height: usize) -> Self {
        assert!(width > 0 && height > 0);
        Self { w: width, h: height }
    }

    /// One descriptor per keypoint, same order
    pub fn generate_descriptors(&self, img: &Image, kps: &[Keypoint]) -> Vec<Descriptor> {
        kps.par_iter().map(|kp| self.describe(img, kp)).collect()
    }

    fn describe(&self, img: &Image, kp: &Keypoint) -> Descriptor {
        let (s, c) = kp.angle.sin_cos();
        let step = kp.scale.max(1.0);
        // Rotated unit axes, scaled to one sample step
        let (ax, ay) = (c * step, s * step);
        let (bx, by) = (-s * step, c * step);

        let half = GRID as f32 / 2.0;
        let sigma_sq2 = 2.0 * half * half;
        let mut hist = [0.0f32; DESCRIPTOR_LEN];

        for j in 0..GRID {
            let v = j as f32 - half + 0.5;
            for i in 0..GRID {
                let u = i as f32 - half + 0.5;
                let px = kp.x + u * ax + v * bx;
                let py = kp.y + u * ay + v * by;

                let gx = self.bilinear_sample(img, px + ax, py + ay) - self.bilinear_sample(img, px - ax, py - ay);
                let gy = self.bilinear_sample(img, px + bx, py + by) - self.bilinear_sample(img, px - bx, py - by);
                let magnitude = (gx * gx + gy * gy).sqrt();
                if magnitude == 0.0 {
                    continue;
                }

                let weight = (-(u * u + v * v) / sigma_sq2).exp();
                let mut theta = gy.atan2(gx);
                if theta < 0.0 {
                    theta += std::f32::consts::TAU;
                }

                // Split linearly between the two nearest orientation bins
                let bin_f = theta / std::f32::consts::TAU * ORIENTATION_BINS as f32;
                let b0 = bin_f.floor();
                let frac = bin_f - b0;
                let b0 = (b0 as usize) % ORIENTATION_BINS;
                let b1 = (b0 + 1) % ORIENTATION_BINS;

                let cell = (j / SAMPLES_PER_CELL) * CELLS + i / SAMPLES_PER_CELL;
                let base = cell * ORIENTATION_BINS;
                hist[base + b0] += magnitude * weight * (1.0 - frac);
                hist[base + b1] += magnitude * weight * frac;
            }
        }

        normalize_clipped(&mut hist);
        hist
    }

    /// Bilinear interpolation for subpixel sampling, edge pixels extended
    /// outward
    fn bilinear_sample(&self, img: &Image, x: f32, y: f32) -> f32 {
        let max_x = (self.w - 1) as f32;
        let max_y = (self.h - 1) as f32;
        let x = x.clamp(0.0, max_x);
        let y = y.clamp(0.0, max_y);

        let x0 = x.floor();
        let y0 = y.floor();
        let dx = x - x0;
        let dy = y - y0;

        let x0_idx = x0 as usize;
        let y0_idx = y0 as usize;
        let x1_idx = (x0_idx + 1).min(self.w - 1);
        let y1_idx = (y0_idx + 1).min(self.h - 1);

        let p00 = img[y0_idx * self.w + x0_idx] as f32;
        let p10 = img[y0_idx * self.w + x1_idx] as f32;
        let p01 = img[y1_idx * self.w + x0_idx] as f32;
        let p11 = img[y1_idx * self.w + x1_idx] as f32;

        let top = p00 * (1.0 - dx) + p10 * dx;
        let bottom = p01 * (1.0 - dx) + p11 * dx;

        top * (1.0 - dy) + bottom * dy
    }
}

/// L2-normalise, cap each component at `CLIP`, normalise again.
/// A zero vector stays zero.
fn normalize_clipped(hist: &mut Descriptor) {
    if !normalize(hist) {
        return;
    }
    for v in hist.iter_mut() {
        *v = v.min(CLIP);
    }
    normalize(hist);
}

fn normalize(hist: &mut Descriptor) -> bool {
    let norm = hist.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm <= f32::EPSILON {
        hist.iter_mut().for_each(|v| *v = 0.0);
        return false;
    }
    hist.iter_mut().for_each(|v| *v /= norm);
    true
}

/// Euclidean distance between two descriptors
#[inline]
pub fn euclidean_distance(a: &Descriptor, b: &Descriptor) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum::<f32>()
        .sqrt()
}
