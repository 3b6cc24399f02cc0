#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use image::{GrayImage, Luma};
use nexus_scan::ScanConfig;

static COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Fresh directory under the system temp dir, removed on drop
pub struct TempDir(PathBuf);

impl TempDir {
    pub fn new(tag: &str) -> Self {
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!("nexus-{}-{}-{}", tag, std::process::id(), n));
        let _ = std::fs::remove_dir_all(&path);
        std::fs::create_dir_all(&path).unwrap();
        TempDir(path)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    pub fn join(&self, name: &str) -> PathBuf {
        self.0.join(name)
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

/// Box-smoothed LCG noise with a few solid blocks; every seed gives a
/// different, non-repeating texture
pub fn textured(width: u32, height: u32, seed: u32) -> GrayImage {
    let mut state = seed.wrapping_mul(2654435761).wrapping_add(1);
    let noise: Vec<u8> = (0..width * height)
        .map(|_| {
            state = state.wrapping_mul(1664525).wrapping_add(1013904223);
            (state >> 24) as u8
        })
        .collect();

    let at = |x: i64, y: i64| -> u32 {
        let x = x.clamp(0, width as i64 - 1) as u32;
        let y = y.clamp(0, height as i64 - 1) as u32;
        noise[(y * width + x) as usize] as u32
    };

    let mut img = GrayImage::from_fn(width, height, |x, y| {
        let (x, y) = (x as i64, y as i64);
        let mut sum = 0;
        for dy in -1..=1 {
            for dx in -1..=1 {
                sum += at(x + dx, y + dy);
            }
        }
        Luma([(sum / 9) as u8])
    });

    for i in 0..6u32 {
        state = state.wrapping_mul(1664525).wrapping_add(1013904223);
        let x0 = (state >> 8) % (width - 16);
        let y0 = (state >> 16) % (height - 16);
        let value = if i % 2 == 0 { 250 } else { 5 };
        for y in y0..y0 + 12 {
            for x in x0..x0 + 12 {
                img.put_pixel(x, y, Luma([value]));
            }
        }
    }
    img
}

pub fn write_textured(path: &Path, seed: u32) {
    textured(160, 120, seed).save(path).unwrap();
}

pub fn write_flat(path: &Path) {
    GrayImage::from_pixel(160, 120, Luma([128])).save(path).unwrap();
}

pub fn write_corrupt(path: &Path) {
    std::fs::write(path, b"definitely not a png").unwrap();
}

/// Default scan settings with a keypoint cap to keep matching quick
pub fn test_config() -> ScanConfig {
    let mut cfg = ScanConfig::default();
    cfg.detector.max_keypoints = 300;
    cfg.detector.n_threads = 2;
    cfg
}
