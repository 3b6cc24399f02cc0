use nexus_core::{FeatureConfig, Image, Keypoint};
use crate::corner_detection::CornerDetector;
use crate::error::{FastError, FastResult};
use crate::pyramid::{ImagePyramid, MIN_LEVEL_SIZE};
use crate::refinement::KeypointRefinement;
use crate::types::{ScaleLevel, ScoredKeypoint};
use rayon::prelude::*;

/// Multi-scale FAST corner detector for one image size
#[derive(Debug, Clone)]
pub struct FastDetector {
    cfg: FeatureConfig,
    w: usize,
    h: usize,
    scale_levels: Vec<ScaleLevel>,
}

impl FastDetector {
    /// Creates a new FAST detector with validation
    pub fn new(cfg: FeatureConfig, width: usize, height: usize) -> FastResult<Self> {
        if width == 0 || height == 0 {
            return Err(FastError::InvalidImageSize { width, height });
        }

        if width < MIN_LEVEL_SIZE || height < MIN_LEVEL_SIZE {
            return Err(FastError::ImageTooSmall {
                width, height, min_size: MIN_LEVEL_SIZE
            });
        }

        Self::validate_config(&cfg)?;

        let scale_levels = ImagePyramid::generate_scale_levels(width, height, cfg.octaves, cfg.scale_factor);

        Ok(Self {
            cfg,
            w: width,
            h: height,
            scale_levels,
        })
    }

    /// Checks the size-independent parameters
    pub fn validate_config(cfg: &FeatureConfig) -> FastResult<()> {
        // 0 would detect everything, >127 could cause issues with u8 arithmetic
        if cfg.threshold == 0 || cfg.threshold > 127 {
            return Err(FastError::InvalidThreshold(cfg.threshold));
        }
        if cfg.patch_size % 2 == 0 || !(3..=63).contains(&cfg.patch_size) {
            return Err(FastError::InvalidPatchSize(cfg.patch_size));
        }
        if cfg.octaves == 0 || cfg.octaves > 16 {
            return Err(FastError::InvalidOctaves(cfg.octaves));
        }
        if !(cfg.scale_factor > 1.0) || !cfg.scale_factor.is_finite() {
            return Err(FastError::InvalidScaleFactor(cfg.scale_factor));
        }
        if !(cfg.nms_radius >= 0.0) || !cfg.nms_radius.is_finite() {
            return Err(FastError::InvalidNmsRadius(cfg.nms_radius));
        }
        Ok(())
    }

    /// Validates image data before processing
    fn validate_image(&self, img: &Image) -> FastResult<()> {
        let expected_len = self.w * self.h;
        if img.len() != expected_len {
            return Err(FastError::InvalidImageData {
                expected_len,
                actual_len: img.len(),
            });
        }
        Ok(())
    }

    /// Detect oriented keypoints across all pyramid levels, in base-image
    /// coordinates, strongest first
    pub fn detect_keypoints(&self, img: &Image) -> FastResult<Vec<Keypoint>> {
        let mut keypoints: Vec<Keypoint> = self
            .detect_keypoints_with_response(img)?
            .into_iter()
            .map(|sk| sk.keypoint)
            .collect();

        if self.cfg.max_keypoints > 0 && keypoints.len() > self.cfg.max_keypoints {
            keypoints.truncate(self.cfg.max_keypoints);
        }

        Ok(keypoints)
    }

    /// Detect keypoints across multiple scales with response scores
    pub fn detect_keypoints_with_response(&self, img: &Image) -> FastResult<Vec<ScoredKeypoint>> {
        self.validate_image(img)?;

        let pyramid = ImagePyramid::build_image_pyramid(img, self.w, self.h, &self.scale_levels);

        let per_level: Vec<Vec<ScoredKeypoint>> = self
            .scale_levels
            .par_iter()
            .zip(pyramid.par_iter())
            .map(|(scale_level, layer)| self.detect_keypoints_at_scale(layer, scale_level))
            .collect();

        let mut all_keypoints: Vec<ScoredKeypoint> = per_level.into_iter().flatten().collect();

        // Stable sort keeps level/row order among equal responses
        all_keypoints.sort_by(|a, b| b.response.partial_cmp(&a.response).unwrap_or(std::cmp::Ordering::Equal));

        Ok(all_keypoints)
    }

    /// Detect, suppress, refine and orient corners on one pyramid layer, then
    /// map them back to base-image coordinates
    pub fn detect_keypoints_at_scale(&self, layer: &Image, scale_level: &ScaleLevel) -> Vec<ScoredKeypoint> {
        let raw = CornerDetector::detect_keypoints_at_scale(layer, scale_level, self.cfg.threshold);
        let suppressed = KeypointRefinement::non_maximum_suppression(&raw, self.cfg.nms_radius);

        let x_ratio = self.w as f32 / scale_level.width as f32;
        let y_ratio = self.h as f32 / scale_level.height as f32;

        suppressed
            .into_iter()
            .map(|sk| {
                let mut kp = if self.cfg.subpixel_refinement {
                    KeypointRefinement::refine_keypoint_subpixel(layer, scale_level.width, scale_level.height, sk.keypoint)
                } else {
                    sk.keypoint
                };

                kp.angle = KeypointRefinement::compute_orientation(
                    layer,
                    scale_level.width,
                    scale_level.height,
                    kp.x,
                    kp.y,
                    self.cfg.patch_size,
                );
                kp.x *= x_ratio;
                kp.y *= y_ratio;

                ScoredKeypoint { keypoint: kp, response: sk.response }
            })
            .collect()
    }

    /// Get scale levels for this detector
    pub fn scale_levels(&self) -> &[ScaleLevel] {
        &self.scale_levels
    }

    /// Get detector configuration
    pub fn config(&self) -> &FeatureConfig {
        &self.cfg
    }

    /// Get image dimensions
    pub fn dimensions(&self) -> (usize, usize) {
        (self.w, self.h)
    }
}
