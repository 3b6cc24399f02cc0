use nexus_core::FeatureConfig;
use crate::detector::FastDetector;
use crate::error::FastResult;

/// Fluent construction of a `FeatureConfig`, with named presets
#[derive(Debug, Clone, Default)]
pub struct DetectorBuilder {
    config: FeatureConfig,
}

impl DetectorBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration
    pub fn from_config(config: FeatureConfig) -> Self {
        Self { config }
    }

    /// Set the FAST threshold (1-127)
    pub fn threshold(mut self, threshold: u8) -> Self {
        self.config.threshold = threshold;
        self
    }

    /// Set the patch size for orientation calculation
    pub fn patch_size(mut self, patch_size: usize) -> Self {
        self.config.patch_size = patch_size;
        self
    }

    /// Set the number of threads for parallel processing; 0 uses every core
    pub fn threads(mut self, n_threads: usize) -> Self {
        self.config.n_threads = n_threads;
        self
    }

    pub fn octaves(mut self, octaves: usize) -> Self {
        self.config.octaves = octaves;
        self
    }

    pub fn scale_factor(mut self, scale_factor: f32) -> Self {
        self.config.scale_factor = scale_factor;
        self
    }

    /// Set the NMS radius
    pub fn nms_radius(mut self, radius: f32) -> Self {
        self.config.nms_radius = radius;
        self
    }

    /// Cap on keypoints per image; 0 keeps all
    pub fn max_keypoints(mut self, max_keypoints: usize) -> Self {
        self.config.max_keypoints = max_keypoints;
        self
    }

    /// Enable or disable subpixel refinement
    pub fn subpixel_refinement(mut self, enable: bool) -> Self {
        self.config.subpixel_refinement = enable;
        self
    }

    /// Few levels, high threshold, no refinement
    pub fn preset_fast(self) -> Self {
        self.threshold(40)
            .octaves(2)
            .scale_factor(1.5)
            .nms_radius(5.0)
            .max_keypoints(500)
            .subpixel_refinement(false)
    }

    /// The defaults
    pub fn preset_balanced(self) -> Self {
        let n_threads = self.config.n_threads;
        Self::from_config(FeatureConfig { n_threads, ..FeatureConfig::default() })
    }

    /// Dense keypoints over a deep pyramid
    pub fn preset_precision(self) -> Self {
        self.threshold(10)
            .octaves(8)
            .scale_factor(1.2)
            .nms_radius(2.0)
            .max_keypoints(2000)
            .subpixel_refinement(true)
    }

    /// Validate the configuration without binding it to an image size
    pub fn into_config(self) -> FastResult<FeatureConfig> {
        FastDetector::validate_config(&self.config)?;
        Ok(self.config)
    }

    /// Build a detector for images of the given size
    pub fn build(self, width: usize, height: usize) -> FastResult<FastDetector> {
        FastDetector::new(self.config, width, height)
    }

    /// One-line description of the configuration
    pub fn summary(&self) -> String {
        let c = &self.config;
        format!(
            "FAST-9 t={} patch={} octaves={}x{:.2} nms={:.1} max={} subpixel={} threads={}",
            c.threshold,
            c.patch_size,
            c.octaves,
            c.scale_factor,
            c.nms_radius,
            c.max_keypoints,
            c.subpixel_refinement,
            nexus_core::resolve_threads(c.n_threads),
        )
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FastError;

    #[test]
    fn builder_sets_fields() {
        let cfg = DetectorBuilder::new()
            .threshold(30)
            .patch_size(21)
            .octaves(5)
            .nms_radius(4.0)
            .max_keypoints(100)
            .subpixel_refinement(false)
            .into_config()
            .unwrap();
        assert_eq!(cfg.threshold, 30);
        assert_eq!(cfg.patch_size, 21);
        assert_eq!(cfg.octaves, 5);
        assert_eq!(cfg.nms_radius, 4.0);
        assert_eq!(cfg.max_keypoints, 100);
        assert!(!cfg.subpixel_refinement);
    }

    #[test]
    fn zero_threads_stays_machine_independent() {
        let builder = DetectorBuilder::new().threads(4).threads(0);
        assert_eq!(builder.config().n_threads, 0);
        assert!(!builder.summary().contains("threads=0"));
    }

    #[test]
    fn every_preset_caps_keypoints() {
        for builder in [
            DetectorBuilder::new().preset_fast(),
            DetectorBuilder::new().preset_balanced(),
            DetectorBuilder::new().preset_precision(),
        ] {
            let max = builder.config().max_keypoints;
            assert!(max > 0 && max <= 2000, "{}", builder.summary());
        }
    }

    #[test]
    fn presets_are_valid() {
        for builder in [
            DetectorBuilder::new().preset_fast(),
            DetectorBuilder::new().preset_balanced(),
            DetectorBuilder::new().preset_precision(),
        ] {
            assert!(builder.clone().into_config().is_ok(), "{}", builder.summary());
            assert!(builder.build(256, 256).is_ok());
        }
    }

    #[test]
    fn balanced_keeps_thread_count() {
        let cfg = DetectorBuilder::new().threads(3).preset_precision().preset_balanced().into_config().unwrap();
        assert_eq!(cfg.n_threads, 3);
        assert_eq!(cfg.threshold, FeatureConfig::default().threshold);
    }

    #[test]
    fn invalid_values_rejected_at_build() {
        let result = DetectorBuilder::new().patch_size(4).build(64, 64);
        assert!(matches!(result, Err(FastError::InvalidPatchSize(4))));
        let result = DetectorBuilder::new().scale_factor(0.5).into_config();
        assert!(matches!(result, Err(FastError::InvalidScaleFactor(_))));
    }
}
