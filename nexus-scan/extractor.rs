use image::DynamicImage;
use log::debug;
use nexus_core::{FeatureConfig, FeatureSet, Image};
use nexus_descriptor::DescriptorGenerator;
use nexus_fast::{FastDetector, FastError, FastResult};

use crate::decode::to_gray;
use crate::error::ExtractError;

/// Keypoints plus descriptors for whole images. One instance holds the
/// detector parameters shared by a source and all its candidates.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    config: FeatureConfig,
}

impl FeatureExtractor {
    pub fn new(config: FeatureConfig) -> FastResult<Self> {
        FastDetector::validate_config(&config)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Extract features from a decoded image of any color type
    pub fn extract(&self, img: &DynamicImage) -> Result<FeatureSet, ExtractError> {
        let (pixels, w, h) = to_gray(img);
        self.extract_gray(&pixels, w, h)
    }

    /// Extract features from a row-major grayscale buffer.
    ///
    /// Images below the detector's minimum size yield an empty set.
    pub fn extract_gray(&self, pixels: &Image, width: usize, height: usize) -> Result<FeatureSet, ExtractError> {
        if width == 0 || height == 0 {
            return Err(ExtractError::EmptyImage);
        }

        let detector = match FastDetector::new(self.config.clone(), width, height) {
            Ok(detector) => detector,
            Err(FastError::ImageTooSmall { .. }) => {
                debug!("{}x{} image is below the detector minimum, no features", width, height);
                return Ok(FeatureSet::empty());
            }
            Err(e) => return Err(e.into()),
        };

        let keypoints = detector.detect_keypoints(pixels)?;
        if keypoints.is_empty() {
            return Ok(FeatureSet::empty());
        }

        let descriptors = DescriptorGenerator::new(width, height).generate_descriptors(pixels, &keypoints);
        Ok(FeatureSet::from_pairs(keypoints.into_iter().zip(descriptors)))
    }
}
