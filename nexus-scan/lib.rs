//! Content-based image search: extract features from a source image, match
//! them against every image in a directory and report the candidates whose
//! share of matched source keypoints passes a threshold.

pub mod error;
pub mod decode;
pub mod discovery;
pub mod extractor;
pub mod matcher;
pub mod scorer;
pub mod config;
pub mod events;
pub mod scan;

pub use nexus_core::{Correspondence, FeatureConfig, FeatureSet, Keypoint, MatchResult, Region, ScanProgress};

pub use config::ScanConfig;
pub use decode::load_image;
pub use discovery::list_images;
pub use error::{ConfigError, ExtractError, ScanError, ScanResult, ScoreError};
pub use events::{CancelToken, ScanEvent, ScanSink, ScanSummary};
pub use extractor::FeatureExtractor;
pub use matcher::{match_descriptors, DescriptorMatcher};
pub use scan::{compare_images, Comparison, ScanHandle, ScanOutcome, Scanner};
pub use scorer::{matched_region, score};
