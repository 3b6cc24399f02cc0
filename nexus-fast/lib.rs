pub mod error;
pub mod types;
pub mod utils;
pub mod pyramid;
pub mod corner_detection;
pub mod refinement;
pub mod detector;
pub mod builder;

// Re-export main types for easy access
pub use error::{FastError, FastResult};
pub use types::{ScoredKeypoint, ScaleLevel};
pub use detector::FastDetector;
pub use builder::DetectorBuilder;
pub use pyramid::{ImagePyramid, MIN_LEVEL_SIZE};
pub use corner_detection::{CornerDetector, FAST_ARC_LENGTH};
pub use refinement::KeypointRefinement;
