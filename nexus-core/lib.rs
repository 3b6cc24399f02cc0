use std::path::PathBuf;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Row-major 8-bit grayscale image
pub type Image = Vec<u8>;

/// Length of a gradient-histogram descriptor: 4x4 cells, 8 orientation bins each
pub const DESCRIPTOR_LEN: usize = 128;

/// Float descriptor compared by Euclidean distance
pub type Descriptor = [f32; DESCRIPTOR_LEN];

/// Key-point ≙ FAST corner + orientation (radians), located in base-image coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Keypoint {
    pub x: f32,      // Subpixel x coordinate
    pub y: f32,      // Subpixel y coordinate
    pub angle: f32,
    /// Pyramid scale factor of the level the corner was found on (1.0 = base)
    pub scale: f32,
    pub octave: usize,
    pub response: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            angle: 0.0,
            scale: 1.0,
            octave: 0,
            response: 0.0,
        }
    }
}

/// Keypoints of one image paired index-for-index with their descriptors.
///
/// The pairing is fixed at construction, so `keypoints().len()` always
/// equals `descriptors().len()`.
#[derive(Debug, Clone, Default)]
pub struct FeatureSet {
    keypoints: Vec<Keypoint>,
    descriptors: Vec<Descriptor>,
}

impl FeatureSet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Pair keypoints with descriptors; `None` when the lengths disagree
    pub fn from_parts(keypoints: Vec<Keypoint>, descriptors: Vec<Descriptor>) -> Option<Self> {
        if keypoints.len() != descriptors.len() {
            return None;
        }
        Some(Self { keypoints, descriptors })
    }

    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (Keypoint, Descriptor)>,
    {
        let (keypoints, descriptors) = pairs.into_iter().unzip();
        Self { keypoints, descriptors }
    }

    pub fn keypoints(&self) -> &[Keypoint] {
        &self.keypoints
    }

    pub fn descriptors(&self) -> &[Descriptor] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    pub fn into_parts(self) -> (Vec<Keypoint>, Vec<Descriptor>) {
        (self.keypoints, self.descriptors)
    }
}

/// Tentative pairing of a source descriptor with its nearest candidate descriptor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correspondence {
    pub source_index: usize,
    pub candidate_index: usize,
    pub distance: f32,
}

/// Axis-aligned box in candidate pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Region {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Region {
    /// Smallest box enclosing every point, `None` for an empty iterator
    pub fn enclosing<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = (f32, f32)>,
    {
        points.into_iter().fold(None, |acc, (x, y)| {
            Some(match acc {
                None => Region { min_x: x, min_y: y, max_x: x, max_y: y },
                Some(r) => Region {
                    min_x: r.min_x.min(x),
                    min_y: r.min_y.min(y),
                    max_x: r.max_x.max(x),
                    max_y: r.max_y.max(y),
                },
            })
        })
    }

    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }
}

/// A candidate whose similarity exceeded the configured threshold
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MatchResult {
    pub path: PathBuf,
    /// Share of source keypoints with a confident correspondence, 0-100
    pub percentage: f64,
    pub region: Option<Region>,
}

/// Snapshot of a running scan after one candidate
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ScanProgress {
    pub current_name: String,
    /// 1-based position of `current_name` in the candidate list
    pub index: usize,
    pub total: usize,
    /// `None` when the candidate was skipped (decode or extraction failure)
    pub percentage: Option<f64>,
}

impl ScanProgress {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.index as f64 / self.total as f64
    }
}

/// Strongest-N cap applied by default; matching cost grows with the
/// product of source and candidate keypoint counts
pub const DEFAULT_MAX_KEYPOINTS: usize = 1000;

/// Feature detector parameters. Source and candidates must share one value
/// of this for their scores to be comparable.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FeatureConfig {
    /// FAST intensity threshold (1-127)
    pub threshold: u8,
    /// Patch size for orientation (odd)
    pub patch_size: usize,
    /// Worker threads; 0 uses every core of the machine running the scan
    pub n_threads: usize,
    /// Maximum number of pyramid levels
    pub octaves: usize,
    /// Downscale ratio between consecutive pyramid levels
    pub scale_factor: f32,
    /// Minimum distance between surviving corners after NMS
    pub nms_radius: f32,
    /// Keep the strongest N keypoints; 0 keeps all
    pub max_keypoints: usize,
    pub subpixel_refinement: bool,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            threshold: 20,
            patch_size: 15,
            n_threads: 0,
            octaves: 4,
            scale_factor: 1.2,
            nms_radius: 3.0,
            max_keypoints: DEFAULT_MAX_KEYPOINTS,
            subpixel_refinement: true,
        }
    }
}

/// Thread count `n_threads` stands for on this machine
pub fn resolve_threads(n_threads: usize) -> usize {
    if n_threads == 0 {
        num_cpus::get().max(1)
    } else {
        n_threads
    }
}

/// Initialize Rayon thread pool with the specified number of threads
pub fn init_thread_pool(n_threads: usize) -> Result<(), rayon::ThreadPoolBuildError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(resolve_threads(n_threads))
        .build_global()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_set_rejects_mismatched_lengths() {
        let kps = vec![Keypoint::new(1.0, 2.0), Keypoint::new(3.0, 4.0)];
        let descs = vec![[0.0; DESCRIPTOR_LEN]];
        assert!(FeatureSet::from_parts(kps, descs).is_none());
    }

    #[test]
    fn feature_set_pairs_stay_aligned() {
        let pairs = (0..5).map(|i| {
            let mut d = [0.0; DESCRIPTOR_LEN];
            d[0] = i as f32;
            (Keypoint::new(i as f32, 0.0), d)
        });
        let set = FeatureSet::from_pairs(pairs);
        assert_eq!(set.len(), 5);
        for (kp, d) in set.keypoints().iter().zip(set.descriptors()) {
            assert_eq!(kp.x, d[0]);
        }
    }

    #[test]
    fn region_encloses_points() {
        let r = Region::enclosing(vec![(3.0, 4.0), (1.0, 9.0), (5.0, 2.0)]).unwrap();
        assert_eq!(r, Region { min_x: 1.0, min_y: 2.0, max_x: 5.0, max_y: 9.0 });
        assert_eq!(r.width(), 4.0);
        assert!(Region::enclosing(Vec::new()).is_none());
    }

    #[test]
    fn default_config_is_portable_and_capped() {
        let cfg = FeatureConfig::default();
        assert_eq!(cfg.n_threads, 0);
        assert_eq!(cfg.max_keypoints, DEFAULT_MAX_KEYPOINTS);
        assert!(resolve_threads(cfg.n_threads) >= 1);
        assert_eq!(resolve_threads(3), 3);
    }

    #[test]
    fn progress_fraction() {
        let p = ScanProgress {
            current_name: "a.png".into(),
            index: 1,
            total: 4,
            percentage: Some(12.5),
        };
        assert_eq!(p.fraction(), 0.25);
    }
}
