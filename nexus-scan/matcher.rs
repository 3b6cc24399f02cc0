use nexus_core::{Correspondence, Descriptor, FeatureSet};
use nexus_descriptor::euclidean_distance;
use rayon::prelude::*;

/// Default Lowe ratio
pub const DEFAULT_RATIO: f32 = 0.75;

/// Brute-force 2-nearest-neighbour matcher with a distance-ratio filter
#[derive(Debug, Clone, Copy)]
pub struct DescriptorMatcher {
    ratio: f32,
}

impl Default for DescriptorMatcher {
    fn default() -> Self {
        Self { ratio: DEFAULT_RATIO }
    }
}

impl DescriptorMatcher {
    pub fn new(ratio: f32) -> Self {
        Self { ratio }
    }

    pub fn ratio(&self) -> f32 {
        self.ratio
    }

    pub fn match_features(&self, source: &FeatureSet, candidate: &FeatureSet) -> Vec<Correspondence> {
        match_descriptors(source.descriptors(), candidate.descriptors(), self.ratio)
    }
}

/// For each source descriptor keep its nearest candidate descriptor when
/// `nearest < ratio * second_nearest`. Needs at least two candidate
/// descriptors; results come back in ascending source index.
pub fn match_descriptors(source: &[Descriptor], candidate: &[Descriptor], ratio: f32) -> Vec<Correspondence> {
    if candidate.len() < 2 {
        return Vec::new();
    }

    source
        .par_iter()
        .enumerate()
        .filter_map(|(source_index, query)| {
            let (candidate_index, nearest, second) = two_nearest(query, candidate);
            (nearest < ratio * second).then_some(Correspondence {
                source_index,
                candidate_index,
                distance: nearest,
            })
        })
        .collect()
}

/// Index and distance of the nearest entry, and distance of the runner-up
fn two_nearest(query: &Descriptor, candidates: &[Descriptor]) -> (usize, f32, f32) {
    let mut best = (0usize, f32::INFINITY);
    let mut second = f32::INFINITY;
    for (j, c) in candidates.iter().enumerate() {
        let d = euclidean_distance(query, c);
        if d < best.1 {
            second = best.1;
            best = (j, d);
        } else if d < second {
            second = d;
        }
    }
    (best.0, best.1, second)
}
