use nexus_core::{Correspondence, FeatureSet, Region};

use crate::error::ScoreError;

/// Share of source keypoints that found a confident correspondence, 0-100.
///
/// The denominator is always the source count, so scoring A against B
/// generally differs from B against A.
pub fn score(correspondences: &[Correspondence], source_keypoints: usize) -> Result<f64, ScoreError> {
    if source_keypoints == 0 {
        return Err(ScoreError::DegenerateInput);
    }
    Ok(100.0 * correspondences.len() as f64 / source_keypoints as f64)
}

/// Bounding box of the candidate keypoints taking part in a correspondence
pub fn matched_region(correspondences: &[Correspondence], candidate: &FeatureSet) -> Option<Region> {
    let keypoints = candidate.keypoints();
    Region::enclosing(
        correspondences
            .iter()
            .filter_map(|c| keypoints.get(c.candidate_index))
            .map(|kp| (kp.x, kp.y)),
    )
}
