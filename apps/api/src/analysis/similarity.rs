//! Similarity — overlap statistics between two skill sets.

use crate::analysis::models::{SimilarityFeatures, SkillSet};

/// Computes the Jaccard index and overlap counts. Pure; an empty side yields
/// the all-zero features instead of dividing by zero.
pub fn compare(candidate: &SkillSet, job: &SkillSet) -> SimilarityFeatures {
    if candidate.is_empty() || job.is_empty() {
        return SimilarityFeatures::empty();
    }

    let common_skills: Vec<String> = candidate.intersection(job).cloned().collect();
    let total_union = candidate.union(job).count();
    let overlap_count = common_skills.len();

    let jaccard = overlap_count as f64 / total_union as f64;

    SimilarityFeatures {
        jaccard_index: round_2dp(jaccard),
        overlap_count,
        total_union,
        common_skills,
    }
}

fn round_2dp(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
