use std::cmp::Reverse;

use ordered_float::OrderedFloat;

use crate::error::ClassifyError;
use crate::mapping::Labels;

/// Scores strictly below this never reach a reply.
pub const CONFIDENCE_THRESHOLD: f32 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub score: f32,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub label: String,
    pub confidence: f32,
}

/// Normalizes a fixed-point output byte into [0, 1].
pub fn dequantize(byte: u8) -> f32 {
    byte as f32 / 255.0
}

/// Keeps outputs scoring at least `threshold`, best first. Equal scores
/// keep their output order.
pub fn filter_and_rank(output: &[u8], threshold: f32) -> Vec<Candidate> {
    let mut candidates = Vec::with_capacity(output.len());
    for (index, &byte) in output.iter().enumerate() {
        let score = dequantize(byte);
        if score < threshold {
            continue;
        }
        candidates.push(Candidate { score, index });
    }
    candidates.sort_by_key(|c| Reverse(OrderedFloat(c.score)));
    candidates
}

/// Joins ranked candidates with their labels.
pub fn attach_labels(
    candidates: &[Candidate],
    labels: &Labels,
) -> Result<Vec<Classification>, ClassifyError> {
    candidates
        .iter()
        .map(|c| {
            Ok(Classification {
                label: labels.get(c.index)?.to_string(),
                confidence: c.score,
            })
        })
        .collect()
}

pub fn postprocess(output: &[u8], labels: &Labels) -> Result<Vec<Classification>, ClassifyError> {
    attach_labels(&filter_and_rank(output, CONFIDENCE_THRESHOLD), labels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_low_scores_and_ranks_the_rest() {
        let labels = Labels::from(vec!["cat", "dog", "frog"]);
        let results = postprocess(&[10, 200, 240], &labels).unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].label, "frog");
        assert!((results[0].confidence - 0.941).abs() < 1e-3);
        assert_eq!(results[1].label, "dog");
        assert!((results[1].confidence - 0.784).abs() < 1e-3);
    }

    #[test]
    fn threshold_is_inclusive() {
        // 51 / 255 == 0.2 exactly, 50 / 255 is just below.
        let ranked = filter_and_rank(&[50, 51], CONFIDENCE_THRESHOLD);
        assert_eq!(ranked, vec![Candidate { score: dequantize(51), index: 1 }]);
    }

    #[test]
    fn ties_keep_output_order() {
        let ranked = filter_and_rank(&[100, 255, 100, 255], CONFIDENCE_THRESHOLD);
        let order: Vec<usize> = ranked.iter().map(|c| c.index).collect();
        assert_eq!(order, vec![1, 3, 0, 2]);
    }

    #[test]
    fn every_byte_pattern_yields_sorted_in_range_scores() {
        let output: Vec<u8> = (0..=255u8).rev().chain(0..=255u8).step_by(7).collect();
        let ranked = filter_and_rank(&output, CONFIDENCE_THRESHOLD);

        assert!(ranked.iter().all(|c| (CONFIDENCE_THRESHOLD..=1.0).contains(&c.score)));
        assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn index_past_catalog_is_an_error() {
        let labels = Labels::from(vec!["cat", "dog", "frog"]);
        let output = [0, 0, 0, 0, 0, 255];
        let err = postprocess(&output, &labels).unwrap_err();
        assert!(matches!(
            err,
            ClassifyError::LabelIndexOutOfRange { index: 5, len: 3 }
        ));
    }

    #[test]
    fn all_zero_output_is_empty() {
        let labels = Labels::from(vec!["a", "b"]);
        assert!(postprocess(&[0, 0], &labels).unwrap().is_empty());
    }
}
