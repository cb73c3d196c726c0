//! Descriptor comparison.
//!
//! Pure computation: no I/O, no state. The [`Matcher`] trait is the seam for
//! alternative metrics or a future multi-candidate gallery search.

use crate::types::MatchVerdict;
use thiserror::Error;

/// Distance below which two descriptors are the same face.
pub const DEFAULT_THRESHOLD: f64 = 0.4;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    #[error("descriptor dimension mismatch: candidate has {candidate}, reference has {reference}")]
    DimensionMismatch { candidate: usize, reference: usize },
}

/// Strategy for comparing a candidate descriptor against an enrolled reference.
pub trait Matcher {
    fn compare(
        &self,
        candidate: &[f32],
        reference: &[f32],
        threshold: f64,
    ) -> Result<MatchVerdict, MatchError>;
}

/// Euclidean distance matcher with a strict `distance < threshold` decision.
#[derive(Debug, Clone, Copy, Default)]
pub struct EuclideanMatcher;

impl Matcher for EuclideanMatcher {
    fn compare(
        &self,
        candidate: &[f32],
        reference: &[f32],
        threshold: f64,
    ) -> Result<MatchVerdict, MatchError> {
        let distance = euclidean_distance(candidate, reference)?;
        Ok(MatchVerdict {
            is_match: distance < threshold,
            distance,
            confidence_percent: confidence_percent(distance),
        })
    }
}

/// `sqrt(sum((a_i - b_i)^2))`. Each difference is taken in f32, then squared
/// and summed in f64.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> Result<f64, MatchError> {
    if a.len() != b.len() {
        return Err(MatchError::DimensionMismatch {
            candidate: a.len(),
            reference: b.len(),
        });
    }

    let sum: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let diff = f64::from(*x - *y);
            diff * diff
        })
        .sum();
    Ok(sum.sqrt())
}

/// Map a distance to a percentage: `min(100, round2((1 - d) * 100))`.
///
/// Rounds half to even at two decimals. There is no lower bound, so any
/// distance above 1.0 gives a negative percentage. A NaN distance stays NaN.
pub fn confidence_percent(distance: f64) -> f64 {
    let percent = ((1.0 - distance) * 100.0 * 100.0).round_ties_even() / 100.0;
    // `f64::min` would turn NaN into 100.
    if percent > 100.0 {
        100.0
    } else {
        percent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DESCRIPTOR_LEN;
    use proptest::prelude::*;

    fn offset(first: f32) -> Vec<f32> {
        let mut v = vec![0.0f32; DESCRIPTOR_LEN];
        v[0] = first;
        v
    }

    #[test]
    fn test_distance_identical_is_zero() {
        let a: Vec<f32> = (0..DESCRIPTOR_LEN).map(|i| i as f32 * 0.01).collect();
        assert_eq!(euclidean_distance(&a, &a).unwrap(), 0.0);

        let v = EuclideanMatcher.compare(&a, &a, DEFAULT_THRESHOLD).unwrap();
        assert!(v.is_match);
        assert_eq!(v.confidence_percent, 100.0);
    }

    #[test]
    fn test_distance_known_value() {
        let a = vec![0.0, 0.0];
        let b = vec![3.0, 4.0];
        assert!((euclidean_distance(&a, &b).unwrap() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_dimension_mismatch() {
        let err = EuclideanMatcher
            .compare(&[0.0; 127], &[0.0; 128], DEFAULT_THRESHOLD)
            .unwrap_err();
        assert_eq!(
            err,
            MatchError::DimensionMismatch {
                candidate: 127,
                reference: 128
            }
        );
    }

    #[test]
    fn test_threshold_boundary_is_non_match() {
        let a = offset(0.0);
        let b = offset(0.25);
        let d = euclidean_distance(&a, &b).unwrap();

        let v = EuclideanMatcher.compare(&a, &b, d).unwrap();
        assert!(!v.is_match, "distance equal to threshold must not match");
        assert!(EuclideanMatcher.compare(&a, &b, d + 1e-9).unwrap().is_match);
    }

    #[test]
    fn test_distance_just_under_threshold_matches() {
        let v = EuclideanMatcher
            .compare(&offset(0.0), &offset(0.39), DEFAULT_THRESHOLD)
            .unwrap();
        assert!(v.is_match);
        assert_eq!(v.confidence_percent, 61.0);
    }

    #[test]
    fn test_distance_just_over_threshold_denies() {
        let v = EuclideanMatcher
            .compare(&offset(0.0), &offset(0.41), DEFAULT_THRESHOLD)
            .unwrap();
        assert!(!v.is_match);
        assert_eq!(v.confidence_percent, 59.0);
    }

    #[test]
    fn test_confidence_negative_for_far_descriptors() {
        let v = EuclideanMatcher
            .compare(&offset(0.0), &offset(1.5), DEFAULT_THRESHOLD)
            .unwrap();
        assert!(!v.is_match);
        assert_eq!(v.confidence_percent, -50.0);
    }

    #[test]
    fn test_confidence_rounding() {
        assert_eq!(confidence_percent(0.0), 100.0);
        assert_eq!(confidence_percent(0.5), 50.0);
        assert_eq!(confidence_percent(0.12344), 87.66);
        assert_eq!(confidence_percent(2.0), -100.0);
    }

    #[test]
    fn test_confidence_of_nan_distance_is_nan() {
        assert!(confidence_percent(f64::NAN).is_nan());
        assert_eq!(confidence_percent(f64::INFINITY), f64::NEG_INFINITY);
    }

    #[test]
    fn test_nan_component_never_matches() {
        let mut a = offset(0.0);
        a[3] = f32::NAN;
        let v = EuclideanMatcher.compare(&a, &offset(0.0), DEFAULT_THRESHOLD).unwrap();
        assert!(!v.is_match);
        assert!(v.distance.is_nan());
        assert!(v.confidence_percent.is_nan());
    }

    #[test]
    fn test_difference_taken_in_single_precision() {
        let (x, y) = (1.1f32, 0.3f32);
        let d = euclidean_distance(&[x], &[y]).unwrap();
        assert_eq!(d, f64::from(x - y));
    }

    fn descriptor() -> impl Strategy<Value = Vec<f32>> {
        prop::collection::vec(-1.0f32..1.0, DESCRIPTOR_LEN)
    }

    proptest! {
        #[test]
        fn prop_distance_symmetric(a in descriptor(), b in descriptor()) {
            prop_assert_eq!(
                euclidean_distance(&a, &b).unwrap(),
                euclidean_distance(&b, &a).unwrap()
            );
        }

        #[test]
        fn prop_self_distance_zero(a in descriptor()) {
            let v = EuclideanMatcher.compare(&a, &a, DEFAULT_THRESHOLD).unwrap();
            prop_assert_eq!(v.distance, 0.0);
            prop_assert!(v.is_match);
        }

        #[test]
        fn prop_match_iff_below_threshold(a in descriptor(), b in descriptor(), t in 0.0f64..25.0) {
            let v = EuclideanMatcher.compare(&a, &b, t).unwrap();
            prop_assert_eq!(v.is_match, v.distance < t);
        }

        #[test]
        fn prop_confidence_non_increasing(d1 in 0.0f64..30.0, d2 in 0.0f64..30.0) {
            let (near, far) = if d1 <= d2 { (d1, d2) } else { (d2, d1) };
            prop_assert!(confidence_percent(near) >= confidence_percent(far));
            prop_assert!(confidence_percent(near) <= 100.0);
        }
    }
}
