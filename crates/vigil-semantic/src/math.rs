//! Vector math for semantic scoring: L2 normalization and cosine distances.

use std::fmt;

/// Error type for vector math operations.
#[derive(Debug, PartialEq, Eq)]
pub enum MathError {
    /// A zero vector cannot be normalized.
    ZeroVector,
    /// The vector contains NaN or Inf components.
    NotFinite,
    /// Operand lengths differ.
    DimensionMismatch { expected: usize, got: usize },
}

impl fmt::Display for MathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MathError::ZeroVector => write!(f, "cannot normalize zero vector"),
            MathError::NotFinite => write!(f, "vector contains NaN or Inf"),
            MathError::DimensionMismatch { expected, got } => {
                write!(f, "dimension mismatch: expected {expected}, got {got}")
            }
        }
    }
}

impl std::error::Error for MathError {}

/// Rejects vectors containing NaN or Inf components.
pub fn validate_vector(v: &[f32]) -> Result<(), MathError> {
    if v.iter().any(|x| !x.is_finite()) {
        return Err(MathError::NotFinite);
    }
    Ok(())
}

/// L2 norm of a vector.
#[must_use]
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Returns an L2-normalized copy of `v`.
///
/// # Errors
///
/// Rejects zero vectors and vectors containing NaN/Inf.
pub fn l2_normalized(v: &[f32]) -> Result<Vec<f32>, MathError> {
    validate_vector(v)?;
    let norm = l2_norm(v);
    if norm == 0.0 {
        return Err(MathError::ZeroVector);
    }
    Ok(v.iter().map(|x| x / norm).collect())
}

/// Cosine similarity of two L2-normalized vectors (their dot product).
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, MathError> {
    if a.len() != b.len() {
        return Err(MathError::DimensionMismatch {
            expected: a.len(),
            got: b.len(),
        });
    }
    Ok(a.iter().zip(b.iter()).map(|(x, y)| x * y).sum())
}

/// Cosine distance mapped onto the unit interval.
///
/// For L2-normalized inputs the cosine lies in [-1, 1], so `(1 - cos) / 2`
/// lies in [0, 1]: 0 for identical direction, 1 for opposite. The clamp
/// absorbs float rounding at the boundaries.
pub fn unit_distance(a: &[f32], b: &[f32]) -> Result<f64, MathError> {
    let cos = f64::from(cosine_similarity(a, b)?);
    Ok(((1.0 - cos) / 2.0).clamp(0.0, 1.0))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_three_four_five() {
        let v = l2_normalized(&[3.0, 4.0]).unwrap();
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn zero_vector_rejected() {
        assert_eq!(l2_normalized(&[0.0, 0.0, 0.0]), Err(MathError::ZeroVector));
    }

    #[test]
    fn nan_and_inf_rejected() {
        assert_eq!(l2_normalized(&[1.0, f32::NAN]), Err(MathError::NotFinite));
        assert_eq!(
            l2_normalized(&[1.0, f32::INFINITY]),
            Err(MathError::NotFinite)
        );
    }

    #[test]
    fn cosine_of_axes() {
        let x = [1.0, 0.0];
        let y = [0.0, 1.0];
        assert!((cosine_similarity(&x, &x).unwrap() - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&x, &y).unwrap().abs() < 1e-6);
    }

    #[test]
    fn cosine_dimension_mismatch() {
        let result = cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]);
        assert_eq!(
            result,
            Err(MathError::DimensionMismatch {
                expected: 2,
                got: 3
            })
        );
    }

    #[test]
    fn unit_distance_spans_unit_interval() {
        let x = [1.0, 0.0];
        let y = [0.0, 1.0];
        let neg_x = [-1.0, 0.0];

        assert!(unit_distance(&x, &x).unwrap() < 1e-9);
        assert!((unit_distance(&x, &y).unwrap() - 0.5).abs() < 1e-9);
        assert!((unit_distance(&x, &neg_x).unwrap() - 1.0).abs() < 1e-9);
    }
}
