//! Vector math utilities
//!
//! Dense `f64` helpers shared by the engine: dot products, norms, cosine
//! similarity with a zero-vector guard, and order-independent summation.

/// Dot product of two equal-length vectors. Mismatched lengths yield 0.0.
pub fn dot_product(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }
    let mut sum = CompensatedSum::default();
    for (x, y) in a.iter().zip(b.iter()) {
        sum.add(x * y);
    }
    sum.value()
}

/// Euclidean (L2) norm
pub fn l2_norm(v: &[f64]) -> f64 {
    dot_product(v, v).sqrt()
}

/// Cosine similarity between two vectors
///
/// Returns 0.0 when either vector is all zeros or the lengths differ, so the
/// result is never NaN.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }

    let norm_a = l2_norm(a);
    let norm_b = l2_norm(b);

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        (dot_product(a, b) / (norm_a * norm_b)).clamp(-1.0, 1.0)
    }
}

/// Scale `v` to unit length in place and return its original norm.
///
/// Zero vectors are left untouched.
pub fn normalize_vector(v: &mut [f64]) -> f64 {
    let norm = l2_norm(v);
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
    norm
}

/// Neumaier compensated summation
#[derive(Debug, Clone, Copy, Default)]
pub struct CompensatedSum {
    sum: f64,
    compensation: f64,
}

impl CompensatedSum {
    pub fn add(&mut self, value: f64) {
        let t = self.sum + value;
        if self.sum.abs() >= value.abs() {
            self.compensation += (self.sum - t) + value;
        } else {
            self.compensation += (value - t) + self.sum;
        }
        self.sum = t;
    }

    pub fn value(&self) -> f64 {
        self.sum + self.compensation
    }
}

/// Sum that does not depend on the order of `values`.
///
/// Values are sorted by `f64::total_cmp` before compensated summation, so any
/// permutation of the same multiset produces a bit-identical result.
pub fn stable_sum(values: impl IntoIterator<Item = f64>) -> f64 {
    let mut values: Vec<f64> = values.into_iter().collect();
    values.sort_by(|a, b| a.total_cmp(b));

    let mut sum = CompensatedSum::default();
    for value in values {
        sum.add(value);
    }
    sum.value()
}
