//! Vector arithmetic shared by the embedding index and the matchers.
//!
//! Kept free of any linear-algebra crate: the only model dependency lives in
//! the word encoder.

type Float = f32;

#[inline]
fn dot_product(vec1: &[Float], vec2: &[Float]) -> Float {
    vec1.iter().zip(vec2.iter()).map(|(a, b)| a * b).sum()
}

#[inline]
fn magnitude(vector: &[Float]) -> Float {
    vector.iter().map(|&x| x * x).sum::<Float>().sqrt()
}

/// Cosine similarity of two dense vectors. A zero-length operand yields 0.
pub fn cosine_similarity(vec_a: &[Float], vec_b: &[Float]) -> Float {
    let magnitude_a = magnitude(vec_a);
    let magnitude_b = magnitude(vec_b);
    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }
    dot_product(vec_a, vec_b) / (magnitude_a * magnitude_b)
}

/// Element-wise arithmetic mean of the given vectors.
///
/// Returns `None` for an empty input. All vectors are expected to share the
/// dimension of the first one; longer vectors are truncated to it.
pub fn mean_pool<'a, I>(vectors: I) -> Option<Vec<Float>>
where
    I: IntoIterator<Item = &'a [Float]>,
{
    let mut iter = vectors.into_iter();
    let first = iter.next()?;
    let mut sum = first.to_vec();
    let mut count = 1usize;

    for vector in iter {
        for (acc, value) in sum.iter_mut().zip(vector.iter()) {
            *acc += value;
        }
        count += 1;
    }

    let inv_count = 1.0 / count as Float;
    sum.iter_mut().for_each(|v| *v *= inv_count);
    Some(sum)
}
