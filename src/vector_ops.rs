use crate::config::Number;
use wide::f64x4;

/// Cosine similarity of `a` and `b` using SIMD lanes of four.
///
/// Sums are kept in `f64` so that very small or very large components
/// neither vanish nor overflow. Returns `None` when the lengths differ and
/// `0.0` when either vector has zero magnitude.
pub fn compute_cosine_similarity_simd(a: &[Number], b: &[Number]) -> Option<Number> {
    if a.len() != b.len() {
        log::debug!("Vector length mismatch: {} vs {}", a.len(), b.len());
        return None;
    }

    let mut dot_product = f64x4::splat(0.0);
    let mut mag_a = f64x4::splat(0.0);
    let mut mag_b = f64x4::splat(0.0);

    let len = a.len();
    let simd_len = len - (len % 4);

    for (ca, cb) in a[..simd_len].chunks_exact(4).zip(b[..simd_len].chunks_exact(4)) {
        let va = f64x4::new(lanes(ca));
        let vb = f64x4::new(lanes(cb));
        dot_product += va * vb;
        mag_a += va * va;
        mag_b += vb * vb;
    }

    let mut scalar_dot_product = dot_product.reduce_add();
    let mut scalar_mag_a = mag_a.reduce_add();
    let mut scalar_mag_b = mag_b.reduce_add();

    // Handle remaining elements
    for i in simd_len..len {
        let (x, y) = (a[i] as f64, b[i] as f64);
        scalar_dot_product += x * y;
        scalar_mag_a += x * x;
        scalar_mag_b += y * y;
    }

    if scalar_mag_a == 0.0 || scalar_mag_b == 0.0 {
        return Some(0.0);
    }
    let similarity = scalar_dot_product / (scalar_mag_a.sqrt() * scalar_mag_b.sqrt());
    Some(similarity.clamp(-1.0, 1.0) as Number)
}

fn lanes(chunk: &[Number]) -> [f64; 4] {
    [chunk[0] as f64, chunk[1] as f64, chunk[2] as f64, chunk[3] as f64]
}

pub fn magnitude(vector: &[Number]) -> Number {
    vector.iter().map(|&x| (x as f64) * (x as f64)).sum::<f64>().sqrt() as Number
}

pub fn normalize_vector(vector: &mut [Number]) {
    let magnitude = magnitude(vector);
    if magnitude > 0.0 {
        for x in vector.iter_mut() {
            *x /= magnitude;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;

    fn scalar_cosine(a: &[Number], b: &[Number]) -> Number {
        let denom = magnitude(a) * magnitude(b);
        if denom == 0.0 {
            0.0
        } else {
            a.iter().zip(b).map(|(x, y)| x * y).sum::<Number>() / denom
        }
    }

    #[test]
    fn test_self_similarity_is_one() {
        let mut rng = StdRng::seed_from_u64(7);
        for len in [1usize, 3, 8, 13, 64, 1536] {
            let v: Vec<Number> = (0..len).map(|_| rng.gen_range(-1.0..1.0)).collect();
            let s = compute_cosine_similarity_simd(&v, &v).unwrap();
            assert!((s - 1.0).abs() < 1e-4, "len {} gave {}", len, s);
        }
    }

    #[test]
    fn test_zero_vector_similarity_is_zero() {
        let v = vec![0.3, -0.2, 0.9, 1.0, 0.0, 0.5, 0.1, 0.2, 0.7];
        let z = vec![0.0; v.len()];
        assert_eq!(compute_cosine_similarity_simd(&v, &z), Some(0.0));
        assert_eq!(compute_cosine_similarity_simd(&z, &z), Some(0.0));
    }

    #[test]
    fn test_orthogonal_and_opposite() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        let c = vec![-1.0, 0.0, 0.0];
        assert!(compute_cosine_similarity_simd(&a, &b).unwrap().abs() < 1e-6);
        assert!((compute_cosine_similarity_simd(&a, &c).unwrap() + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_simd_matches_scalar() {
        let mut rng = StdRng::seed_from_u64(42);
        for len in [5usize, 8, 17, 384] {
            let a: Vec<Number> = (0..len).map(|_| rng.gen_range(-1.0..1.0)).collect();
            let b: Vec<Number> = (0..len).map(|_| rng.gen_range(-1.0..1.0)).collect();
            let simd = compute_cosine_similarity_simd(&a, &b).unwrap();
            assert!((simd - scalar_cosine(&a, &b)).abs() < 1e-4);
        }
    }

    #[test]
    fn test_tiny_vector_is_not_treated_as_zero() {
        let v = vec![1e-4, 2e-4, 0.0];
        let s = compute_cosine_similarity_simd(&v, &v).unwrap();
        assert!((s - 1.0).abs() < 1e-6, "got {}", s);

        let w = vec![1e-30; 9];
        assert!((compute_cosine_similarity_simd(&w, &w).unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_large_components_do_not_overflow() {
        let v = vec![1e20, 1e20];
        let s = compute_cosine_similarity_simd(&v, &v).unwrap();
        assert!((s - 1.0).abs() < 1e-6, "got {}", s);

        let big: Vec<Number> = (0..11).map(|i| 1e30 * (i as Number + 1.0)).collect();
        let opposite: Vec<Number> = big.iter().map(|x| -x).collect();
        assert!((compute_cosine_similarity_simd(&big, &big).unwrap() - 1.0).abs() < 1e-6);
        assert!((compute_cosine_similarity_simd(&big, &opposite).unwrap() + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_length_mismatch() {
        assert_eq!(compute_cosine_similarity_simd(&[1.0, 2.0], &[1.0]), None);
    }

    #[test]
    fn test_normalize_vector() {
        let mut v = vec![3.0, 4.0];
        normalize_vector(&mut v);
        assert!((magnitude(&v) - 1.0).abs() < 1e-6);

        let mut z = vec![0.0, 0.0];
        normalize_vector(&mut z);
        assert_eq!(z, vec![0.0, 0.0]);
    }
}
