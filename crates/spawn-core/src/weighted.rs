//! The single weighted draw used by every selection stage.

use rand::Rng;

/// Picks one item with probability proportional to its weight.
///
/// Weights that are zero, negative or NaN are skipped. Returns `None` when no
/// item carries positive weight.
pub fn weighted_selection<'a, T, R, F>(items: &'a [T], rng: &mut R, weight: F) -> Option<&'a T>
where
    R: Rng + ?Sized,
    F: Fn(&T) -> f32,
{
    weighted_index(items, rng, weight).map(|index| &items[index])
}

/// Index form of [`weighted_selection`].
pub fn weighted_index<T, R, F>(items: &[T], rng: &mut R, weight: F) -> Option<usize>
where
    R: Rng + ?Sized,
    F: Fn(&T) -> f32,
{
    let weights: Vec<f64> = items
        .iter()
        .map(|item| {
            let w = weight(item) as f64;
            if w > 0.0 { w } else { 0.0 }
        })
        .collect();
    let total: f64 = weights.iter().sum();
    if !(total > 0.0) {
        return None;
    }

    let draw = rng.random::<f64>() * total;
    let mut running = 0.0;
    let mut last_positive = None;
    for (index, w) in weights.iter().enumerate() {
        if *w <= 0.0 {
            continue;
        }
        running += w;
        last_positive = Some(index);
        if running > draw {
            return Some(index);
        }
    }
    // Float accumulation can land just short of `total`.
    last_positive
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_all_zero_weights_select_nothing() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let items = [0.0f32, 0.0, 0.0];
        for _ in 0..100 {
            assert!(weighted_selection(&items, &mut rng, |w| *w).is_none());
        }
    }

    #[test]
    fn test_empty_selects_nothing() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let items: [f32; 0] = [];
        assert!(weighted_index(&items, &mut rng, |w| *w).is_none());
    }

    #[test]
    fn test_zero_weight_never_chosen() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let items = [("a", 0.0f32), ("b", 1.0), ("c", 0.0), ("d", -5.0)];
        for _ in 0..1_000 {
            let chosen = weighted_selection(&items, &mut rng, |(_, w)| *w).unwrap();
            assert_eq!(chosen.0, "b");
        }
    }

    #[test]
    fn test_distribution_converges_to_weights() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let weights = [1.0f32, 3.0, 6.0];
        let mut counts = [0usize; 3];
        let draws = 60_000;
        for _ in 0..draws {
            let index = weighted_index(&weights, &mut rng, |w| *w).unwrap();
            counts[index] += 1;
        }
        for (index, weight) in weights.iter().enumerate() {
            let expected = *weight as f64 / 10.0;
            let observed = counts[index] as f64 / draws as f64;
            assert!(
                (observed - expected).abs() < 0.01,
                "index {index}: expected {expected}, observed {observed}"
            );
        }
    }
}
