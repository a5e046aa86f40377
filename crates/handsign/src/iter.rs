//! Iterator helpers.

/// Returns the index of the largest value yielded by `iter`.
///
/// Ties are resolved in favor of the *first* occurrence of the maximum. NaN values are skipped.
///
/// Returns [`None`] if `iter` yields no non-NaN value.
pub fn first_max_position<I: IntoIterator<Item = f32>>(iter: I) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, value) in iter.into_iter().enumerate() {
        if value.is_nan() {
            continue;
        }
        match best {
            Some((_, max)) if value <= max => {}
            _ => best = Some((i, value)),
        }
    }
    best.map(|(i, _)| i)
}
