/// Deterministically reduces `points` to at most `max` elements.
///
/// Inputs that already fit are returned unchanged. Otherwise every
/// `ceil(len / max)`-th element is kept, starting at index 0, in the
/// original order.
pub fn thin<T>(points: Vec<T>, max: usize) -> Vec<T> {
    if points.len() <= max {
        return points;
    }
    if max == 0 {
        return Vec::new();
    }

    let stride = points.len().div_ceil(max);
    points.into_iter().step_by(stride).collect()
}
