//! Distance and pairing helpers behind connection derivation.

use crate::id::EntityId;
use crate::model::Connection;
use kurbo::Point;

/// Order-independent key for an unordered endpoint pair.
///
/// `pair_key(a, b) == pair_key(b, a)` for all ids.
pub fn pair_key(a: EntityId, b: EntityId) -> String {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    format!("{}--{}", lo.as_str(), hi.as_str())
}

/// Build the connection record for two endpoints at the given positions.
///
/// Endpoints are normalised so that `source_id <= target_id`, which makes
/// the record identical whichever way round the pair is supplied.
pub fn measure(a: (EntityId, Point), b: (EntityId, Point), max_line_length: f64) -> Connection {
    let ((source_id, p), (target_id, q)) = if a.0 <= b.0 { (a, b) } else { (b, a) };
    let length = p.distance(q);
    Connection {
        id: pair_key(source_id, target_id),
        source_id,
        target_id,
        length,
        is_visible: length <= max_line_length,
        is_highlighted: false,
    }
}

/// Every unordered pair of `items`, in input order.
pub fn unordered_pairs<T: Copy>(items: &[T]) -> impl Iterator<Item = (T, T)> + '_ {
    items
        .iter()
        .enumerate()
        .flat_map(move |(i, &a)| items[i + 1..].iter().map(move |&b| (a, b)))
}
