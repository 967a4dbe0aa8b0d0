use crate::protocol::EntityId;
use crate::vec::Vec2;
use crate::MAX_QUERY_RESULTS;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryHit {
    pub id: EntityId,
    pub pos: Vec2,
    pub distance: f32,
}

/// Collects candidates within `radius` of `origin`, capped at
/// `MAX_QUERY_RESULTS`. Candidates are taken in iteration order; callers
/// that need a deterministic cap feed an id-ordered iterator.
pub fn within_radius<I>(origin: Vec2, radius: f32, candidates: I) -> Vec<QueryHit>
where
    I: IntoIterator<Item = (EntityId, Vec2)>,
{
    let mut hits = Vec::new();
    for (id, pos) in candidates {
        if hits.len() >= MAX_QUERY_RESULTS {
            break;
        }
        let distance = origin.distance(pos);
        if distance <= radius {
            hits.push(QueryHit { id, pos, distance });
        }
    }
    hits
}

/// Deterministic nearest pick: smallest distance, ties broken by the lower
/// entity id.
pub fn nearest(hits: &[QueryHit]) -> Option<QueryHit> {
    hits.iter().copied().min_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(Ordering::Equal)
            .then(a.id.cmp(&b.id))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(points: &[(u32, f32, f32)]) -> Vec<(EntityId, Vec2)> {
        points
            .iter()
            .map(|&(id, x, y)| (EntityId(id), Vec2::new(x, y)))
            .collect()
    }

    #[test]
    fn test_filters_by_radius() {
        let hits = within_radius(
            Vec2::ZERO,
            5.0,
            candidates(&[(1, 3.0, 0.0), (2, 10.0, 0.0), (3, 0.0, 4.9)]),
        );
        let ids: Vec<_> = hits.iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![EntityId(1), EntityId(3)]);
    }

    #[test]
    fn test_result_count_is_capped() {
        let many: Vec<_> = (0..25).map(|i| (EntityId(i), Vec2::new(1.0, 0.0))).collect();
        let hits = within_radius(Vec2::ZERO, 5.0, many);
        assert_eq!(hits.len(), MAX_QUERY_RESULTS);
        // Iteration order fills the cap front to back.
        assert_eq!(hits[0].id, EntityId(0));
        assert_eq!(hits[9].id, EntityId(9));
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let hits = within_radius(Vec2::ZERO, 5.0, candidates(&[(1, 5.0, 0.0)]));
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_nearest_picks_smallest_distance() {
        let hits = within_radius(
            Vec2::ZERO,
            10.0,
            candidates(&[(1, 6.0, 0.0), (2, 2.0, 0.0), (3, 4.0, 0.0)]),
        );
        let hit = nearest(&hits).unwrap();
        assert_eq!(hit.id, EntityId(2));
    }

    #[test]
    fn test_nearest_tie_goes_to_lower_id() {
        let hits = within_radius(
            Vec2::ZERO,
            10.0,
            candidates(&[(9, 3.0, 0.0), (4, 0.0, 3.0), (7, -3.0, 0.0)]),
        );
        let hit = nearest(&hits).unwrap();
        assert_eq!(hit.id, EntityId(4));
    }

    #[test]
    fn test_nearest_of_empty_is_none() {
        assert_eq!(nearest(&[]), None);
    }
}
