// ===========================================================================
// Junction Locator
// ===========================================================================
//
// Finds the point feature (manhole, cleanout, ...) sitting on a coincidence
// point. When several point features fall inside the search tolerance the
// first one in enumeration order is returned; there is no ranking.
// ===========================================================================

use crate::coincidence::{coincident, is_finite, search_radius_2};
use crate::error::TopologyError;
use crate::models::{PointFeature, SkippedFeature};
use geo_types::Coord;
use rstar::RTree;
use rstar::primitives::GeomWithData;
use tracing::warn;

pub struct JunctionLocator<'a> {
    points: &'a [PointFeature],
    tree: RTree<GeomWithData<[f64; 2], usize>>,
    skipped: Vec<SkippedFeature>,
}

impl<'a> JunctionLocator<'a> {
    /// Points with a non-finite coordinate are left out of the index and
    /// listed in [`JunctionLocator::skipped`].
    pub fn new(points: &'a [PointFeature]) -> Self {
        let mut items = Vec::with_capacity(points.len());
        let mut skipped = Vec::new();

        for (i, point) in points.iter().enumerate() {
            if !is_finite(point.coord()) {
                let err = TopologyError::InvalidPoint {
                    point_id: point.id.clone(),
                    x: point.x,
                    y: point.y,
                };
                warn!("Skipping point: {}", err);
                skipped.push(SkippedFeature {
                    id: point.id.clone(),
                    reason: err.to_string(),
                });
                continue;
            }
            items.push(GeomWithData::new([point.x, point.y], i));
        }

        Self {
            points,
            tree: RTree::bulk_load(items),
            skipped,
        }
    }

    pub fn skipped(&self) -> &[SkippedFeature] {
        &self.skipped
    }

    /// Enumeration positions of every point within `tolerance`, ascending.
    pub fn indices_within(&self, coord: Coord<f64>, tolerance: f64) -> Vec<usize> {
        let mut hits: Vec<usize> = self
            .tree
            .locate_within_distance([coord.x, coord.y], search_radius_2(tolerance))
            .map(|item| item.data)
            .filter(|&i| coincident(self.points[i].coord(), coord, tolerance))
            .collect();
        hits.sort_unstable();
        hits
    }

    /// The point feature at `coord`, if any.
    ///
    /// `Ok(None)` means nothing is there; `Err` means the lookup itself could
    /// not be performed.
    pub fn locate(
        &self,
        coord: Coord<f64>,
        tolerance: f64,
    ) -> Result<Option<&'a PointFeature>, TopologyError> {
        if !is_finite(coord) {
            return Err(TopologyError::InvalidQuery {
                x: coord.x,
                y: coord.y,
            });
        }

        let points = self.points;
        Ok(self
            .indices_within(coord, tolerance)
            .first()
            .map(|&i| &points[i]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manholes() -> Vec<PointFeature> {
        vec![
            PointFeature::new("MH-1", 0.0, 0.0, Some("Manhole")),
            PointFeature::new("MH-2", 5.0, 0.0, Some("Manhole")),
            PointFeature::new("CO-1", 5.0, 0.0, Some("Cleanout")),
            PointFeature::new("MH-3", 10.0, 0.0, None),
        ]
    }

    #[test]
    fn test_locate_exact() {
        let points = manholes();
        let locator = JunctionLocator::new(&points);
        let hit = locator.locate(Coord { x: 10.0, y: 0.0 }, 0.001).unwrap().unwrap();
        assert_eq!(hit.id, "MH-3");
        assert_eq!(hit.category, None);
    }

    #[test]
    fn test_first_found_on_multiple_matches() {
        let points = manholes();
        let locator = JunctionLocator::new(&points);
        let hit = locator.locate(Coord { x: 5.0, y: 0.0 }, 0.001).unwrap().unwrap();
        assert_eq!(hit.id, "MH-2");
        assert_eq!(hit.category.as_deref(), Some("Manhole"));
        assert_eq!(locator.indices_within(Coord { x: 5.0, y: 0.0 }, 0.001), vec![1, 2]);
    }

    #[test]
    fn test_no_match_is_not_an_error() {
        let points = manholes();
        let locator = JunctionLocator::new(&points);
        assert_eq!(locator.locate(Coord { x: 2.5, y: 0.0 }, 0.05), Ok(None));
    }

    #[test]
    fn test_tighter_tolerance_misses() {
        let points = manholes();
        let locator = JunctionLocator::new(&points);
        let near = Coord { x: 0.0004, y: 0.0 };
        assert!(locator.locate(near, 0.001).unwrap().is_some());
        assert!(locator.locate(near, 0.0001).unwrap().is_none());
    }

    #[test]
    fn test_non_finite_query_fails() {
        let points = manholes();
        let locator = JunctionLocator::new(&points);
        assert!(matches!(
            locator.locate(Coord { x: f64::NAN, y: 0.0 }, 0.1),
            Err(TopologyError::InvalidQuery { .. })
        ));
    }

    #[test]
    fn test_non_finite_points_skipped() {
        let points = vec![
            PointFeature::new("bad", f64::INFINITY, 0.0, None),
            PointFeature::new("good", 1.0, 1.0, None),
        ];
        let locator = JunctionLocator::new(&points);
        assert_eq!(locator.skipped().len(), 1);
        assert_eq!(locator.skipped()[0].id, "bad");
        let hit = locator.locate(Coord { x: 1.0, y: 1.0 }, 0.0).unwrap().unwrap();
        assert_eq!(hit.id, "good");
    }
}
