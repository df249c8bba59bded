// ===========================================================================
// Endpoint Index
// ===========================================================================
//
// Flat list of every segment endpoint, two per segment, in enumeration order
// (segment order, start before end). Coincident endpoints from different
// segments stay distinct entries, told apart by (segment, role).
//
// An R-tree over the same entries narrows candidate lookups. Every query
// re-sorts its hits by ordinal, so callers see exactly what a linear scan of
// `entries()` would have produced.
// ===========================================================================

use crate::coincidence::{coincident, search_radius_2};
use crate::models::{EndRole, Segment, SegmentIdx};
use geo_types::Coord;
use rstar::RTree;
use rstar::primitives::GeomWithData;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Endpoint {
    pub segment: SegmentIdx,
    pub role: EndRole,
    pub coord: Coord<f64>,
}

pub struct EndpointIndex {
    entries: Vec<Endpoint>,
    tree: RTree<GeomWithData<[f64; 2], usize>>,
}

impl EndpointIndex {
    /// Build the index over a frozen snapshot of segments. Segments with
    /// fewer than two vertices contribute nothing; the engine filters those
    /// out before getting here.
    pub fn build(segments: &[Segment]) -> Self {
        let mut entries = Vec::with_capacity(segments.len() * 2);
        for (idx, segment) in segments.iter().enumerate() {
            if segment.vertices.len() < 2 {
                continue;
            }
            for role in EndRole::BOTH {
                if let Some(coord) = segment.endpoint(role) {
                    entries.push(Endpoint {
                        segment: SegmentIdx(idx),
                        role,
                        coord,
                    });
                }
            }
        }

        let items = entries
            .iter()
            .enumerate()
            .map(|(ordinal, ep)| GeomWithData::new([ep.coord.x, ep.coord.y], ordinal))
            .collect();

        Self {
            entries,
            tree: RTree::bulk_load(items),
        }
    }

    pub fn entries(&self) -> &[Endpoint] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ordinals of every endpoint coincident with `coord`, ascending.
    pub fn ordinals_within(&self, coord: Coord<f64>, tolerance: f64) -> Vec<usize> {
        let mut hits: Vec<usize> = self
            .tree
            .locate_within_distance([coord.x, coord.y], search_radius_2(tolerance))
            .map(|item| item.data)
            .filter(|&ordinal| coincident(self.entries[ordinal].coord, coord, tolerance))
            .collect();
        hits.sort_unstable();
        hits
    }

    /// Endpoints coincident with `coord`, in enumeration order.
    pub fn within(&self, coord: Coord<f64>, tolerance: f64) -> impl Iterator<Item = &Endpoint> {
        self.ordinals_within(coord, tolerance)
            .into_iter()
            .map(move |ordinal| &self.entries[ordinal])
    }
}
