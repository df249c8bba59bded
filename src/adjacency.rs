// ===========================================================================
// Adjacency Resolver
// ===========================================================================
//
// For each segment end, find the other segment whose endpoint coincides with
// it. The policy is first match in enumeration order: networks are assumed to
// have simple junctions, so only one neighbour per end is recorded. At a
// multi-way junction (3+ segments on one location) the extra neighbours are
// dropped from the record; `neighbors_at` still exposes them and the resolver
// counts how many ends were affected.
//
// Scaling: the contract is that of a linear scan over all endpoints per end
// (O(n^2) for n segments). The R-tree in `EndpointIndex` makes the expected
// cost O(n log n) without changing any answer.
// ===========================================================================

use crate::endpoint_index::EndpointIndex;
use crate::models::{EndRole, Segment, SegmentIdx};
use itertools::Itertools;
use tracing::{debug, info};

/// Neighbours resolved for one segment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SegmentAdjacency {
    pub from: Option<SegmentIdx>,
    pub to: Option<SegmentIdx>,
}

impl SegmentAdjacency {
    pub fn at(&self, role: EndRole) -> Option<SegmentIdx> {
        match role {
            EndRole::Start => self.from,
            EndRole::End => self.to,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct AdjacencyResult {
    /// Indexed by arena position.
    pub adjacency: Vec<SegmentAdjacency>,
    pub multiway_ends: usize,
}

pub struct AdjacencyResolver<'a> {
    segments: &'a [Segment],
    index: &'a EndpointIndex,
    xy_tolerance: f64,
}

impl<'a> AdjacencyResolver<'a> {
    pub fn new(segments: &'a [Segment], index: &'a EndpointIndex, xy_tolerance: f64) -> Self {
        Self {
            segments,
            index,
            xy_tolerance,
        }
    }

    /// Every other segment touching `role` of `segment`, in enumeration order
    /// of the endpoint that matched. A segment touching the end with both of
    /// its own endpoints (a tiny loop) appears once.
    pub fn neighbors_at(&self, segment: SegmentIdx, role: EndRole) -> Vec<SegmentIdx> {
        let Some(coord) = self
            .segments
            .get(segment.0)
            .and_then(|s| s.endpoint(role))
        else {
            return Vec::new();
        };

        self.index
            .within(coord, self.xy_tolerance)
            .filter(|ep| ep.segment != segment)
            .map(|ep| ep.segment)
            .unique()
            .collect()
    }

    /// First coincident endpoint of another segment, if any.
    pub fn first_neighbor(&self, segment: SegmentIdx, role: EndRole) -> Option<SegmentIdx> {
        let coord = self.segments.get(segment.0)?.endpoint(role)?;
        self.index
            .within(coord, self.xy_tolerance)
            .find(|ep| ep.segment != segment)
            .map(|ep| ep.segment)
    }

    pub fn resolve(&self) -> AdjacencyResult {
        let mut result = AdjacencyResult {
            adjacency: vec![SegmentAdjacency::default(); self.segments.len()],
            multiway_ends: 0,
        };

        for (i, segment) in self.segments.iter().enumerate() {
            let idx = SegmentIdx(i);
            for role in EndRole::BOTH {
                let neighbors = self.neighbors_at(idx, role);
                let Some(&first) = neighbors.first() else {
                    continue;
                };

                if neighbors.len() > 1 {
                    result.multiway_ends += 1;
                    let dropped = neighbors[1..]
                        .iter()
                        .map(|n| self.segments[n.0].id.as_str())
                        .join(", ");
                    debug!(
                        "Segment {} {}: keeping {}, dropping {}",
                        segment.id, role, self.segments[first.0].id, dropped
                    );
                }

                match role {
                    EndRole::Start => result.adjacency[i].from = Some(first),
                    EndRole::End => result.adjacency[i].to = Some(first),
                }
            }

            if (i + 1) % 1000 == 0 {
                info!("Processed {} features for adjacency...", i + 1);
            }
        }

        result
    }
}
