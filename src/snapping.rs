// ===========================================================================
// Snapping Engine (dangle repair)
// ===========================================================================
//
// Moves line endpoints that fall just short of their junction onto it.
//
// Policy:
// - Point features are never moved. The engine only ever borrows them.
// - The nearest candidate wins (not the first found). Equal distances fall
//   back to the earliest candidate in enumeration order, never the last, so
//   ties resolve the same way adjacency does.
// - "Modified" means the geometry changed. An endpoint already sitting
//   exactly on its nearest candidate is left alone and not reported.
// - Exactly one target kind per run: point features, or the endpoints of
//   other lines. In point mode two dangling line ends are never snapped onto
//   each other.
// - Each endpoint is evaluated on its own; a failed start never blocks the end.
// - The pass is sequential. In line-end mode targets are read from the live
//   geometry, so two dangles converge on one spot instead of swapping places.
// ===========================================================================

use crate::coincidence::{distance, search_radius_2};
use crate::models::{EndRole, PointFeature, Segment, SegmentIdx, SkippedFeature};
use geo_types::Coord;
use ordered_float::OrderedFloat;
use rstar::RTree;
use rstar::primitives::GeomWithData;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// What dangling endpoints are allowed to snap onto.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapMode {
    /// Leave geometry untouched.
    Disabled,
    /// Snap onto the nearest point feature (manhole, cleanout, ...).
    #[default]
    PointFeatures,
    /// Snap onto the nearest endpoint of another line. Point features are
    /// not consulted in this mode.
    LineEndpoints,
}

impl FromStr for SnapMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "disabled" | "off" | "none" => Ok(SnapMode::Disabled),
            "point-features" | "point_features" | "points" => Ok(SnapMode::PointFeatures),
            "line-endpoints" | "line_endpoints" | "lines" => Ok(SnapMode::LineEndpoints),
            _ => Err(format!(
                "Unknown snap mode: '{}'. Valid options: disabled, point-features, line-endpoints",
                s
            )),
        }
    }
}

impl std::fmt::Display for SnapMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SnapMode::Disabled => "disabled",
            SnapMode::PointFeatures => "point-features",
            SnapMode::LineEndpoints => "line-endpoints",
        };
        write!(f, "{}", name)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SnapTarget {
    Point { point_id: String },
    LineEnd { segment_id: String, role: EndRole },
}

/// One endpoint that was moved.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapMove {
    pub role: EndRole,
    pub from: Coord<f64>,
    pub to: Coord<f64>,
    pub distance: f64,
    pub target: SnapTarget,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SnappedSegment {
    pub segment: SegmentIdx,
    pub moves: Vec<SnapMove>,
}

#[derive(Clone, Debug, Default)]
pub struct SnapReport {
    pub snapped: Vec<SnappedSegment>,
    pub skipped: Vec<SkippedFeature>,
}

impl SnapReport {
    pub fn modified_count(&self) -> usize {
        self.snapped.len()
    }

    pub fn is_modified(&self, segment: SegmentIdx) -> bool {
        self.snapped.iter().any(|s| s.segment == segment)
    }
}

/// A candidate under consideration, ordered by (distance, enumeration order).
#[derive(Clone, Copy, Debug)]
struct Candidate {
    coord: Coord<f64>,
    distance: f64,
    ordinal: usize,
}

fn nearest(candidates: impl Iterator<Item = Candidate>) -> Option<Candidate> {
    candidates.min_by_key(|c| (OrderedFloat(c.distance), c.ordinal))
}

pub struct SnappingEngine {
    mode: SnapMode,
    search_tolerance: f64,
}

impl SnappingEngine {
    pub fn new(mode: SnapMode, search_tolerance: f64) -> Self {
        Self {
            mode,
            search_tolerance,
        }
    }

    pub fn mode(&self) -> SnapMode {
        self.mode
    }

    /// Run one snapping pass over `segments`, rewriting endpoints in place.
    ///
    /// Malformed segments are skipped and reported; they are neither moved nor
    /// used as line-end targets.
    pub fn snap(&self, segments: &mut [Segment], points: &[PointFeature]) -> SnapReport {
        let mut report = SnapReport::default();

        let mut valid = vec![true; segments.len()];
        for (i, segment) in segments.iter().enumerate() {
            if let Err(e) = segment.validate() {
                warn!("Skipping segment during snapping: {}", e);
                report.skipped.push(SkippedFeature {
                    id: segment.id.clone(),
                    reason: e.to_string(),
                });
                valid[i] = false;
            }
        }

        match self.mode {
            SnapMode::Disabled => {}
            SnapMode::PointFeatures => self.snap_to_points(segments, &valid, points, &mut report),
            SnapMode::LineEndpoints => self.snap_to_line_ends(segments, &valid, &mut report),
        }

        info!(
            "Snapping ({}) modified {} of {} lines",
            self.mode,
            report.modified_count(),
            segments.len()
        );
        report
    }

    fn snap_to_points(
        &self,
        segments: &mut [Segment],
        valid: &[bool],
        points: &[PointFeature],
        report: &mut SnapReport,
    ) {
        let items = points
            .iter()
            .enumerate()
            .filter(|(_, p)| p.x.is_finite() && p.y.is_finite())
            .map(|(i, p)| GeomWithData::new([p.x, p.y], i))
            .collect();
        let tree: RTree<GeomWithData<[f64; 2], usize>> = RTree::bulk_load(items);
        let radius_2 = search_radius_2(self.search_tolerance);

        for (i, segment) in segments.iter_mut().enumerate() {
            if !valid[i] {
                continue;
            }

            let mut moves = Vec::new();
            for role in EndRole::BOTH {
                let Some(here) = segment.endpoint(role) else {
                    continue;
                };

                let found = nearest(
                    tree.locate_within_distance([here.x, here.y], radius_2)
                        .map(|item| Candidate {
                            coord: points[item.data].coord(),
                            distance: distance(here, points[item.data].coord()),
                            ordinal: item.data,
                        })
                        .filter(|c| c.distance <= self.search_tolerance),
                );

                match found {
                    Some(c) if c.distance > 0.0 => {
                        segment.set_endpoint(role, c.coord);
                        moves.push(SnapMove {
                            role,
                            from: here,
                            to: c.coord,
                            distance: c.distance,
                            target: SnapTarget::Point {
                                point_id: points[c.ordinal].id.clone(),
                            },
                        });
                    }
                    // Already on the target: nothing to write back.
                    Some(_) => {}
                    None => debug!("No snap found for {} of line {}", role, segment.id),
                }
            }

            if !moves.is_empty() {
                debug!("Line {} modified.", segment.id);
                report.snapped.push(SnappedSegment {
                    segment: SegmentIdx(i),
                    moves,
                });
            }
        }
    }

    fn snap_to_line_ends(&self, segments: &mut [Segment], valid: &[bool], report: &mut SnapReport) {
        // Ordinal = 2 * segment + role. Built on the positions before the
        // pass; a live endpoint is never more than one tolerance away from its
        // indexed position, so querying at twice the tolerance sees it.
        let items = segments
            .iter()
            .enumerate()
            .filter(|(i, _)| valid[*i])
            .flat_map(|(i, s)| {
                EndRole::BOTH.into_iter().filter_map(move |role| {
                    s.endpoint(role)
                        .map(|c| GeomWithData::new([c.x, c.y], end_ordinal(i, role)))
                })
            })
            .collect();
        let tree: RTree<GeomWithData<[f64; 2], usize>> = RTree::bulk_load(items);
        let radius_2 = search_radius_2(2.0 * self.search_tolerance);

        for i in 0..segments.len() {
            if !valid[i] {
                continue;
            }

            let mut moves = Vec::new();
            for role in EndRole::BOTH {
                let Some(here) = segments[i].endpoint(role) else {
                    continue;
                };

                let found = nearest(
                    tree.locate_within_distance([here.x, here.y], radius_2)
                        .filter(|item| item.data / 2 != i)
                        .filter_map(|item| {
                            let (j, other_role) = from_end_ordinal(item.data);
                            let coord = segments[j].endpoint(other_role)?;
                            Some(Candidate {
                                coord,
                                distance: distance(here, coord),
                                ordinal: item.data,
                            })
                        })
                        .filter(|c| c.distance <= self.search_tolerance),
                );

                match found {
                    Some(c) if c.distance > 0.0 => {
                        let (j, other_role) = from_end_ordinal(c.ordinal);
                        let target = SnapTarget::LineEnd {
                            segment_id: segments[j].id.clone(),
                            role: other_role,
                        };
                        segments[i].set_endpoint(role, c.coord);
                        moves.push(SnapMove {
                            role,
                            from: here,
                            to: c.coord,
                            distance: c.distance,
                            target,
                        });
                    }
                    Some(_) => {}
                    None => debug!("No snap found for {} of line {}", role, segments[i].id),
                }
            }

            if !moves.is_empty() {
                debug!("Line {} modified.", segments[i].id);
                report.snapped.push(SnappedSegment {
                    segment: SegmentIdx(i),
                    moves,
                });
            }
        }
    }
}

fn end_ordinal(segment: usize, role: EndRole) -> usize {
    match role {
        EndRole::Start => segment * 2,
        EndRole::End => segment * 2 + 1,
    }
}

fn from_end_ordinal(ordinal: usize) -> (usize, EndRole) {
    let role = if ordinal % 2 == 0 {
        EndRole::Start
    } else {
        EndRole::End
    };
    (ordinal / 2, role)
}
