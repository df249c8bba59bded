// ===========================================================================
// Batch engine
// ===========================================================================
//
// One run over a snapshot of the line and point layers:
//
// 1. Validate geometry; malformed segments are reported and dropped.
// 2. Snap dangling endpoints (sequential, mutates only line geometry).
// 3. Freeze the repaired geometry and build the endpoint index.
// 4. Resolve from/to adjacency.
// 5. Look up the junction point at each segment end.
// 6. Connectivity roll-up between lines and points.
// 7. Derive direction and materials, assemble output rows.
//
// Snapping always finishes before the index is built, so adjacency never
// observes a half-snapped network. The engine holds no state between runs.
// ===========================================================================

use crate::adjacency::AdjacencyResolver;
use crate::config::EngineConfig;
use crate::connectivity;
use crate::direction::direction_of;
use crate::endpoint_index::EndpointIndex;
use crate::error::ConfigError;
use crate::junctions::JunctionLocator;
use crate::materials::{PipeTypeCode, material_source};
use crate::models::{
    AdjacencyRecord, BatchReport, EndRole, PointFeature, Segment, SegmentOutput, SkippedFeature,
};
use crate::snapping::{SnapMode, SnappingEngine};
use tracing::{info, warn};

pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn pipe_type_value<'s>(&self, segment: &'s Segment) -> Option<&'s serde_json::Value> {
        segment.attributes.get(&self.config.pipe_type_field)
    }

    pub fn run(&self, segments: Vec<Segment>, points: &[PointFeature]) -> BatchReport {
        let mut report = BatchReport::default();

        // 1. Validation
        let mut network: Vec<Segment> = Vec::with_capacity(segments.len());
        for segment in segments {
            match segment.validate() {
                Ok(()) => network.push(segment),
                Err(e) => {
                    warn!("Skipping segment: {}", e);
                    report.skipped_segments.push(SkippedFeature {
                        id: segment.id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        info!(
            "Read {} valid segments ({} skipped) and {} points.",
            network.len(),
            report.skipped_segments.len(),
            points.len()
        );

        // 2. Snapping
        let snaps = if self.config.snap_mode == SnapMode::Disabled {
            Default::default()
        } else {
            SnappingEngine::new(self.config.snap_mode, self.config.search_tolerance)
                .snap(&mut network, points)
        };
        report.modified_segment_count = snaps.modified_count();

        // 3..5. Geometry is frozen from here on.
        let index = EndpointIndex::build(&network);
        let adjacency =
            AdjacencyResolver::new(&network, &index, self.config.xy_tolerance).resolve();
        report.multiway_junction_ends = adjacency.multiway_ends;

        let locator = JunctionLocator::new(points);
        report.skipped_points = locator.skipped().to_vec();

        // 6. Connectivity
        let connections = connectivity::connect(
            &network,
            points,
            self.config.connection_tolerance,
            self.config.point_value_field.as_deref(),
        );

        // 7. Derivation
        let codes: Vec<Option<PipeTypeCode>> = network
            .iter()
            .map(|s| self.pipe_type_value(s).and_then(PipeTypeCode::from_value))
            .collect();

        report.segments = network
            .iter()
            .enumerate()
            .map(|(i, segment)| {
                let adj = adjacency.adjacency[i];
                let mut record = AdjacencyRecord {
                    from_adjacent_id: adj.from.map(|n| network[n.0].id.clone()),
                    to_adjacent_id: adj.to.map(|n| network[n.0].id.clone()),
                    ..Default::default()
                };

                for role in EndRole::BOTH {
                    let Some(coord) = segment.endpoint(role) else {
                        continue;
                    };
                    let point = match locator.locate(coord, self.config.point_tolerance) {
                        Ok(point) => point,
                        Err(e) => {
                            warn!("Junction lookup failed for {} of {}: {}", role, segment.id, e);
                            None
                        }
                    };
                    let id = point.map(|p| p.id.clone());
                    let category = point.and_then(|p| p.category.clone());
                    match role {
                        EndRole::Start => {
                            record.from_point_id = id;
                            record.from_point_type = category;
                        }
                        EndRole::End => {
                            record.to_point_id = id;
                            record.to_point_type = category;
                        }
                    }
                }

                let direction = direction_of(segment);
                let neighbor_material = |role: EndRole| {
                    adj.at(role)
                        .map(|n| self.config.pipe_type_map.material(codes[n.0].as_ref()))
                };

                SegmentOutput {
                    segment_id: segment.id.clone(),
                    from_adjacent_id: record.from_adjacent_id,
                    to_adjacent_id: record.to_adjacent_id,
                    from_point_id: record.from_point_id,
                    from_point_type: record.from_point_type,
                    to_point_id: record.to_point_id,
                    to_point_type: record.to_point_type,
                    bearing: direction.bearing,
                    direction_text: direction.direction_text,
                    material_source: material_source(self.pipe_type_value(segment)),
                    from_material: neighbor_material(EndRole::Start),
                    to_material: neighbor_material(EndRole::End),
                    connected_point_count: connections.segment_point_counts[i],
                    updated_vertices: None,
                }
            })
            .collect();

        for snapped in &snaps.snapped {
            let i = snapped.segment.0;
            report.segments[i].updated_vertices = Some(network[i].vertices.clone());
        }

        report.points = connections.points;

        info!(
            "Finished: {} segments written, {} modified by snapping, {} multi-way junction ends.",
            report.segments.len(),
            report.modified_segment_count,
            report.multiway_junction_ends
        );
        report
    }
}
