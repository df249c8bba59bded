#[cfg(test)]
mod tests {
    use crate::config::EngineConfig;
    use crate::engine::Engine;
    use crate::models::{PointFeature, Segment};
    use crate::snapping::SnapMode;
    use geo_types::Coord;
    use serde_json::json;

    fn line(id: &str, coords: &[(f64, f64)]) -> Segment {
        Segment::new(
            id,
            coords.iter().map(|&(x, y)| Coord { x, y }).collect(),
        )
    }

    fn engine(config: EngineConfig) -> Engine {
        Engine::new(config).unwrap()
    }

    #[test]
    fn test_two_pipe_chain() {
        let config = EngineConfig {
            xy_tolerance: 0.01,
            ..Default::default()
        };
        let report = engine(config).run(
            vec![
                line("L1", &[(0.0, 0.0), (5.0, 0.0)]),
                line("L2", &[(5.0, 0.0), (10.0, 0.0)]),
            ],
            &[],
        );

        let l1 = report.segment("L1").unwrap();
        let l2 = report.segment("L2").unwrap();
        assert_eq!(l1.to_adjacent_id.as_deref(), Some("L2"));
        assert_eq!(l1.from_adjacent_id, None);
        assert_eq!(l2.from_adjacent_id.as_deref(), Some("L1"));
        assert_eq!(l2.to_adjacent_id, None);
        assert_eq!(l1.direction_text.as_deref(), Some("E"));
        assert_eq!(l1.bearing, Some(90.0));
    }

    #[test]
    fn test_dangle_snapped_then_attached() {
        // Snapping runs first, so the repaired end is what the junction lookup
        // sees with a tolerance far tighter than the original gap.
        let points = vec![
            PointFeature::new("MH-1", 0.0, 0.0, Some("Manhole")),
            PointFeature::new("MH-2", 5.0, 0.0, Some("Manhole")),
        ];
        let report = engine(EngineConfig::default()).run(
            vec![line("L1", &[(0.0, 0.0), (2.5, 0.1), (5.0002, 0.0)])],
            &points,
        );

        assert_eq!(report.modified_segment_count, 1);
        let l1 = report.segment("L1").unwrap();
        let vertices = l1.updated_vertices.as_ref().unwrap();
        assert_eq!(vertices.len(), 3);
        assert_eq!(vertices[2], Coord { x: 5.0, y: 0.0 });
        assert_eq!(vertices[1], Coord { x: 2.5, y: 0.1 });
        assert_eq!(l1.from_point_id.as_deref(), Some("MH-1"));
        assert_eq!(l1.to_point_id.as_deref(), Some("MH-2"));
        assert_eq!(l1.to_point_type.as_deref(), Some("Manhole"));
        assert_eq!(report.modified_segments().count(), 1);
    }

    #[test]
    fn test_dangle_beyond_search_tolerance_is_left_alone() {
        let points = vec![PointFeature::new("MH-2", 5.0, 0.0, None)];
        let report = engine(EngineConfig::default())
            .run(vec![line("L1", &[(0.0, 0.0), (5.5, 0.0)])], &points);

        assert_eq!(report.modified_segment_count, 0);
        let l1 = report.segment("L1").unwrap();
        assert!(l1.updated_vertices.is_none());
        assert_eq!(l1.to_point_id, None);
    }

    #[test]
    fn test_snapping_repairs_adjacency() {
        // Both pipes end a hair away from the manhole; after snapping they
        // share its coordinate and become adjacent.
        let points = vec![PointFeature::new("MH-1", 5.0, 0.0, Some("Manhole"))];
        let report = engine(EngineConfig::default()).run(
            vec![
                line("L1", &[(0.0, 0.0), (4.9, 0.0)]),
                line("L2", &[(5.1, 0.05), (10.0, 0.0)]),
            ],
            &points,
        );

        assert_eq!(report.modified_segment_count, 2);
        assert_eq!(
            report.segment("L1").unwrap().to_adjacent_id.as_deref(),
            Some("L2")
        );
        assert_eq!(
            report.segment("L2").unwrap().from_adjacent_id.as_deref(),
            Some("L1")
        );
        assert_eq!(report.points[0].connected_line_count, 2);
    }

    #[test]
    fn test_line_endpoint_mode_joins_dangles() {
        let config = EngineConfig {
            snap_mode: SnapMode::LineEndpoints,
            ..Default::default()
        };
        let report = engine(config).run(
            vec![
                line("L1", &[(0.0, 0.0), (5.0, 0.0)]),
                line("L2", &[(5.1, 0.0), (10.0, 0.0)]),
            ],
            &[],
        );

        assert_eq!(report.modified_segment_count, 1);
        let l1 = report.segment("L1").unwrap();
        let l2 = report.segment("L2").unwrap();
        assert_eq!(l1.to_adjacent_id.as_deref(), Some("L2"));
        assert_eq!(l2.from_adjacent_id.as_deref(), Some("L1"));
    }

    #[test]
    fn test_point_features_are_never_moved() {
        let points = vec![
            PointFeature::new("MH-1", 5.0, 0.0, None),
            PointFeature::new("MH-2", 5.2, 0.0, None),
        ];
        let before = points.clone();
        let _ = engine(EngineConfig::default()).run(
            vec![
                line("L1", &[(0.0, 0.0), (5.1, 0.0)]),
                line("L2", &[(5.15, 0.0), (10.0, 0.0)]),
            ],
            &points,
        );
        assert_eq!(points, before);
    }

    #[test]
    fn test_materials_across_a_run() {
        let report = engine(EngineConfig::default()).run(
            vec![
                line("L1", &[(0.0, 0.0), (5.0, 0.0)]).with_attribute("PIPE_TYPE", json!(3)),
                line("L2", &[(5.0, 0.0), (10.0, 0.0)]).with_attribute("PIPE_TYPE", json!(99)),
                line("L3", &[(10.0, 0.0), (15.0, 0.0)]).with_attribute("PIPE_TYPE", json!("")),
            ],
            &[],
        );

        let l2 = report.segment("L2").unwrap();
        assert_eq!(l2.from_material.as_deref(), Some("Cast Iron"));
        assert_eq!(l2.to_material.as_deref(), Some("Unknown"));
        assert_eq!(l2.material_source.as_deref(), Some("Legacy"));
        // A blank code is still a legacy value, it just has no material.
        assert_eq!(
            report.segment("L3").unwrap().material_source.as_deref(),
            Some("Legacy")
        );
        assert_eq!(
            report.segment("L3").unwrap().from_material.as_deref(),
            Some("Unknown")
        );
    }

    #[test]
    fn test_three_way_junction_keeps_first_neighbor() {
        let report = engine(EngineConfig::default()).run(
            vec![
                line("A", &[(0.0, 0.0), (5.0, 0.0)]),
                line("B", &[(5.0, 0.0), (10.0, 0.0)]),
                line("C", &[(5.0, 0.0), (5.0, 5.0)]),
            ],
            &[],
        );

        assert_eq!(report.segment("A").unwrap().to_adjacent_id.as_deref(), Some("B"));
        assert_eq!(report.segment("B").unwrap().from_adjacent_id.as_deref(), Some("A"));
        assert_eq!(report.segment("C").unwrap().from_adjacent_id.as_deref(), Some("A"));
        assert_eq!(report.multiway_junction_ends, 3);
    }

    #[test]
    fn test_zero_length_segment_has_no_direction() {
        let report = engine(EngineConfig::default())
            .run(vec![line("L1", &[(3.0, 3.0), (4.0, 4.0), (3.0, 3.0)])], &[]);
        let l1 = report.segment("L1").unwrap();
        assert_eq!(l1.bearing, None);
        assert_eq!(l1.direction_text, None);
    }

    #[test]
    fn test_bad_points_are_reported_not_fatal() {
        let points = vec![
            PointFeature::new("broken", f64::NAN, 0.0, None),
            PointFeature::new("MH-1", 5.0, 0.0, Some("Manhole")),
        ];
        let report = engine(EngineConfig::default())
            .run(vec![line("L1", &[(0.0, 0.0), (5.0, 0.0)])], &points);

        assert_eq!(report.skipped_points.len(), 1);
        assert_eq!(report.skipped_points[0].id, "broken");
        assert_eq!(
            report.segment("L1").unwrap().to_point_id.as_deref(),
            Some("MH-1")
        );
    }

    #[test]
    fn test_report_serializes_nulls() {
        let report = engine(EngineConfig::default())
            .run(vec![line("L1", &[(0.0, 0.0), (0.0, 5.0)])], &[]);
        let value = serde_json::to_value(&report).unwrap();
        let row = &value["segments"][0];
        assert_eq!(row["segment_id"], "L1");
        assert!(row["from_adjacent_id"].is_null());
        assert_eq!(row["direction_text"], "N");
        assert!(row.get("updated_vertices").is_none());
    }
}
