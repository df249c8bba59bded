// ===========================================================================
// Connectivity roll-up between the line and point layers
// ===========================================================================
//
// Two summaries that operators use to spot topology problems and to push
// line attributes onto manholes:
// - per segment: how many point features touch the line anywhere along it;
// - per point: which lines touch it, and the distinct values of one line
//   attribute among them (e.g. the owners of the connected pipes).
//
// "Touching" means the Euclidean distance from the point to the polyline is
// within the connection tolerance.
// ===========================================================================

use crate::models::{PointFeature, PointOutput, Segment};
use geo::{Distance, Euclidean};
use geo_types::{LineString, Point};
use rstar::primitives::GeomWithData;
use rstar::{AABB, RTree};
use serde_json::Value;

#[derive(Clone, Debug, Default)]
pub struct Connectivity {
    /// Indexed like the segments handed in.
    pub segment_point_counts: Vec<usize>,
    /// Indexed like the points handed in.
    pub points: Vec<PointOutput>,
}

/// Text form of an attribute value for roll-up; `None` for null/empty.
pub fn attribute_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.trim().to_string()),
        other => Some(other.to_string()),
    }
}

fn expanded_envelope(line: &LineString<f64>, tolerance: f64) -> Option<AABB<[f64; 2]>> {
    let mut coords = line.coords();
    let first = coords.next()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for c in coords {
        min_x = min_x.min(c.x);
        min_y = min_y.min(c.y);
        max_x = max_x.max(c.x);
        max_y = max_y.max(c.y);
    }
    Some(AABB::from_corners(
        [min_x - tolerance, min_y - tolerance],
        [max_x + tolerance, max_y + tolerance],
    ))
}

/// Match every segment against every point within `tolerance` of it.
///
/// `value_field`, when set, names the line attribute collected onto points.
/// Values keep the order in which lines were enumerated; duplicates are
/// dropped.
pub fn connect(
    segments: &[Segment],
    points: &[PointFeature],
    tolerance: f64,
    value_field: Option<&str>,
) -> Connectivity {
    let items = points
        .iter()
        .enumerate()
        .filter(|(_, p)| p.x.is_finite() && p.y.is_finite())
        .map(|(i, p)| GeomWithData::new([p.x, p.y], i))
        .collect();
    let tree: RTree<GeomWithData<[f64; 2], usize>> = RTree::bulk_load(items);

    let mut result = Connectivity {
        segment_point_counts: vec![0; segments.len()],
        points: points
            .iter()
            .map(|p| PointOutput {
                point_id: p.id.clone(),
                ..Default::default()
            })
            .collect(),
    };

    for (si, segment) in segments.iter().enumerate() {
        let line = LineString::from(segment.vertices.clone());
        let Some(envelope) = expanded_envelope(&line, tolerance) else {
            continue;
        };

        let mut hits: Vec<usize> = tree
            .locate_in_envelope(&envelope)
            .map(|item| item.data)
            .filter(|&pi| {
                let point = Point::from(points[pi].coord());
                Euclidean.distance(&point, &line) <= tolerance
            })
            .collect();
        hits.sort_unstable();

        result.segment_point_counts[si] = hits.len();

        let value = value_field
            .and_then(|field| segment.attributes.get(field))
            .and_then(attribute_text);

        for pi in hits {
            let out = &mut result.points[pi];
            out.connected_line_count += 1;
            if let Some(value) = &value {
                if !out.connected_line_values.contains(value) {
                    out.connected_line_values.push(value.clone());
                }
            }
        }
    }

    result
}
