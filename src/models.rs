// In-memory shapes exchanged with the caller.
//
// Everything here is a plain snapshot of the caller's feature store: ids are
// the caller's FACILITYID strings, coordinates are in a projected CRS with
// linear units, and attributes are kept as raw JSON values so the caller can
// round-trip them untouched.

use crate::error::TopologyError;
use ahash::AHashMap;
use geo_types::Coord;

/// Arena position of a segment inside one run.
///
/// Segment ids come from the caller and are not guaranteed to be unique, so
/// every comparison inside the core is done by arena position instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SegmentIdx(pub usize);

/// A pipe: an ordered polyline plus its attribute row.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Segment {
    pub id: String,
    pub vertices: Vec<Coord<f64>>,
    #[serde(default)]
    pub attributes: AHashMap<String, serde_json::Value>,
}

impl Segment {
    pub fn new(id: impl Into<String>, vertices: Vec<Coord<f64>>) -> Self {
        Self {
            id: id.into(),
            vertices,
            attributes: AHashMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// First vertex. `None` only for an empty geometry.
    pub fn start(&self) -> Option<Coord<f64>> {
        self.vertices.first().copied()
    }

    /// Last vertex. `None` only for an empty geometry.
    pub fn end(&self) -> Option<Coord<f64>> {
        self.vertices.last().copied()
    }

    pub fn endpoint(&self, role: EndRole) -> Option<Coord<f64>> {
        match role {
            EndRole::Start => self.start(),
            EndRole::End => self.end(),
        }
    }

    /// Simple polyline check: at least two vertices, all finite.
    pub fn validate(&self) -> Result<(), TopologyError> {
        if self.vertices.len() < 2 {
            return Err(TopologyError::MalformedGeometry {
                segment_id: self.id.clone(),
                reason: format!("expected at least 2 vertices, found {}", self.vertices.len()),
            });
        }
        if let Some(pos) = self
            .vertices
            .iter()
            .position(|v| !v.x.is_finite() || !v.y.is_finite())
        {
            return Err(TopologyError::MalformedGeometry {
                segment_id: self.id.clone(),
                reason: format!("vertex {} has a non-finite coordinate", pos),
            });
        }
        Ok(())
    }

    pub(crate) fn set_endpoint(&mut self, role: EndRole, coord: Coord<f64>) {
        let slot = match role {
            EndRole::Start => self.vertices.first_mut(),
            EndRole::End => self.vertices.last_mut(),
        };
        if let Some(vertex) = slot {
            *vertex = coord;
        }
    }
}

/// Which end of a segment an endpoint belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndRole {
    Start,
    End,
}

impl EndRole {
    pub const BOTH: [EndRole; 2] = [EndRole::Start, EndRole::End];
}

impl std::fmt::Display for EndRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EndRole::Start => write!(f, "start"),
            EndRole::End => write!(f, "end"),
        }
    }
}

/// A manhole, cleanout or other junction. Never moved by the core.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointFeature {
    pub id: String,
    pub x: f64,
    pub y: f64,
    /// Feature description, e.g. "Manhole" or "Cleanout".
    pub category: Option<String>,
    #[serde(default)]
    pub attributes: AHashMap<String, serde_json::Value>,
}

impl PointFeature {
    pub fn new(id: impl Into<String>, x: f64, y: f64, category: Option<&str>) -> Self {
        Self {
            id: id.into(),
            x,
            y,
            category: category.map(str::to_string),
            attributes: AHashMap::new(),
        }
    }

    pub fn coord(&self) -> Coord<f64> {
        Coord {
            x: self.x,
            y: self.y,
        }
    }
}

/// Adjacency and junction identity for one segment.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AdjacencyRecord {
    pub from_adjacent_id: Option<String>,
    pub to_adjacent_id: Option<String>,
    pub from_point_id: Option<String>,
    pub from_point_type: Option<String>,
    pub to_point_id: Option<String>,
    pub to_point_type: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectionRecord {
    pub bearing: Option<f64>,
    pub direction_text: Option<String>,
}

/// One output row, ready to be written back onto the line layer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentOutput {
    pub segment_id: String,
    pub from_adjacent_id: Option<String>,
    pub to_adjacent_id: Option<String>,
    pub from_point_id: Option<String>,
    pub from_point_type: Option<String>,
    pub to_point_id: Option<String>,
    pub to_point_type: Option<String>,
    pub bearing: Option<f64>,
    pub direction_text: Option<String>,
    pub material_source: Option<String>,
    pub from_material: Option<String>,
    pub to_material: Option<String>,
    pub connected_point_count: usize,
    /// Present only when the snapping pass moved an endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_vertices: Option<Vec<Coord<f64>>>,
}

/// One output row for the point layer.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PointOutput {
    pub point_id: String,
    pub connected_line_count: usize,
    pub connected_line_values: Vec<String>,
}

/// A segment the run could not process, with the reason it was dropped.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SkippedFeature {
    pub id: String,
    pub reason: String,
}

/// Everything a single run hands back to the caller.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub segments: Vec<SegmentOutput>,
    pub points: Vec<PointOutput>,
    pub skipped_segments: Vec<SkippedFeature>,
    pub skipped_points: Vec<SkippedFeature>,
    pub modified_segment_count: usize,
    /// Segment ends that touch two or more other segments. Only the first
    /// neighbour is recorded for those ends.
    pub multiway_junction_ends: usize,
}

impl BatchReport {
    /// Output rows whose geometry was changed by the snapping pass.
    pub fn modified_segments(&self) -> impl Iterator<Item = &SegmentOutput> {
        self.segments
            .iter()
            .filter(|output| output.updated_vertices.is_some())
    }

    pub fn segment(&self, id: &str) -> Option<&SegmentOutput> {
        self.segments.iter().find(|output| output.segment_id == id)
    }
}
